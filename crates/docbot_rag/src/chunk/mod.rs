use docbot_core::corpus::Document;
use docbot_core::error::AppError;
use serde::{Deserialize, Serialize};

/// Splitting parameters, in bytes of UTF-8 text.
///
/// `overlap` must stay below `max_chars` or the window could never advance;
/// the extra headroom of 4 covers the widest UTF-8 character so a hard cut
/// always makes progress too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 200,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_chars == 0 {
            return Err(AppError::new(
                "CHUNK_CONFIG_INVALID",
                "max_chars must be positive",
            ));
        }
        if self.overlap >= self.max_chars {
            return Err(AppError::new(
                "CHUNK_CONFIG_INVALID",
                "overlap must be smaller than max_chars",
            )
            .with_details(format!(
                "max_chars={}; overlap={}",
                self.max_chars, self.overlap
            )));
        }
        if self.max_chars - self.overlap < 4 {
            return Err(AppError::new(
                "CHUNK_CONFIG_INVALID",
                "max_chars must exceed overlap by at least 4",
            )
            .with_details(format!(
                "max_chars={}; overlap={}",
                self.max_chars, self.overlap
            )));
        }
        Ok(())
    }
}

/// One window of a document. `text` is a verbatim slice of the parent's
/// content starting at byte `start_offset`; consecutive windows of the same
/// parent overlap by up to `SplitConfig::overlap`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub parent_id: String,
    pub index: u32,
    pub text: String,
    pub start_offset: usize,
}

/// Pure, deterministic splitter. Cuts prefer, in order: the end of a
/// paragraph, the end of a sentence, a word boundary, then a hard cut at a
/// character boundary. Every byte of every document lands in at least one
/// chunk and start offsets strictly increase per document.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitConfig,
}

impl TextSplitter {
    pub fn new(config: SplitConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> SplitConfig {
        self.config
    }

    /// Split every document, in document order. Empty documents yield no
    /// chunks.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut out = Vec::new();
        for doc in documents {
            self.split_document(doc, &mut out);
        }
        out
    }

    fn split_document(&self, doc: &Document, out: &mut Vec<Chunk>) {
        let content = doc.content.as_str();
        if content.is_empty() {
            return;
        }

        let max = self.config.max_chars;
        let overlap = self.config.overlap;
        let len = content.len();
        let mut start = 0usize;
        let mut index = 0u32;

        loop {
            if len - start <= max {
                out.push(Chunk {
                    parent_id: doc.id.clone(),
                    index,
                    text: content[start..].to_string(),
                    start_offset: start,
                });
                return;
            }

            let end = self.cut_point(content, start);
            out.push(Chunk {
                parent_id: doc.id.clone(),
                index,
                text: content[start..end].to_string(),
                start_offset: start,
            });
            index += 1;

            let mut next = end - overlap;
            while !content.is_char_boundary(next) {
                next -= 1;
            }
            if next <= start {
                // Alignment ate the whole advance; give up the overlap for
                // this window rather than stall.
                next = end;
            }
            start = next;
        }
    }

    /// The cut position for the window starting at `start`, chosen so the
    /// next start (`end - overlap`) always lands past `start`.
    fn cut_point(&self, content: &str, start: usize) -> usize {
        let mut limit = start + self.config.max_chars;
        while !content.is_char_boundary(limit) {
            limit -= 1;
        }
        let window = &content[start..limit];
        // A boundary cut must land strictly past the overlap watermark.
        let min_end = self.config.overlap;

        if let Some(p) = cut_after_last(window, "\n\n", min_end) {
            return start + p;
        }
        let sentence = [". ", "! ", "? ", "\n"]
            .iter()
            .filter_map(|pat| cut_after_last(window, pat, min_end))
            .max();
        if let Some(p) = sentence {
            return start + p;
        }
        if let Some(p) = cut_after_last(window, " ", min_end) {
            return start + p;
        }
        limit
    }
}

/// Byte position just past the last occurrence of `pat` in `window`, if that
/// position lies beyond `min_end`. Earlier occurrences end earlier still, so
/// one `rfind` settles it.
fn cut_after_last(window: &str, pat: &str, min_end: usize) -> Option<usize> {
    let i = window.rfind(pat)?;
    let end = i + pat.len();
    (end > min_end).then_some(end)
}
