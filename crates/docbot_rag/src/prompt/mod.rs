use serde::{Deserialize, Serialize};

/// Default system persona; callers can swap it without touching assembly.
pub const DEFAULT_PERSONA: &str = "You are SAPGPT, a chatbot that knows everything about SAP UI5. \
Answer any questions you are knowledgeable about, while trying to only output modern TypeScript \
in your responses.";

/// Retrieved chunks are joined with a blank line inside the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Builds the fixed three-message prompt: system persona, the user question
/// verbatim, then a system message carrying the retrieved context.
///
/// Pure string assembly. Chunks keep their retrieval order and are not
/// deduplicated; an empty retrieval still produces the context message,
/// just with nothing after the preamble.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PromptAssembler {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn assemble(&self, question: &str, retrieved: &[String]) -> Vec<ChatMessage> {
        let context = retrieved.join(CONTEXT_SEPARATOR);
        vec![
            ChatMessage::system(self.persona.clone()),
            ChatMessage::user(question),
            ChatMessage::system(format!("Here is some relevant context: {context}")),
        ]
    }
}
