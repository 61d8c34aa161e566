pub mod corpus;
pub mod error;

#[cfg(test)]
mod tests {
    use super::corpus::{corpus_fingerprint, CorpusSource, Document};

    #[test]
    fn source_parse_validates_shape() {
        assert!(CorpusSource::parse("SAP-docs/sapui5", "main").is_ok());

        assert!(CorpusSource::parse("sapui5", "main").is_err());
        assert!(CorpusSource::parse("a/b/c", "main").is_err());
        assert!(CorpusSource::parse("/b", "main").is_err());
        assert!(CorpusSource::parse("a/", "main").is_err());
        assert!(CorpusSource::parse("a/b", "  ").is_err());
    }

    #[test]
    fn source_label_is_owner_repo_branch() {
        let s = CorpusSource::parse("acme/handbook", "main").expect("source");
        assert_eq!(s.label(), "acme/handbook@main");
    }

    #[test]
    fn document_ids_are_stable_per_path() {
        let s = CorpusSource::parse("acme/handbook", "main").expect("source");
        let a = Document::new(&s, "docs/a.md", "one");
        let b = Document::new(&s, "docs/a.md", "two");
        let c = Document::new(&s, "docs/c.md", "one");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.metadata.get("branch").map(String::as_str), Some("main"));
    }

    #[test]
    fn fingerprint_ignores_document_order_but_not_content() {
        let s = CorpusSource::parse("acme/handbook", "main").expect("source");
        let a = Document::new(&s, "docs/a.md", "alpha");
        let b = Document::new(&s, "docs/b.md", "beta");

        let fwd = corpus_fingerprint(&[a.clone(), b.clone()]);
        let rev = corpus_fingerprint(&[b.clone(), a.clone()]);
        assert_eq!(fwd, rev);

        let edited = Document::new(&s, "docs/a.md", "alpha!");
        assert_ne!(fwd, corpus_fingerprint(&[edited, b]));
    }
}
