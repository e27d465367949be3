//! Comparison analysis: two document sets in, a Markdown report out.
//!
//! [`AnalysisRequest`] carries both sets and the auditor instruction.
//! [`AnalysisEndpoint`] is the seam between the app and the remote model;
//! [`gemini::GeminiClient`] is the production implementation.

pub mod gemini;

use async_trait::async_trait;

use crate::documents::{DocItem, DocSet, DocumentCollection};
use crate::error::{LensError, LensResult};

pub use gemini::GeminiClient;

/// Instruction sent ahead of both document sets.
pub const DEFAULT_INSTRUCTION: &str = "\
You are a professional AI auditor and document analyst.
Your task is to compare two sets of documents (\"Set 1\" and \"Set 2\") and find \
differences, inconsistencies, additions and removals.

The user supplied these two sets as images or text files.

Produce a structured analysis report:
1. **Summary**: a brief overview of the comparison result.
2. **Key Differences**: bullet points describing the concrete changes in Set 2 compared to Set 1.
3. **Content Verification**: check whether order and content logic are consistent between the two sets.
4. **Conclusion**: a final judgement on whether the documents match or deviate significantly.

Output clean Markdown.";

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub first: DocumentCollection,
    pub second: DocumentCollection,
    pub instruction: String,
}

impl AnalysisRequest {
    pub fn new(first: DocumentCollection, second: DocumentCollection) -> Self {
        Self {
            first,
            second,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn set(&self, set: DocSet) -> &DocumentCollection {
        match set {
            DocSet::First => &self.first,
            DocSet::Second => &self.second,
        }
    }

    pub fn total_items(&self) -> usize {
        self.first.len() + self.second.len()
    }

    /// A request with nothing in either set is never sent.
    pub fn ensure_sendable(&self) -> LensResult<()> {
        if self.first.is_empty() && self.second.is_empty() {
            return Err(LensError::validation(
                "documents",
                "at least one document in either set",
                "0 documents",
            )
            .with_recovery_suggestion("Add files or capture photos before starting the analysis"));
        }
        Ok(())
    }

    /// Ordered message parts: instruction, Set 1 marker and items, Set 2 marker and items.
    pub fn parts(&self) -> Vec<Part<'_>> {
        let mut parts = Vec::with_capacity(3 + 2 * self.total_items());
        parts.push(Part::Text(self.instruction.clone()));
        for set in [DocSet::First, DocSet::Second] {
            parts.push(Part::Text(format!("\n\n--- {} ({}) ---\n", set.label(), set.marker())));
            for item in self.set(set).items() {
                push_item(&mut parts, item);
            }
        }
        parts
    }
}

/// One element of the outgoing multimodal message.
#[derive(Debug, Clone, PartialEq)]
pub enum Part<'a> {
    Text(String),
    Inline { media_type: &'a str, data: &'a str },
}

fn push_item<'a>(parts: &mut Vec<Part<'a>>, item: &'a DocItem) {
    use crate::documents::DocumentContent;

    parts.push(Part::Text(format!("File name: {}\n", item.name)));
    match &item.content {
        DocumentContent::Text(text) => parts.push(Part::Text(format!("Content:\n{}\n", text))),
        DocumentContent::Image { media_type, data } | DocumentContent::Binary { media_type, data }
            if item.content.accepts_inline() =>
        {
            parts.push(Part::Inline { media_type, data })
        }
        // Word and Excel files go out as their data URL text
        DocumentContent::Image { media_type, data } | DocumentContent::Binary { media_type, data } => {
            parts.push(Part::Text(format!("Content:\ndata:{};base64,{}\n", media_type, data)))
        }
    }
}

/// Anything that can turn a comparison request into report text.
#[async_trait]
pub trait AnalysisEndpoint: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> LensResult<String>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(items: Vec<DocItem>) -> DocumentCollection {
        items.into_iter().collect()
    }

    #[test]
    fn empty_request_is_refused() {
        let request = AnalysisRequest::new(DocumentCollection::new(), DocumentCollection::new());
        let err = request.ensure_sendable().unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn one_sided_request_is_allowed() {
        let request = AnalysisRequest::new(
            collection(vec![DocItem::text("a.txt", "alpha")]),
            DocumentCollection::new(),
        );
        assert!(request.ensure_sendable().is_ok());
    }

    #[test]
    fn parts_follow_set_order() {
        let request = AnalysisRequest::new(
            collection(vec![DocItem::text("a.txt", "alpha")]),
            collection(vec![DocItem::captured_photo(1, &[0xff, 0xd8, 0xff])]),
        )
        .with_instruction("compare");

        let parts = request.parts();
        assert_eq!(parts.len(), 7);
        assert_eq!(parts[0], Part::Text("compare".into()));
        assert_eq!(parts[1], Part::Text("\n\n--- Set 1 (SET 1) ---\n".into()));
        assert_eq!(parts[2], Part::Text("File name: a.txt\n".into()));
        assert_eq!(parts[3], Part::Text("Content:\nalpha\n".into()));
        assert_eq!(parts[4], Part::Text("\n\n--- Set 2 (SET 2) ---\n".into()));
        assert_eq!(parts[5], Part::Text("File name: Photo 1\n".into()));
        assert!(matches!(parts[6], Part::Inline { media_type: "image/jpeg", .. }));
    }

    #[test]
    fn office_files_are_sent_as_text() {
        let docx = crate::documents::ingest_bytes("memo.docx", b"PK").unwrap();
        let pdf = crate::documents::ingest_bytes("memo.pdf", b"%PDF").unwrap();
        let request = AnalysisRequest::new(collection(vec![docx, pdf]), DocumentCollection::new());

        let parts = request.parts();
        assert_eq!(
            parts[3],
            Part::Text(
                "Content:\ndata:application/vnd.openxmlformats-officedocument.wordprocessingml.document;base64,UEs=\n"
                    .into()
            )
        );
        assert_eq!(parts[4], Part::Text("File name: memo.pdf\n".into()));
        assert_eq!(
            parts[5],
            Part::Inline { media_type: "application/pdf", data: "JVBERg==" }
        );
    }
}
