//! # Documents
//!
//! A comparison runs over two [`DocumentCollection`]s. Each [`DocItem`] is
//! either inline text or base64 binary with a declared media type; the kind is
//! decided once at ingestion and carried as a closed enum from then on.
//!
//! Files are classified the way the upload screen always has: text when the
//! guessed MIME type is `text/*` or the name ends in `.txt`, image when it is
//! `image/*`, everything else binary (PDF, Word, Excel).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose};
use tracing::{debug, warn};

use crate::error::{LensError, LensResult};

/// Extensions accepted for upload.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "txt", "jpg", "jpeg", "png",
];

const FALLBACK_IMAGE_TYPE: &str = "image/jpeg";
const FALLBACK_BINARY_TYPE: &str = "application/octet-stream";

/// Which of the two collections an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocSet {
    First,
    Second,
}

impl DocSet {
    pub fn label(self) -> &'static str {
        match self {
            DocSet::First => "Set 1",
            DocSet::Second => "Set 2",
        }
    }

    /// Section marker used inside the analysis request.
    pub fn marker(self) -> &'static str {
        match self {
            DocSet::First => "SET 1",
            DocSet::Second => "SET 2",
        }
    }
}

impl std::fmt::Display for DocSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse kind tag, for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Image,
    Binary,
}

/// Payload of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    Text(String),
    Image { media_type: String, data: String },
    Binary { media_type: String, data: String },
}

impl DocumentContent {
    /// Wrap raw bytes, picking Image or Binary from the media type.
    pub fn inline(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::from_base64(media_type, general_purpose::STANDARD.encode(bytes))
    }

    fn from_base64(media_type: impl Into<String>, data: String) -> Self {
        let media_type = media_type.into();
        if media_type.starts_with("image/") {
            Self::Image { media_type, data }
        } else {
            Self::Binary { media_type, data }
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Text(_) => DocumentKind::Text,
            Self::Image { .. } => DocumentKind::Image,
            Self::Binary { .. } => DocumentKind::Binary,
        }
    }

    /// Declared media type; `text/plain` for inline text.
    pub fn media_type(&self) -> &str {
        match self {
            Self::Text(_) => "text/plain",
            Self::Image { media_type, .. } | Self::Binary { media_type, .. } => media_type,
        }
    }

    /// Whether the model takes this payload as `inline_data`: images and PDF.
    /// Word and Excel files are not accepted inline.
    pub fn accepts_inline(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Image { .. } => true,
            Self::Binary { media_type, .. } => media_type == "application/pdf",
        }
    }

    /// Length of the transported representation, in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Image { data, .. } | Self::Binary { data, .. } => data.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocItem {
    pub id: String,
    pub name: String,
    pub content: DocumentContent,
    pub timestamp_ms: u64,
}

impl DocItem {
    pub fn new(name: impl Into<String>, content: DocumentContent) -> Self {
        let timestamp_ms = now_ms();
        Self {
            id: next_id(timestamp_ms),
            name: name.into(),
            content,
            timestamp_ms,
        }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, DocumentContent::Text(text.into()))
    }

    /// A still taken with the camera; `index` is 1-based within the capture session.
    pub fn captured_photo(index: usize, jpeg: &[u8]) -> Self {
        Self::new(format!("Photo {}", index), DocumentContent::inline("image/jpeg", jpeg))
    }

    /// Parse a `data:<mime>;base64,<payload>` URL. A bare base64 string is
    /// accepted and treated as JPEG.
    pub fn from_data_url(name: impl Into<String>, url: &str) -> LensResult<Self> {
        let name = name.into();
        let (media_type, data) = match url.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or_else(|| {
                    LensError::document(&name, "data URL has no payload separator")
                })?;
                let media_type = header.strip_suffix(";base64").ok_or_else(|| {
                    LensError::document(&name, "only base64 data URLs are supported")
                })?;
                let media_type = if media_type.is_empty() {
                    FALLBACK_IMAGE_TYPE
                } else {
                    media_type
                };
                (media_type.to_string(), data.to_string())
            }
            None => (FALLBACK_IMAGE_TYPE.to_string(), url.trim().to_string()),
        };

        general_purpose::STANDARD.decode(data.as_bytes())?;
        Ok(Self::new(name, DocumentContent::from_base64(media_type, data)))
    }

    pub fn kind(&self) -> DocumentKind {
        self.content.kind()
    }

    /// Approximate transported size in KiB.
    pub fn approx_kib(&self) -> f64 {
        self.content.encoded_len() as f64 / 1024.0
    }
}

/// Build an item from a file name and its bytes.
pub fn ingest_bytes(name: &str, bytes: &[u8]) -> LensResult<DocItem> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LensError::validation(
            "file",
            format!("extension must be one of {}", ACCEPTED_EXTENSIONS.join(", ")),
            name,
        ));
    }

    let mime = mime_guess::from_path(name).first();
    let is_text = extension == "txt"
        || mime.as_ref().is_some_and(|m| m.type_() == mime_guess::mime::TEXT);

    let content = if is_text {
        let text = match String::from_utf8(bytes.to_vec()) {
            Ok(text) => text,
            Err(_) => {
                warn!(file = name, "text file is not valid UTF-8, replacing invalid bytes");
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        DocumentContent::Text(text)
    } else {
        let media_type = mime
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_BINARY_TYPE.to_string());
        DocumentContent::inline(media_type, bytes)
    };

    debug!(file = name, kind = ?content.kind(), bytes = bytes.len(), "ingested document");
    Ok(DocItem::new(name, content))
}

/// Read a file from disk and ingest it.
pub async fn ingest_file(path: &Path) -> LensResult<DocItem> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LensError::document(path.display().to_string(), "path has no file name"))?
        .to_string();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LensError::io_at("read_document", path, e))?;
    ingest_bytes(&name, &bytes)
}

/// Ordered, value-semantics collection of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentCollection {
    items: Vec<DocItem>,
}

impl DocumentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// New collection with `items` appended after the current ones.
    pub fn with_items(&self, items: impl IntoIterator<Item = DocItem>) -> Self {
        let mut next = self.items.clone();
        next.extend(items);
        Self { items: next }
    }

    /// New collection without the item carrying `id`.
    pub fn without(&self, id: &str) -> Self {
        Self {
            items: self.items.iter().filter(|d| d.id != id).cloned().collect(),
        }
    }

    pub fn items(&self) -> &[DocItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_kib(&self) -> f64 {
        self.items.iter().map(DocItem::approx_kib).sum()
    }
}

impl FromIterator<DocItem> for DocumentCollection {
    fn from_iter<T: IntoIterator<Item = DocItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn next_id(timestamp_ms: u64) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{}", timestamp_ms, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_and_mime() {
        let text = ingest_bytes("notes.txt", b"line one").unwrap();
        assert_eq!(text.content, DocumentContent::Text("line one".to_string()));

        let png = ingest_bytes("scan.PNG", &[0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(png.kind(), DocumentKind::Image);
        assert_eq!(png.content.media_type(), "image/png");

        let pdf = ingest_bytes("contract.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(pdf.kind(), DocumentKind::Binary);
        assert!(pdf.content.accepts_inline());
        let sheet = ingest_bytes("totals.xlsx", b"PK\x03\x04").unwrap();
        assert_eq!(sheet.kind(), DocumentKind::Binary);
        assert!(!sheet.content.accepts_inline());
        assert_eq!(pdf.content.media_type(), "application/pdf");
        match &pdf.content {
            DocumentContent::Binary { data, .. } => assert_eq!(data, "JVBERi0xLjc="),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn rejects_unlisted_extensions() {
        let err = ingest_bytes("movie.mp4", b"....").unwrap_err();
        assert_eq!(err.category(), "validation");
        assert!(ingest_bytes("README", b"hi").is_err());
    }

    #[test]
    fn invalid_utf8_text_is_kept_lossily() {
        let item = ingest_bytes("broken.txt", &[b'o', b'k', 0xff]).unwrap();
        assert_eq!(item.content, DocumentContent::Text("ok\u{fffd}".to_string()));
    }

    #[test]
    fn data_url_round_trip() {
        let item = DocItem::from_data_url("shot", "data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(
            item.content,
            DocumentContent::Image {
                media_type: "image/png".to_string(),
                data: "iVBORw0KGgo=".to_string()
            }
        );

        let pdf = DocItem::from_data_url("p", "data:application/pdf;base64,JVBERi0xLjc=").unwrap();
        assert_eq!(pdf.kind(), DocumentKind::Binary);

        let bare = DocItem::from_data_url("bare", "/9j/4AAQ").unwrap();
        assert_eq!(bare.content.media_type(), "image/jpeg");

        assert!(DocItem::from_data_url("bad", "data:image/png;base64,@@@").is_err());
        assert!(DocItem::from_data_url("bad", "data:text/plain,hello").is_err());
    }

    #[test]
    fn collections_append_and_remove_by_value() {
        let empty = DocumentCollection::new();
        let a = DocItem::text("a.txt", "a");
        let b = DocItem::text("b.txt", "b");
        let b_id = b.id.clone();

        let one = empty.with_items([a.clone()]);
        let two = one.with_items([b]);
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert_eq!(two.len(), 2);
        assert_eq!(two.items()[0], a);

        let back = two.without(&b_id);
        assert_eq!(back, one);
    }

    #[test]
    fn ids_are_unique() {
        let a = DocItem::text("a", "");
        let b = DocItem::text("a", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn captured_photo_is_named_and_typed() {
        let item = DocItem::captured_photo(3, &[0xff, 0xd8, 0xff]);
        assert_eq!(item.name, "Photo 3");
        assert_eq!(item.content.media_type(), "image/jpeg");
        assert!(item.approx_kib() > 0.0);
    }
}
