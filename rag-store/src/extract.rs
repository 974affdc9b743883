//! Document fetching and text extraction.
//!
//! PDF bytes (`%PDF` magic) go through `pdf-extract` on a blocking thread;
//! anything else must be UTF-8 text.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::errors::RagError;

/// Where a document comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentRef {
    /// `http(s)://` location.
    Url(String),
    /// File on the local filesystem.
    Path(PathBuf),
    /// Text supplied inline, identified by `name`.
    Text { name: String, body: String },
}

impl DocumentRef {
    /// Identifier stored as `source` metadata; stable across re-ingestion.
    pub fn source_id(&self) -> String {
        match self {
            DocumentRef::Url(u) => u.trim().to_string(),
            DocumentRef::Path(p) => p.to_string_lossy().into_owned(),
            DocumentRef::Text { name, .. } => name.trim().to_string(),
        }
    }
}

/// Turns a [`DocumentRef`] into raw text.
pub trait TextExtractor: Send + Sync {
    /// Retrieves the document bytes.
    fn fetch<'a>(&'a self, doc: &'a DocumentRef) -> BoxFuture<'a, Result<Vec<u8>, RagError>>;

    /// Decodes fetched bytes into text.
    fn extract<'a>(
        &'a self,
        doc: &'a DocumentRef,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, RagError>>;
}

/// Default extractor: HTTP(S), local files and inline text; PDF or UTF-8.
pub struct DocumentExtractor {
    http: reqwest::Client,
    max_bytes: usize,
    timeout: Duration,
}

impl DocumentExtractor {
    pub fn new(cfg: &ExtractConfig) -> Result<Self, RagError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.fetch_timeout)
            .build()
            .map_err(|e| RagError::InvalidConfiguration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            max_bytes: cfg.max_bytes,
            timeout: cfg.fetch_timeout,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, RagError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RagError::Extraction(format!("unsupported URL scheme: {url}")));
        }
        let started = Instant::now();
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RagError::Extraction(format!(
                    "fetch timed out after {}s: {url}",
                    self.timeout.as_secs()
                ))
            } else {
                RagError::Extraction(format!("fetch failed: {e}"))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RagError::Extraction(format!("GET {url} returned {status}")));
        }
        if let Some(len) = resp.content_length() {
            self.check_size(len as usize)?;
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RagError::Extraction(format!("reading body failed: {e}")))?;
        self.check_size(bytes.len())?;

        info!(
            url,
            bytes = bytes.len(),
            latency_ms = started.elapsed().as_millis(),
            "document fetched"
        );
        Ok(bytes.to_vec())
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, RagError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| RagError::Extraction(format!("{}: {e}", path.display())))?;
        self.check_size(meta.len() as usize)?;
        tokio::fs::read(path)
            .await
            .map_err(|e| RagError::Extraction(format!("{}: {e}", path.display())))
    }

    fn check_size(&self, len: usize) -> Result<(), RagError> {
        if len > self.max_bytes {
            return Err(RagError::Extraction(format!(
                "document is {len} bytes, limit is {}",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

impl TextExtractor for DocumentExtractor {
    fn fetch<'a>(&'a self, doc: &'a DocumentRef) -> BoxFuture<'a, Result<Vec<u8>, RagError>> {
        Box::pin(async move {
            match doc {
                DocumentRef::Url(url) => self.fetch_url(url.trim()).await,
                DocumentRef::Path(path) => self.read_file(path).await,
                DocumentRef::Text { body, .. } => {
                    self.check_size(body.len())?;
                    Ok(body.as_bytes().to_vec())
                }
            }
        })
    }

    fn extract<'a>(
        &'a self,
        doc: &'a DocumentRef,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<String, RagError>> {
        Box::pin(async move {
            let text = bytes_to_text(bytes).await?;
            debug!(source = %doc.source_id(), chars = text.chars().count(), "text extracted");
            Ok(text)
        })
    }
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Decodes PDF or UTF-8 bytes. PDF parsing runs on the blocking pool.
pub async fn bytes_to_text(bytes: Vec<u8>) -> Result<String, RagError> {
    if is_pdf(&bytes) {
        let started = Instant::now();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| RagError::Extraction(format!("pdf worker failed: {e}")))?
            .map_err(|e| RagError::Extraction(format!("unreadable PDF: {e}")))?;
        debug!(latency_ms = started.elapsed().as_millis(), "pdf parsed");
        return Ok(text);
    }

    String::from_utf8(bytes)
        .map_err(|_| RagError::Extraction("document is neither PDF nor UTF-8 text".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_text_round_trips() {
        let ex = DocumentExtractor::new(&ExtractConfig::default()).unwrap();
        let doc = DocumentRef::Text {
            name: "cs-2024".into(),
            body: "Course Code: CS101".into(),
        };
        let bytes = ex.fetch(&doc).await.unwrap();
        assert_eq!(ex.extract(&doc, bytes).await.unwrap(), "Course Code: CS101");
        assert_eq!(doc.source_id(), "cs-2024");
    }

    #[tokio::test]
    async fn binary_garbage_is_extraction_error() {
        let err = bytes_to_text(vec![0xff, 0xfe, 0x00, 0x81]).await.unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[tokio::test]
    async fn broken_pdf_is_extraction_error() {
        let err = bytes_to_text(b"%PDF-1.7 truncated".to_vec()).await.unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[tokio::test]
    async fn size_limit_and_scheme_are_enforced() {
        let ex = DocumentExtractor::new(&ExtractConfig {
            fetch_timeout: Duration::from_secs(1),
            max_bytes: 4,
        })
        .unwrap();
        let doc = DocumentRef::Text {
            name: "big".into(),
            body: "too large".into(),
        };
        assert!(matches!(ex.fetch(&doc).await, Err(RagError::Extraction(_))));

        let ftp = DocumentRef::Url("ftp://host/file.pdf".into());
        assert!(matches!(ex.fetch(&ftp).await, Err(RagError::Extraction(_))));
    }

    #[tokio::test]
    async fn missing_file_is_extraction_error() {
        let ex = DocumentExtractor::new(&ExtractConfig::default()).unwrap();
        let doc = DocumentRef::Path(PathBuf::from("/definitely/not/here.pdf"));
        assert!(matches!(ex.fetch(&doc).await, Err(RagError::Extraction(_))));
    }
}
