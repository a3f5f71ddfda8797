use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;

/// Media type reported for files whose extension maps to nothing known.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A file the user picked for upload.
///
/// `size` is the declared byte length and is what validation and delay
/// estimation look at; `body` is what gets written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub body: Bytes,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, body: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: body.len() as u64,
            body,
        }
    }

    /// Describe a local file from its metadata alone: name, declared media
    /// type (from the extension unless `content_type` overrides it) and size.
    /// The body stays empty until [`CandidateFile::read_body`].
    pub async fn describe(path: &Path, content_type: Option<&str>) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Path has no usable file name: {}", path.display()))?
            .to_string();

        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => guess_content_type(&name),
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
        if !metadata.is_file() {
            return Err(anyhow::anyhow!("Not a regular file: {}", path.display()));
        }

        Ok(Self {
            name,
            content_type,
            size: metadata.len(),
            body: Bytes::new(),
        })
    }

    /// Read the body from `path`. `size` is re-derived from what was read.
    pub async fn read_body(self, path: &Path) -> Result<Self> {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(Self::new(self.name, self.content_type, Bytes::from(body)))
    }
}

/// Media type a browser would declare for `filename`, based on its extension.
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}
