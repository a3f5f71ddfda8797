//! Seams between the orchestrator and the backend.
//!
//! Each implementation is a stateless request/response function making a
//! single attempt. Retrying is the caller's business.

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::models::{CandidateFile, UploadGrant, VariantSet};

/// Issues one-time write locations.
#[async_trait]
pub trait GrantIssuer: Send + Sync {
    async fn request_grant(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadGrant, NetworkError>;
}

/// Writes a whole file to a granted location.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(&self, upload_url: &str, file: &CandidateFile) -> Result<(), NetworkError>;
}

/// Looks up derived variants by canonicalized key.
///
/// Any error means "not available yet"; an empty set is a success.
#[async_trait]
pub trait VariantSource: Send + Sync {
    async fn fetch_variants(&self, key: &str) -> anyhow::Result<VariantSet>;
}
