//! Seam implementations backed by the HTTP client.

use async_trait::async_trait;
use imgpipe_core::models::{CandidateFile, UploadGrant, VariantSet};
use imgpipe_core::traits::{GrantIssuer, ObjectUploader, VariantSource};
use imgpipe_core::NetworkError;

use crate::ApiClient;

#[async_trait]
impl GrantIssuer for ApiClient {
    async fn request_grant(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadGrant, NetworkError> {
        self.generate_upload_url(filename, content_type)
            .await
            .map_err(|source| {
                tracing::warn!(filename = %filename, error = %format!("{source:#}"), "Upload grant request failed");
                NetworkError::GrantUnavailable { source }
            })
    }
}

#[async_trait]
impl ObjectUploader for ApiClient {
    async fn upload(&self, upload_url: &str, file: &CandidateFile) -> Result<(), NetworkError> {
        self.upload_to_storage(upload_url, file)
            .await
            .map_err(|source| {
                tracing::warn!(filename = %file.name, error = %format!("{source:#}"), "Storage write failed");
                NetworkError::UploadFailed { source }
            })
    }
}

#[async_trait]
impl VariantSource for ApiClient {
    async fn fetch_variants(&self, key: &str) -> anyhow::Result<VariantSet> {
        self.get_processed_images(key).await
    }
}
