//! Domain methods for the imgpipe backend.
//!
//! `POST /generate-upload-url`, `PUT <uploadUrl>` and
//! `GET /processed-images/{key}`. Shapes match the deployed backend.

use crate::{check_status, ApiClient};
use anyhow::{Context, Result};
use imgpipe_core::models::{CandidateFile, UploadGrant, UploadGrantRequest, VariantSet};
use reqwest::header::CONTENT_TYPE;

/// Path of the processed-images lookup for `key`, encoded as one segment.
pub fn processed_images_path(key: &str) -> String {
    format!("/processed-images/{}", urlencoding::encode(key))
}

impl ApiClient {
    /// Ask the backend for a one-time write location for `filename`.
    pub async fn generate_upload_url(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadGrant> {
        let request = UploadGrantRequest {
            filename,
            content_type,
        };

        let grant: UploadGrant = self
            .post_json("/generate-upload-url", &request)
            .await
            .context("Failed to get upload URL")?;

        tracing::debug!(
            filename = %filename,
            key = %grant.key,
            "Upload grant issued"
        );

        Ok(grant)
    }

    /// Write the whole file to a presigned location. Any 2xx is success.
    pub async fn upload_to_storage(&self, upload_url: &str, file: &CandidateFile) -> Result<()> {
        let response = self
            .client()
            .put(upload_url)
            .header(CONTENT_TYPE, file.content_type.as_str())
            .body(file.body.clone())
            .send()
            .await
            .context("Failed to send upload")?;

        check_status(response)
            .await
            .context("Failed to upload image to storage")?;

        tracing::debug!(
            filename = %file.name,
            size = file.size,
            "File written to storage"
        );

        Ok(())
    }

    /// Fetch download links for the variants derived from `key`.
    pub async fn get_processed_images(&self, key: &str) -> Result<VariantSet> {
        self.get(&processed_images_path(key))
            .await
            .context("Failed to retrieve processed images")
    }
}
