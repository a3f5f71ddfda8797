use serde::{Deserialize, Serialize};

/// Request body for `POST /generate-upload-url`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrantRequest<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
}

/// One-time write location plus the key the backend files the upload under.
///
/// `key` is the only identifier the processed-images endpoint understands.
/// It may differ from the original filename and must be used for polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadGrant {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "filename")]
    pub key: String,
}
