//! imgpipe core library
//!
//! Domain models, validation, delay estimation, error types, configuration
//! and the traits the upload pipeline is assembled from. Shared by the API
//! client, the pipeline and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod timing;
pub mod traits;
pub mod validator;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorMetadata, LogLevel, NetworkError, PipelineError, ValidationError};
pub use models::{CandidateFile, Resolution, UploadGrant, VariantSet};
pub use timing::{DelayEstimator, SizeTieredDelay};
pub use traits::{GrantIssuer, ObjectUploader, VariantSource};
pub use validator::{FileValidator, DEFAULT_MAX_FILE_SIZE};
