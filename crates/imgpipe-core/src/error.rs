//! Error types module
//!
//! Every way a pipeline run can end badly is a [`PipelineError`]. Validation
//! failures stop a run before any network call; network failures and the
//! processing timeout end a run that already talked to the backend. None of
//! them is fatal to the process: the user can always reset and try again.

pub use crate::validator::ValidationError;

/// Appended to the processing-timeout message. A hint, not a diagnosis.
pub const JPEG_REMEDIATION_HINT: &str = "The image may have failed to process. \
     Please try uploading a JPEG image instead of PNG.";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for backend trouble the user can retry past
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error presentation - how an error should be shown and logged
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "PROCESSING_TIMEOUT")
    fn error_code(&self) -> &'static str;

    /// Whether starting a fresh run can reasonably succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the Display text)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Failures talking to the credential endpoint or to storage.
///
/// The Display text is fixed; transport and status details ride along as
/// the error source.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("could not obtain upload grant")]
    GrantUnavailable {
        #[source]
        source: anyhow::Error,
    },

    #[error("upload failed")]
    UploadFailed {
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("processing is taking longer than expected")]
    ProcessingTimeout { attempts: u32 },

    #[error("no file selected")]
    NoFileSelected,

    /// The run was reset or replaced by a newer selection while in flight.
    #[error("run superseded by a newer selection or reset")]
    Superseded,
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            PipelineError::Validation(ValidationError::InvalidType { .. }) => "INVALID_TYPE",
            PipelineError::Validation(ValidationError::TooLarge { .. }) => "FILE_TOO_LARGE",
            PipelineError::Network(NetworkError::GrantUnavailable { .. }) => "GRANT_UNAVAILABLE",
            PipelineError::Network(NetworkError::UploadFailed { .. }) => "UPLOAD_FAILED",
            PipelineError::ProcessingTimeout { .. } => "PROCESSING_TIMEOUT",
            PipelineError::NoFileSelected => "NO_FILE_SELECTED",
            PipelineError::Superseded => "SUPERSEDED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::Validation(_) => false,
            PipelineError::Network(_) => true,
            PipelineError::ProcessingTimeout { .. } => true,
            PipelineError::NoFileSelected => false,
            PipelineError::Superseded => false,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            PipelineError::Validation(ValidationError::InvalidType { .. }) => {
                Some("Choose a JPEG, PNG, BMP or other image file")
            }
            PipelineError::Validation(ValidationError::TooLarge { .. }) => {
                Some("Choose a smaller image")
            }
            PipelineError::Network(_) => Some("Reset and retry after a short delay"),
            PipelineError::ProcessingTimeout { .. } => Some("Retry with a JPEG image"),
            PipelineError::NoFileSelected => Some("Select a file before starting"),
            PipelineError::Superseded => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            PipelineError::Validation(e) => e.client_message(),
            PipelineError::ProcessingTimeout { .. } => {
                format!("Processing is taking longer than expected. {JPEG_REMEDIATION_HINT}")
            }
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::Validation(_) => LogLevel::Debug,
            PipelineError::Network(_) => LogLevel::Error,
            PipelineError::ProcessingTimeout { .. } => LogLevel::Warn,
            PipelineError::NoFileSelected => LogLevel::Debug,
            PipelineError::Superseded => LogLevel::Debug,
        }
    }
}
