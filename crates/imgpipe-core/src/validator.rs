use crate::models::CandidateFile;

/// Largest file the pipeline accepts: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const IMAGE_TYPE_PREFIX: &str = "image/";

/// Why a candidate file was turned away before any network call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid type: {content_type} is not an image")]
    InvalidType { content_type: String },

    #[error("too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },
}

impl ValidationError {
    /// Short machine-oriented reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidType { .. } => "invalid type",
            ValidationError::TooLarge { .. } => "too large",
        }
    }

    /// Text shown to the user.
    pub fn client_message(&self) -> String {
        match self {
            ValidationError::InvalidType { .. } => {
                "Please select a valid image file (JPEG, PNG, BMP, etc.)".to_string()
            }
            ValidationError::TooLarge { max, .. } => {
                format!("File size must be less than {}MB", max / (1024 * 1024))
            }
        }
    }
}

/// Client-side gate over declared media type and size.
///
/// Rules run in order and the first failure wins, so a 60 MiB text file is
/// reported as the wrong type, not as too large.
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileValidator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn validate(&self, file: &CandidateFile) -> Result<(), ValidationError> {
        self.validate_content_type(&file.content_type)?;
        self.validate_file_size(file.size)?;
        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let is_image = content_type
            .get(..IMAGE_TYPE_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_TYPE_PREFIX));

        if !is_image {
            return Err(ValidationError::InvalidType {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_file_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }
}
