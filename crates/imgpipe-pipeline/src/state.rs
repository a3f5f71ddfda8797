//! Client-visible run state.
//!
//! One [`RunSnapshot`] is live at a time. Its `generation` changes whenever a
//! selection or reset supersedes whatever run was in flight; writes from a
//! run carrying an older generation are dropped.

use chrono::{DateTime, Utc};
use imgpipe_core::{CandidateFile, ErrorMetadata, PipelineError, UploadGrant, VariantSet};
use uuid::Uuid;

/// Progress milestones. Observational only, never used for control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Progress {
    GrantRequested,
    GrantAcquired,
    Uploaded,
    AwaitingProcessing,
    Retrieving,
    Done,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        match self {
            Progress::GrantRequested => 0,
            Progress::GrantAcquired => 20,
            Progress::Uploaded => 40,
            Progress::AwaitingProcessing => 60,
            Progress::Retrieving => 80,
            Progress::Done => 100,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Progress::GrantRequested => "Getting upload URL...",
            Progress::GrantAcquired => "Uploading image to storage...",
            Progress::Uploaded => "Upload complete",
            Progress::AwaitingProcessing => "Processing image (resizing and compressing)...",
            Progress::Retrieving => "Retrieving processed images...",
            Progress::Done => "Done",
        }
    }
}

/// What the user sees when a run ends badly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub error_code: &'static str,
    pub message: String,
    pub suggested_action: Option<&'static str>,
    pub recoverable: bool,
}

impl From<&PipelineError> for FailureReport {
    fn from(err: &PipelineError) -> Self {
        Self {
            error_code: err.error_code(),
            message: err.client_message(),
            suggested_action: err.suggested_action(),
            recoverable: err.is_recoverable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FileSelected {
        file: CandidateFile,
    },
    Uploading {
        file: CandidateFile,
        progress: Progress,
    },
    Processing {
        file: CandidateFile,
        grant: UploadGrant,
        progress: Progress,
        /// Current processed-images query, 0 while still in the initial wait.
        attempt: u32,
        max_attempts: u32,
    },
    Completed {
        file: CandidateFile,
        key: String,
        variants: VariantSet,
    },
    Failed {
        file: Option<CandidateFile>,
        failure: FailureReport,
    },
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::FileSelected { .. } => "file_selected",
            RunState::Uploading { .. } => "uploading",
            RunState::Processing { .. } => "processing",
            RunState::Completed { .. } => "completed",
            RunState::Failed { .. } => "failed",
        }
    }

    pub fn file(&self) -> Option<&CandidateFile> {
        match self {
            RunState::Idle => None,
            RunState::FileSelected { file }
            | RunState::Uploading { file, .. }
            | RunState::Processing { file, .. }
            | RunState::Completed { file, .. } => Some(file),
            RunState::Failed { file, .. } => file.as_ref(),
        }
    }

    pub fn progress_percent(&self) -> u8 {
        match self {
            RunState::Uploading { progress, .. } | RunState::Processing { progress, .. } => {
                progress.percent()
            }
            RunState::Completed { .. } => Progress::Done.percent(),
            _ => 0,
        }
    }

    /// Status line for a progress display.
    pub fn status_message(&self) -> String {
        match self {
            RunState::Idle => "Select an image to upload".to_string(),
            RunState::FileSelected { file } => format!("Ready to upload {}", file.name),
            RunState::Uploading { progress, .. } => progress.message().to_string(),
            RunState::Processing {
                progress,
                attempt,
                max_attempts,
                ..
            } => {
                if *attempt > 1 {
                    format!("Still processing... (attempt {attempt}/{max_attempts})")
                } else {
                    progress.message().to_string()
                }
            }
            RunState::Completed { variants, .. } => {
                format!("Done: {} variant(s) available", variants.len())
            }
            RunState::Failed { failure, .. } => failure.message.clone(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            RunState::Uploading { .. } | RunState::Processing { .. }
        )
    }
}

/// The live run as published to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub generation: u64,
    pub run_id: Option<Uuid>,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            run_id: None,
            state: RunState::Idle,
            started_at: None,
            finished_at: None,
        }
    }
}

impl RunSnapshot {
    /// Supersede whatever was live and install `state` under a new generation.
    pub(crate) fn supersede(&mut self, state: RunState) {
        self.generation += 1;
        self.run_id = None;
        self.started_at = None;
        self.finished_at = None;
        self.state = state;
    }
}
