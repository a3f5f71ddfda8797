//! imgpipe upload pipeline
//!
//! Drives one image through the backend: validate it locally, obtain an
//! upload grant, write the bytes to storage, wait for the backend to derive
//! resized variants, and poll until their download links are available.

pub mod orchestrator;
pub mod poller;
pub mod sleeper;
pub mod state;

#[cfg(test)]
pub mod test_helpers;

pub use orchestrator::UploadOrchestrator;
pub use poller::{PollError, PollEvent, PollPolicy, ProcessingPoller};
pub use sleeper::{Sleeper, TokioSleeper};
pub use state::{FailureReport, Progress, RunSnapshot, RunState};
