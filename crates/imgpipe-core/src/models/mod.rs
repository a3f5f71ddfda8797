//! Data models for the upload pipeline
//!
//! Candidate files are owned by the orchestrator for the duration of one run,
//! grants come back from the credential endpoint, and variant sets come back
//! from the processed-images endpoint.

mod file;
mod grant;
mod variant;

pub use file::*;
pub use grant::*;
pub use variant::*;
