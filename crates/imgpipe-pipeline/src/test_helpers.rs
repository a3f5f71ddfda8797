//! Test helpers for pipeline unit tests
//!
//! Fakes for the three backend seams plus a sleeper that records requested
//! durations and returns immediately.

use async_trait::async_trait;
use imgpipe_core::models::{CandidateFile, Resolution, UploadGrant, VariantSet};
use imgpipe_core::traits::{GrantIssuer, ObjectUploader, VariantSource};
use imgpipe_core::NetworkError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::sleeper::Sleeper;

/// Records every requested sleep and returns without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    durations: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.durations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.durations.lock().unwrap().push(duration);
    }
}

/// Grant issuer that answers with a fixed grant or fails.
pub struct FakeGrantIssuer {
    grant: Option<UploadGrant>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Notify>>,
}

impl FakeGrantIssuer {
    pub fn granting(upload_url: &str, key: &str) -> Self {
        Self {
            grant: Some(UploadGrant {
                upload_url: upload_url.to_string(),
                key: key.to_string(),
            }),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            grant: None,
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every response until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GrantIssuer for FakeGrantIssuer {
    async fn request_grant(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadGrant, NetworkError> {
        self.calls
            .lock()
            .unwrap()
            .push((filename.to_string(), content_type.to_string()));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.grant
            .clone()
            .ok_or_else(|| NetworkError::GrantUnavailable {
                source: anyhow::anyhow!("API request failed with status 500"),
            })
    }
}

/// Uploader that records (url, filename, content type) and succeeds or fails.
pub struct FakeUploader {
    succeed: bool,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeUploader {
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectUploader for FakeUploader {
    async fn upload(&self, upload_url: &str, file: &CandidateFile) -> Result<(), NetworkError> {
        self.calls.lock().unwrap().push((
            upload_url.to_string(),
            file.name.clone(),
            file.content_type.clone(),
        ));

        if self.succeed {
            Ok(())
        } else {
            Err(NetworkError::UploadFailed {
                source: anyhow::anyhow!("API request failed with status 403"),
            })
        }
    }
}

/// Variant source that plays back a script of responses, one per query.
/// Once the script runs out every query fails.
pub struct ScriptedVariantSource {
    script: Mutex<VecDeque<Result<VariantSet, String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedVariantSource {
    pub fn new(script: Vec<Result<VariantSet, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// All three profiles present for `key`.
    pub fn full(key: &str) -> VariantSet {
        let mut set = VariantSet::default();
        for r in Resolution::ALL {
            set.insert(r, format!("https://out.example/{}/{}", r, key));
        }
        set
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VariantSource for ScriptedVariantSource {
    async fn fetch_variants(&self, key: &str) -> anyhow::Result<VariantSet> {
        self.calls.lock().unwrap().push(key.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(set)) => Ok(set),
            Some(Err(msg)) => Err(anyhow::anyhow!(msg)),
            None => Err(anyhow::anyhow!("API request failed with status 404")),
        }
    }
}

/// A candidate file with a declared size and no body.
pub fn declared_file(name: &str, content_type: &str, size: u64) -> CandidateFile {
    CandidateFile {
        name: name.to_string(),
        content_type: content_type.to_string(),
        size,
        body: bytes::Bytes::new(),
    }
}
