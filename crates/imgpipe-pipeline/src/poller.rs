//! Polling for processed variants.
//!
//! The backend gives no completion signal. The poller waits a blind initial
//! delay, then queries the processed-images endpoint a bounded number of
//! times with a fixed pause after each failed query. The first well-formed
//! response wins, even an empty one.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use imgpipe_core::{ClientConfig, VariantSet, VariantSource};

use crate::sleeper::Sleeper;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 3000;

/// Attempt budget and pause between failed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.poll_max_attempts,
            retry_delay: config.poll_retry_delay,
        }
    }
}

/// Reported before each suspension point of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// About to sleep the initial, size-derived delay.
    Waiting { delay: Duration },
    /// About to issue query `attempt` of `max_attempts`.
    Querying { attempt: u32, max_attempts: u32 },
    /// Query `attempt` failed; about to sleep before the next one.
    Retrying {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("no processed variants after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// The caller stopped the poll; nothing further was issued.
    #[error("polling abandoned")]
    Abandoned,
}

pub struct ProcessingPoller {
    source: Arc<dyn VariantSource>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
}

impl ProcessingPoller {
    pub fn new(
        source: Arc<dyn VariantSource>,
        sleeper: Arc<dyn Sleeper>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            source,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Poll without observing progress.
    pub async fn poll_quiet(
        &self,
        key: &str,
        initial_delay: Duration,
    ) -> Result<VariantSet, PollError> {
        self.poll(key, initial_delay, |_| ControlFlow::Continue(()))
            .await
    }

    /// Wait `initial_delay`, then query for `key` until a response parses
    /// or the attempt budget runs out.
    ///
    /// `on_event` runs before every sleep and query; returning `Break` stops
    /// the poll there with [`PollError::Abandoned`]. A query already in
    /// flight is never interrupted.
    pub async fn poll<F>(
        &self,
        key: &str,
        initial_delay: Duration,
        mut on_event: F,
    ) -> Result<VariantSet, PollError>
    where
        F: FnMut(PollEvent) -> ControlFlow<()> + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);

        if on_event(PollEvent::Waiting {
            delay: initial_delay,
        })
        .is_break()
        {
            return Err(PollError::Abandoned);
        }
        self.sleeper.sleep(initial_delay).await;

        for attempt in 1..=max_attempts {
            if on_event(PollEvent::Querying {
                attempt,
                max_attempts,
            })
            .is_break()
            {
                return Err(PollError::Abandoned);
            }

            match self.source.fetch_variants(key).await {
                Ok(variants) => {
                    tracing::info!(
                        key = %key,
                        attempt,
                        variant_count = variants.len(),
                        "Processed variants retrieved"
                    );
                    return Ok(variants);
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        attempt,
                        max_attempts,
                        error = %format!("{e:#}"),
                        "Processed variants not available"
                    );

                    if attempt < max_attempts {
                        if on_event(PollEvent::Retrying {
                            attempt,
                            max_attempts,
                            delay: self.policy.retry_delay,
                        })
                        .is_break()
                        {
                            return Err(PollError::Abandoned);
                        }
                        self.sleeper.sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        Err(PollError::Exhausted {
            attempts: max_attempts,
        })
    }
}
