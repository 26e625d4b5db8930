/*!
 * Shared Sampler
 * Serialized front end for multi-threaded access sources
 *
 * Live instrumentation reports references from many threads. All of them go
 * through one lock that also assigns logical time from a global counter, so
 * the engine sees a single stream with strictly increasing time.
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::core::errors::SamplerError;
use crate::core::types::{Access, AccessType, Address, SamplerResult, ThreadId, Time};
use crate::sampler::{Sampler, SamplerStats};

/// What the front end does with a failed per-access call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Return the error to the instrumentation callback
    #[default]
    Propagate,
    /// Log, count and keep sampling
    LogAndContinue,
}

struct Inner {
    /// `None` once finalized
    sampler: Option<Sampler>,
    clock: Time,
    dropped_errors: u64,
}

/// Thread-safe handle to one sampler
#[derive(Clone)]
pub struct SharedSampler {
    inner: Arc<Mutex<Inner>>,
    policy: ErrorPolicy,
}

impl SharedSampler {
    pub fn new(sampler: Sampler, policy: ErrorPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sampler: Some(sampler),
                clock: 0,
                dropped_errors: 0,
            })),
            policy,
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Report one memory operand
    ///
    /// Non-data references are dropped without consuming a time tick.
    pub fn record(
        &self,
        pc: Address,
        addr: Address,
        tid: ThreadId,
        len: u16,
        kind: AccessType,
    ) -> SamplerResult<()> {
        if !kind.is_data_access() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        let time = inner.clock;
        let access = Access {
            pc,
            addr,
            time,
            tid,
            len,
            kind,
        };

        let sampler = inner.sampler.as_mut().ok_or(SamplerError::Finalized)?;
        let result = sampler.access(&access);
        inner.clock += 1;

        match result {
            Ok(()) => Ok(()),
            Err(e) => match self.policy {
                ErrorPolicy::Propagate => Err(e),
                ErrorPolicy::LogAndContinue => {
                    inner.dropped_errors += 1;
                    warn!(error = %e, time, tid, "sampler error ignored");
                    Ok(())
                }
            },
        }
    }

    /// Logical time the next reference will get
    pub fn now(&self) -> Time {
        self.inner.lock().clock
    }

    /// Errors swallowed under `LogAndContinue`
    pub fn dropped_errors(&self) -> u64 {
        self.inner.lock().dropped_errors
    }

    /// Current counters, `None` after finalize
    pub fn stats(&self) -> Option<SamplerStats> {
        self.inner.lock().sampler.as_ref().map(Sampler::stats)
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.lock().sampler.is_none()
    }

    /// Finalize the sampler; later calls fail with `Finalized`
    ///
    /// Finalize errors are always returned, whatever the policy.
    pub fn finalize(&self) -> SamplerResult<SamplerStats> {
        let sampler = self
            .inner
            .lock()
            .sampler
            .take()
            .ok_or(SamplerError::Finalized)?;
        sampler.finalize()
    }
}

impl std::fmt::Debug for SharedSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SharedSampler")
            .field("policy", &self.policy)
            .field("clock", &inner.clock)
            .field("finalized", &inner.sampler.is_none())
            .field("dropped_errors", &inner.dropped_errors)
            .finish()
    }
}
