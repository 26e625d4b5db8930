/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

use super::types::LineId;

// Re-export TraceError from trace module
pub use crate::trace::types::TraceError;

/// Unified sampler error type with miette diagnostics
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SamplerError {
    #[error("Allocation failed: {0}")]
    #[diagnostic(
        code(sampler::allocation_failure),
        help("The watchpoint table or a burst could not grow. Increase the sample period.")
    )]
    AllocationFailure(String),

    #[error("Segment I/O failed: {0}")]
    #[diagnostic(
        code(sampler::segment_io),
        help("The trace writer failed to open, append to or close a burst segment.")
    )]
    SegmentIo(#[from] TraceError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(sampler::configuration),
        help("Generator kinds are `const` or `exp`; the line size exponent must be at most 63.")
    )]
    Configuration(String),

    #[error("Line {0:#x} already has a live watchpoint")]
    #[diagnostic(
        code(sampler::already_armed),
        help("A line can only be armed again after its previous watchpoint was consumed.")
    )]
    AlreadyArmed(LineId),

    #[error("No active burst")]
    #[diagnostic(
        code(sampler::no_active_burst),
        help("Watchpoints can only be armed while a burst is active.")
    )]
    NoActiveBurst,

    #[error("Sampler already finalized")]
    #[diagnostic(
        code(sampler::finalized),
        help("Finalize runs once at shutdown; no accesses are accepted afterwards.")
    )]
    Finalized,
}

impl SamplerError {
    /// Whether the error came from the trace writer
    pub fn is_io(&self) -> bool {
        matches!(self, Self::SegmentIo(_))
    }
}

impl From<std::collections::TryReserveError> for SamplerError {
    fn from(err: std::collections::TryReserveError) -> Self {
        SamplerError::AllocationFailure(err.to_string())
    }
}
