/*!
 * Reuse Sampler Library
 * Burst-based sampling of memory reuse for offline and live access sources
 */

pub mod core;
pub mod integration;
pub mod monitoring;
pub mod sampler;
pub mod trace;

// Re-exports
pub use crate::core::errors::{SamplerError, TraceError};
pub use crate::core::types::{Access, AccessType, Address, LineId, SamplerResult, ThreadId, Time};
pub use integration::{replay, replay_file, ErrorPolicy, ReplayStats, SharedSampler};
pub use monitoring::{init_tracing, span_operation};
pub use sampler::{
    PeriodGenerator, PeriodKind, Sampler, SamplerConfig, SamplerConfigBuilder, SamplerStats,
};
pub use trace::{
    FileTraceWriter, MemoryTraceWriter, SegmentFlags, SegmentHeader, TraceEvent, TraceReader,
    TraceResult, TraceSegment, TraceWriter,
};
