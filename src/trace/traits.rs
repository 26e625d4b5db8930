/*!
 * Trace Traits
 * Abstraction over the durable event writer used by the sampler
 */

use std::path::Path;

use super::types::{SegmentHeader, TraceEvent, TraceResult};

/// Trace writer trait
///
/// Opens one segment per burst. Implementations decide how events are
/// encoded and persisted; the sampler only sees this trait.
#[cfg_attr(test, mockall::automock)]
pub trait TraceWriter: Send {
    /// Create a new segment at `path` and write its header
    fn open_segment(
        &mut self,
        path: &Path,
        header: &SegmentHeader,
    ) -> TraceResult<Box<dyn TraceSegment>>;
}

/// Open segment handle trait
///
/// A segment accepts appends until it is closed. Appending to or closing an
/// already closed segment is an error.
#[cfg_attr(test, mockall::automock)]
pub trait TraceSegment: Send {
    /// Append one event
    fn append(&mut self, event: &TraceEvent) -> TraceResult<()>;

    /// Flush and release the segment
    fn close(&mut self) -> TraceResult<()>;
}
