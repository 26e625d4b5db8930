/*!
 * Trace Output
 * Durable event writers and readers behind the `TraceWriter` seam
 */

pub mod file;
pub mod memory;
pub mod traits;
pub mod types;

pub use file::{read_segment, write_access_trace, FileSegment, FileTraceWriter, TraceReader};
pub use memory::{MemoryTraceWriter, RecordedSegment};
pub use traits::{TraceSegment, TraceWriter};
pub use types::{SegmentFlags, SegmentHeader, TraceError, TraceEvent, TraceResult};
