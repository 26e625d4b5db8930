/*!
 * In-Memory Trace Backend
 * Volatile recording writer for tests and embedding integrations
 */

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::traits::{TraceSegment, TraceWriter};
use super::types::*;

/// Recorded state of one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSegment {
    pub path: PathBuf,
    pub header: SegmentHeader,
    pub events: Vec<TraceEvent>,
    pub closed: bool,
}

impl RecordedSegment {
    /// Events of the given kind (see `TraceEvent::kind`)
    pub fn events_of(&self, kind: &str) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.kind() == kind).collect()
    }
}

#[derive(Debug, Default)]
struct State {
    segments: Vec<RecordedSegment>,
    /// Indices of segments in the order they were closed
    close_order: Vec<usize>,
}

/// In-memory trace writer
///
/// Clones share the same recording, so a test can keep one handle while
/// the sampler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceWriter {
    state: Arc<Mutex<State>>,
}

impl MemoryTraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all segments in open order
    pub fn segments(&self) -> Vec<RecordedSegment> {
        self.state.lock().segments.clone()
    }

    /// Snapshot of one segment by path
    pub fn segment(&self, path: impl AsRef<Path>) -> Option<RecordedSegment> {
        let path = path.as_ref();
        self.state
            .lock()
            .segments
            .iter()
            .find(|s| s.path == path)
            .cloned()
    }

    /// Paths of closed segments in the order they were closed
    pub fn close_order(&self) -> Vec<PathBuf> {
        let state = self.state.lock();
        state
            .close_order
            .iter()
            .map(|&i| state.segments[i].path.clone())
            .collect()
    }

    /// Total number of events of the given kind across all segments
    pub fn count(&self, kind: &str) -> usize {
        self.state
            .lock()
            .segments
            .iter()
            .flat_map(|s| s.events.iter())
            .filter(|e| e.kind() == kind)
            .count()
    }
}

impl TraceWriter for MemoryTraceWriter {
    fn open_segment(
        &mut self,
        path: &Path,
        header: &SegmentHeader,
    ) -> TraceResult<Box<dyn TraceSegment>> {
        let mut state = self.state.lock();
        let index = state.segments.len();
        state.segments.push(RecordedSegment {
            path: path.to_path_buf(),
            header: header.clone(),
            events: Vec::new(),
            closed: false,
        });

        Ok(Box::new(MemorySegment {
            state: Arc::clone(&self.state),
            index,
        }))
    }
}

/// Handle to one recorded segment
#[derive(Debug)]
struct MemorySegment {
    state: Arc<Mutex<State>>,
    index: usize,
}

impl TraceSegment for MemorySegment {
    fn append(&mut self, event: &TraceEvent) -> TraceResult<()> {
        let mut state = self.state.lock();
        let segment = &mut state.segments[self.index];
        if segment.closed {
            return Err(TraceError::Closed(segment.path.display().to_string()));
        }
        segment.events.push(event.clone());
        Ok(())
    }

    fn close(&mut self) -> TraceResult<()> {
        let mut state = self.state.lock();
        let segment = &mut state.segments[self.index];
        if segment.closed {
            return Err(TraceError::Closed(segment.path.display().to_string()));
        }
        segment.closed = true;
        state.close_order.push(self.index);
        Ok(())
    }
}
