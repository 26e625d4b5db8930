/*!
 * Burst Segment Manager
 * One output segment per burst, kept open until the sampler is finalized
 *
 * A burst logically ends when its window closes, but watchpoints armed in it
 * may resolve later and must still append to its segment. Bursts are therefore
 * shared (`Arc`) between the registry, the active pointer and every watchpoint
 * armed in them, and only `close_all` releases the segments.
 */

use parking_lot::Mutex;
use smartstring::alias::String as SmartString;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::types::{Access, SamplerResult, Time};
use crate::trace::{SegmentHeader, TraceError, TraceEvent, TraceSegment, TraceWriter};

/// A sampling burst and its output segment
pub struct Burst {
    index: u64,
    name: SmartString,
    begin_time: Time,
    /// `None` once closed
    segment: Mutex<Option<Box<dyn TraceSegment>>>,
}

impl Burst {
    fn new(index: u64, name: SmartString, begin_time: Time, segment: Box<dyn TraceSegment>) -> Self {
        Self {
            index,
            name,
            begin_time,
            segment: Mutex::new(Some(segment)),
        }
    }

    /// Sequence index (0 for the first burst)
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Display name, the segment path
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn begin_time(&self) -> Time {
        self.begin_time
    }

    pub fn is_closed(&self) -> bool {
        self.segment.lock().is_none()
    }

    /// Append a resolved reuse pair
    pub fn log_sample(&self, begin: &Access, end: &Access, line_size_lg2: u8) -> SamplerResult<()> {
        self.append(&TraceEvent::Sample {
            begin: *begin,
            end: *end,
            line_size_lg2,
        })
    }

    /// Append an unresolved watchpoint
    pub fn log_dangling(&self, begin: &Access, line_size_lg2: u8) -> SamplerResult<()> {
        self.append(&TraceEvent::Dangling {
            begin: *begin,
            line_size_lg2,
        })
    }

    fn append(&self, event: &TraceEvent) -> SamplerResult<()> {
        let mut slot = self.segment.lock();
        let segment = slot
            .as_mut()
            .ok_or_else(|| TraceError::Closed(self.name.to_string()))?;
        segment.append(event)?;
        Ok(())
    }

    /// Flush and release the segment; a second call fails
    pub fn close(&self) -> SamplerResult<()> {
        let mut segment = self
            .segment
            .lock()
            .take()
            .ok_or_else(|| TraceError::Closed(self.name.to_string()))?;
        segment.close()?;
        debug!(burst = %self.name, index = self.index, "burst closed");
        Ok(())
    }
}

impl fmt::Debug for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Burst")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("begin_time", &self.begin_time)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Creates and owns every burst of a sampling run
pub struct BurstManager {
    writer: Box<dyn TraceWriter>,
    base_path: PathBuf,
    header: SegmentHeader,
    next_index: u64,
    /// Append-only, creation order
    bursts: Vec<Arc<Burst>>,
    active: Option<Arc<Burst>>,
}

impl BurstManager {
    pub fn new(writer: Box<dyn TraceWriter>, base_path: impl Into<PathBuf>, header: SegmentHeader) -> Self {
        Self {
            writer,
            base_path: base_path.into(),
            header,
            next_index: 0,
            bursts: Vec::new(),
            active: None,
        }
    }

    /// Segment path of burst `index`: `<base>.<index>`
    pub fn segment_path(&self, index: u64) -> PathBuf {
        let mut path = OsString::from(self.base_path.as_os_str());
        path.push(format!(".{}", index));
        PathBuf::from(path)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Open a new burst at `time` and make it active
    ///
    /// The sequence index only advances when the segment was opened, so a
    /// failed attempt can be retried under the same name.
    pub fn begin(&mut self, time: Time) -> SamplerResult<Arc<Burst>> {
        let index = self.next_index;
        let path = self.segment_path(index);

        let mut header = self.header.clone();
        header.time_begin = time;

        let mut segment = self.writer.open_segment(&path, &header)?;
        if let Err(e) = segment.append(&TraceEvent::BurstStart { begin_time: time }) {
            // Release the half-written segment before the name is reused
            if let Err(close_err) = segment.close() {
                warn!(path = %path.display(), error = %close_err, "failed to close aborted segment");
            }
            return Err(e.into());
        }
        self.next_index += 1;

        let name: SmartString = path.to_string_lossy().as_ref().into();
        let burst = Arc::new(Burst::new(index, name, time, segment));

        debug!(burst = %burst.name(), index, time, "burst started");

        self.bursts.push(Arc::clone(&burst));
        self.active = Some(Arc::clone(&burst));
        Ok(burst)
    }

    /// Clear the active burst; its segment stays open
    pub fn end(&mut self) -> Option<Arc<Burst>> {
        let ended = self.active.take();
        if let Some(burst) = &ended {
            debug!(burst = %burst.name(), index = burst.index(), "burst ended");
        }
        ended
    }

    pub fn active(&self) -> Option<&Arc<Burst>> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Every burst ever created, in creation order
    pub fn bursts(&self) -> &[Arc<Burst>] {
        &self.bursts
    }

    /// Close every burst in creation order; stops at the first failure
    pub fn close_all(&mut self) -> SamplerResult<()> {
        self.active = None;
        for burst in &self.bursts {
            burst.close()?;
        }
        Ok(())
    }
}

impl fmt::Debug for BurstManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BurstManager")
            .field("base_path", &self.base_path)
            .field("next_index", &self.next_index)
            .field("bursts", &self.bursts.len())
            .field("active", &self.active.as_ref().map(|b| b.index()))
            .finish()
    }
}
