/*!
 * File Trace Backend
 * Segment files on the host filesystem, framed with size-prefixed bincode
 *
 * Layout: [magic][header record][event record]...
 */

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::traits::{TraceSegment, TraceWriter};
use super::types::*;
use crate::core::bincode::{read_record, write_record};
use crate::core::limits::{TRACE_BUFFER_SIZE, TRACE_FORMAT_VERSION, TRACE_MAGIC};
use crate::core::types::Access;

/// Trace writer producing one file per segment
#[derive(Debug, Clone, Default)]
pub struct FileTraceWriter {
    create_dirs: bool,
}

impl FileTraceWriter {
    pub fn new() -> Self {
        Self { create_dirs: false }
    }

    /// Create missing parent directories when opening a segment
    pub fn with_create_dirs(mut self) -> Self {
        self.create_dirs = true;
        self
    }
}

impl TraceWriter for FileTraceWriter {
    fn open_segment(
        &mut self,
        path: &Path,
        header: &SegmentHeader,
    ) -> TraceResult<Box<dyn TraceSegment>> {
        if self.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Box::new(FileSegment::create(path, header)?))
    }
}

/// Open segment file
#[derive(Debug)]
pub struct FileSegment {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    events: u64,
}

impl FileSegment {
    /// Create the file and write magic and header
    pub fn create(path: &Path, header: &SegmentHeader) -> TraceResult<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::with_capacity(TRACE_BUFFER_SIZE, file);
        writer.write_all(&TRACE_MAGIC)?;
        write_record(&mut writer, header)?;

        debug!(path = %path.display(), flags = header.flags.bits(), "segment opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            events: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events appended so far
    pub fn events(&self) -> u64 {
        self.events
    }

    fn closed(&self) -> TraceError {
        TraceError::Closed(self.path.display().to_string())
    }
}

impl TraceSegment for FileSegment {
    fn append(&mut self, event: &TraceEvent) -> TraceResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.closed());
        };
        write_record(writer, event)?;
        self.events += 1;
        Ok(())
    }

    fn close(&mut self) -> TraceResult<()> {
        let writer = self.writer.take().ok_or_else(|| self.closed())?;
        let file = writer
            .into_inner()
            .map_err(|e| TraceError::Io(e.error().to_string()))?;
        file.sync_all()?;

        debug!(path = %self.path.display(), events = self.events, "segment closed");
        Ok(())
    }
}

/// Sequential reader over a segment file
pub struct TraceReader<R: Read = BufReader<File>> {
    reader: R,
    header: SegmentHeader,
    failed: bool,
}

impl TraceReader {
    /// Open a segment file and validate its header
    pub fn open(path: &Path) -> TraceResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::with_capacity(TRACE_BUFFER_SIZE, file))
    }
}

impl<R: Read> TraceReader<R> {
    /// Read magic and header from an arbitrary stream
    pub fn from_reader(mut reader: R) -> TraceResult<Self> {
        let mut magic = [0u8; TRACE_MAGIC.len()];
        reader
            .read_exact(&mut magic)
            .map_err(|_| TraceError::InvalidHeader("missing magic".into()))?;
        if magic != TRACE_MAGIC {
            return Err(TraceError::InvalidHeader("bad magic".into()));
        }

        let header: SegmentHeader = read_record(&mut reader)?
            .ok_or_else(|| TraceError::InvalidHeader("missing header".into()))?;
        if header.version != TRACE_FORMAT_VERSION {
            return Err(TraceError::InvalidHeader(format!(
                "unsupported version {}",
                header.version
            )));
        }

        Ok(Self {
            reader,
            header,
            failed: false,
        })
    }

    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// Read the next event, `Ok(None)` at end of segment
    pub fn read_event(&mut self) -> TraceResult<Option<TraceEvent>> {
        read_record(&mut self.reader).map_err(TraceError::from)
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = TraceResult<TraceEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_event() {
            Ok(event) => event.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Read every event of a segment file
pub fn read_segment(path: &Path) -> TraceResult<(SegmentHeader, Vec<TraceEvent>)> {
    let reader = TraceReader::open(path)?;
    let header = reader.header().clone();
    let events = reader.collect::<TraceResult<Vec<_>>>()?;
    Ok((header, events))
}

/// Write a raw access trace, returning the number of accesses written
pub fn write_access_trace<I>(path: &Path, accesses: I) -> TraceResult<u64>
where
    I: IntoIterator<Item = Access>,
{
    let mut segment = FileSegment::create(path, &SegmentHeader::trace())?;
    for access in accesses {
        segment.append(&TraceEvent::Access { access })?;
    }
    let written = segment.events();
    segment.close()?;
    Ok(written)
}
