/*!
 * Trace Types
 * Event model, segment header and errors shared by all trace backends
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

use crate::core::bincode::BincodeError;
use crate::core::limits::TRACE_FORMAT_VERSION;
use crate::core::types::{Access, Time};

/// Trace operation result
pub type TraceResult<T> = Result<T, TraceError>;

/// Trace backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Segment closed: {0}")]
    Closed(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Truncated record: {0}")]
    Truncated(String),

    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),
}

impl From<std::io::Error> for TraceError {
    fn from(err: std::io::Error) -> Self {
        TraceError::Io(err.to_string())
    }
}

impl From<BincodeError> for TraceError {
    fn from(err: BincodeError) -> Self {
        match err {
            BincodeError::Io(e) => TraceError::Io(e.to_string()),
            e @ BincodeError::Truncated { .. } => TraceError::Truncated(e.to_string()),
            e => TraceError::Encoding(e.to_string()),
        }
    }
}

/// Segment flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentFlags(u32);

impl SegmentFlags {
    pub const NONE: Self = Self(0);
    /// Records use the writer's native byte order
    pub const NATIVE_ENDIAN: Self = Self(1 << 0);
    /// Segment holds raw access events (an input trace)
    pub const TRACE: Self = Self(1 << 1);
    /// Segment holds sample and dangling events
    pub const SAMPLE: Self = Self(1 << 2);
    /// Segment belongs to one sampling burst
    pub const BURST: Self = Self(1 << 3);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SegmentFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Header written at the start of every segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,
    pub flags: SegmentFlags,
    /// Line size in bytes the segment was sampled with
    pub line_size: u64,
    pub time_begin: Time,
    pub time_end: Time,
    /// Command line of the producing tool, if recorded
    pub argv: Vec<String>,
}

impl SegmentHeader {
    /// Header for a sampling burst segment
    pub fn burst(line_size_lg2: u8) -> Self {
        Self {
            version: TRACE_FORMAT_VERSION,
            flags: SegmentFlags::NATIVE_ENDIAN | SegmentFlags::SAMPLE | SegmentFlags::BURST,
            line_size: 1u64 << line_size_lg2,
            time_begin: 0,
            time_end: 0,
            argv: Vec::new(),
        }
    }

    /// Header for a raw access trace
    pub fn trace() -> Self {
        Self {
            version: TRACE_FORMAT_VERSION,
            flags: SegmentFlags::NATIVE_ENDIAN | SegmentFlags::TRACE,
            line_size: 0,
            time_begin: 0,
            time_end: 0,
            argv: Vec::new(),
        }
    }

    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }

    pub fn is_trace(&self) -> bool {
        self.flags.contains(SegmentFlags::TRACE)
    }
}

/// One record of a trace segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// A raw memory reference (input traces only)
    Access { access: Access },
    /// Marks the beginning of a burst
    BurstStart { begin_time: Time },
    /// A watchpoint resolved by a second touch of its line
    Sample {
        begin: Access,
        end: Access,
        line_size_lg2: u8,
    },
    /// A watchpoint never resolved before shutdown
    Dangling { begin: Access, line_size_lg2: u8 },
}

impl TraceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Access { .. } => "access",
            Self::BurstStart { .. } => "burst_start",
            Self::Sample { .. } => "sample",
            Self::Dangling { .. } => "dangling",
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access { access } => write!(
                f,
                "access t={} {} addr={:#x} pc={:#x} tid={}",
                access.time, access.kind, access.addr, access.pc, access.tid
            ),
            Self::BurstStart { begin_time } => write!(f, "burst_start t={}", begin_time),
            Self::Sample { begin, end, .. } => write!(
                f,
                "sample addr={:#x} t={}..{} distance={}",
                begin.addr,
                begin.time,
                end.time,
                end.time.saturating_sub(begin.time)
            ),
            Self::Dangling { begin, .. } => {
                write!(f, "dangling addr={:#x} t={}", begin.addr, begin.time)
            }
        }
    }
}
