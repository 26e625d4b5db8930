/*!
 * Core Types
 * Common types shared by the sampler, the trace backends and the integrations
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical access time (a counter of observed accesses, not wall-clock)
pub type Time = u64;

/// Virtual address of an access
pub type Address = u64;

/// Cache-line identifier (`address >> line_size_lg2`)
pub type LineId = u64;

/// Thread identifier as reported by the access source
pub type ThreadId = u32;

/// Common result type for sampler operations
pub type SamplerResult<T> = Result<T, super::errors::SamplerError>;

/// Kind of memory reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Read,
    Write,
    ReadWrite,
    /// Software prefetch; not a data access, filtered out before sampling
    Prefetch,
}

impl AccessType {
    /// Whether this reference is a real data access the sampler should see
    #[inline]
    pub const fn is_data_access(self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::ReadWrite)
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "rd",
            Self::Write => "wr",
            Self::ReadWrite => "rw",
            Self::Prefetch => "pf",
        };
        f.write_str(s)
    }
}

/// A single memory reference, immutable once produced by the access source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Program counter of the referencing instruction
    pub pc: Address,
    pub addr: Address,
    pub time: Time,
    pub tid: ThreadId,
    /// Access length in bytes
    pub len: u16,
    pub kind: AccessType,
}

impl Access {
    /// Create a new access with program counter and thread id zeroed
    pub fn new(addr: Address, time: Time, kind: AccessType) -> Self {
        Self {
            pc: 0,
            addr,
            time,
            tid: 0,
            len: 8,
            kind,
        }
    }

    /// Shorthand for an 8-byte read
    pub fn read(addr: Address, time: Time) -> Self {
        Self::new(addr, time, AccessType::Read)
    }

    /// Shorthand for an 8-byte write
    pub fn write(addr: Address, time: Time) -> Self {
        Self::new(addr, time, AccessType::Write)
    }

    pub fn with_pc(mut self, pc: Address) -> Self {
        self.pc = pc;
        self
    }

    pub fn with_tid(mut self, tid: ThreadId) -> Self {
        self.tid = tid;
        self
    }

    pub fn with_len(mut self, len: u16) -> Self {
        self.len = len;
        self
    }

    /// Cache line touched by this access
    #[inline]
    pub fn line(&self, line_size_lg2: u8) -> LineId {
        self.addr >> line_size_lg2
    }
}
