/*!
 * Watchpoint Table
 * Pending cache-line watchpoints waiting for a second touch
 */

use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

use super::burst::Burst;
use crate::core::errors::SamplerError;
use crate::core::limits::WATCHPOINT_TABLE_CAPACITY;
use crate::core::types::{Access, LineId, SamplerResult};

/// An armed cache line
#[derive(Debug, Clone)]
pub struct Watchpoint {
    pub line: LineId,
    /// Burst the watchpoint was armed in; never changes
    pub burst: Arc<Burst>,
    /// The access that armed the line
    pub access: Access,
}

/// Line-id keyed table of live watchpoints
///
/// At most one watchpoint per line. Entries leave the table only through
/// `lookup_and_remove` or `drain`; there is no eviction.
#[derive(Debug)]
pub struct WatchpointTable {
    entries: HashMap<LineId, Watchpoint, RandomState>,
}

impl WatchpointTable {
    pub fn new() -> Self {
        Self::with_capacity(WATCHPOINT_TABLE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Consume the watchpoint on `line`, if any
    #[inline]
    pub fn lookup_and_remove(&mut self, line: LineId) -> Option<Watchpoint> {
        self.entries.remove(&line)
    }

    /// Arm `line`
    ///
    /// Arming a line that already has a live watchpoint is rejected with
    /// `AlreadyArmed` and leaves the existing watchpoint in place.
    pub fn insert(&mut self, line: LineId, burst: Arc<Burst>, access: Access) -> SamplerResult<()> {
        if self.entries.contains_key(&line) {
            return Err(SamplerError::AlreadyArmed(line));
        }
        self.entries.try_reserve(1)?;
        self.entries.insert(line, Watchpoint { line, burst, access });
        Ok(())
    }

    pub fn contains(&self, line: LineId) -> bool {
        self.entries.contains_key(&line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every watchpoint, ordered by arming time then line
    pub fn drain(&mut self) -> Vec<Watchpoint> {
        let mut drained: Vec<Watchpoint> = self.entries.drain().map(|(_, w)| w).collect();
        drained.sort_unstable_by_key(|w| (w.access.time, w.line));
        drained
    }
}

impl Default for WatchpointTable {
    fn default() -> Self {
        Self::new()
    }
}
