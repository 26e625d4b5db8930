/*!
 * Sampler Engine
 * Per-access sampling decisions and the burst state machine
 *
 * Each access runs, in order:
 * 1. Reuse check: a live watchpoint on the access's line is consumed into a
 *    sample event on the burst that armed it, whatever the current state
 * 2. Burst end: a bounded burst whose end tick is now goes idle and the next
 *    burst start is drawn
 * 3. Burst begin: an idle sampler whose begin tick is now opens a burst and
 *    schedules its first sample on this very access
 * 4. Sampling: on the sample tick the line is armed and the next tick drawn
 *
 * All ticks are compared for equality. Callers that skip logical time can
 * step over a scheduled tick and miss it. A failing step does not stop the
 * later ones: a failed burst open is rescheduled, a failed arm still advances
 * the sampling tick, and the first error is returned once all steps ran.
 */

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::burst::{Burst, BurstManager};
use super::config::SamplerConfig;
use super::watchpoint::WatchpointTable;
use crate::core::errors::SamplerError;
use crate::core::limits::MIN_SAMPLE_ADVANCE;
use crate::core::types::{Access, SamplerResult, Time};
use crate::monitoring::span_operation;
use crate::trace::{SegmentHeader, TraceWriter};

/// Burst scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstState {
    /// No active burst; a burst opens at `begin_at`
    Idle { begin_at: Time },
    /// A burst is active; `end_at` is `None` for the unbounded burst
    Active {
        end_at: Option<Time>,
        next_sample: Time,
    },
}

/// Counters of a sampling run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerStats {
    pub accesses: u64,
    pub armed: u64,
    pub samples: u64,
    pub dangling: u64,
    pub bursts: u64,
}

/// Burst-based reuse sampler
///
/// Single logical writer: every method that changes state takes `&mut self`
/// and the engine does no locking of its own.
pub struct Sampler {
    config: SamplerConfig,
    rng: StdRng,
    watchpoints: WatchpointTable,
    bursts: BurstManager,
    state: BurstState,
    stats: SamplerStats,
}

impl Sampler {
    /// Create a sampler writing bursts through `writer`
    ///
    /// With `burst_size == 0` the single unbounded burst is opened at time 0
    /// here, so segment errors surface before any access is processed.
    pub fn new(config: SamplerConfig, writer: Box<dyn TraceWriter>) -> SamplerResult<Self> {
        config.validate()?;

        let header = SegmentHeader::burst(config.line_size_lg2).with_argv(config.argv.clone());
        let bursts = BurstManager::new(writer, config.base_path.clone(), header);

        let mut sampler = Self {
            rng: StdRng::seed_from_u64(config.seed),
            watchpoints: WatchpointTable::new(),
            bursts,
            state: BurstState::Idle { begin_at: 0 },
            stats: SamplerStats::default(),
            config,
        };

        if sampler.config.is_continuous() {
            sampler.start_burst(0)?;
        }

        debug!(
            base = %sampler.config.base_path.display(),
            sample_period = sampler.config.sample.period,
            sample_rnd = %sampler.config.sample.kind,
            burst_period = sampler.config.burst.period,
            burst_rnd = %sampler.config.burst.kind,
            burst_size = sampler.config.burst_size,
            line_size_lg2 = sampler.config.line_size_lg2,
            seed = sampler.config.seed,
            "sampler initialized"
        );
        Ok(sampler)
    }

    /// Convenience constructor taking the writer by value
    pub fn with_writer<W: TraceWriter + 'static>(config: SamplerConfig, writer: W) -> SamplerResult<Self> {
        Self::new(config, Box::new(writer))
    }

    /// Process one access event
    pub fn access(&mut self, access: &Access) -> SamplerResult<()> {
        let time = access.time;
        self.stats.accesses += 1;

        // Every step runs even after a failure; the first error is returned
        // once the schedule has moved past this tick
        let mut first_err = self.watchpoint_lookup(access).err();

        if let BurstState::Active {
            end_at: Some(end_at),
            ..
        } = self.state
        {
            if time == end_at {
                self.burst_end(time);
            }
        }

        if let BurstState::Idle { begin_at } = self.state {
            if time == begin_at {
                if let Err(e) = self.burst_begin(time) {
                    // Retry no earlier than the next access
                    let delay = self.config.burst.next(&mut self.rng).max(MIN_SAMPLE_ADVANCE);
                    self.state = BurstState::Idle {
                        begin_at: time.saturating_add(delay),
                    };
                    warn!(time, error = %e, "burst open failed, rescheduled");
                    first_err = first_err.or(Some(e));
                }
            }
        }

        if let BurstState::Active { next_sample, .. } = self.state {
            if time == next_sample {
                if let Err(e) = self.watchpoint_insert(access) {
                    first_err = first_err.or(Some(e));
                }
                let advance = self.config.sample.next(&mut self.rng).max(MIN_SAMPLE_ADVANCE);
                self.set_next_sample(time.saturating_add(advance));
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    /// Consume a watchpoint on the access's line into a sample event
    ///
    /// Returns whether a sample was recorded.
    pub fn watchpoint_lookup(&mut self, access: &Access) -> SamplerResult<bool> {
        let lg2 = self.config.line_size_lg2;
        let line = access.line(lg2);

        let Some(hit) = self.watchpoints.lookup_and_remove(line) else {
            return Ok(false);
        };

        hit.burst.log_sample(&hit.access, access, lg2)?;
        self.stats.samples += 1;

        trace!(
            line,
            burst = hit.burst.index(),
            begin = hit.access.time,
            end = access.time,
            "reuse sampled"
        );
        Ok(true)
    }

    /// Arm the access's line under the active burst
    ///
    /// Fails with `NoActiveBurst` while idle and with `AlreadyArmed` if the
    /// line has a live watchpoint.
    pub fn watchpoint_insert(&mut self, access: &Access) -> SamplerResult<()> {
        let burst = self
            .bursts
            .active()
            .cloned()
            .ok_or(SamplerError::NoActiveBurst)?;
        let line = access.line(self.config.line_size_lg2);

        self.watchpoints.insert(line, burst, *access)?;
        self.stats.armed += 1;

        trace!(line, time = access.time, "watchpoint armed");
        Ok(())
    }

    /// Open a new burst at `time` and schedule its window
    ///
    /// The first sample of a burst is always the access at `time`.
    pub fn burst_begin(&mut self, time: Time) -> SamplerResult<Arc<Burst>> {
        self.start_burst(time)
    }

    /// End the active burst at `time` and draw the next burst start
    ///
    /// The burst's segment stays open for watchpoints armed in it.
    pub fn burst_end(&mut self, time: Time) {
        self.bursts.end();
        let delay = self.config.burst.next(&mut self.rng);
        self.state = BurstState::Idle {
            begin_at: time.saturating_add(delay),
        };
    }

    pub fn burst_active(&self) -> bool {
        self.bursts.is_active()
    }

    fn start_burst(&mut self, time: Time) -> SamplerResult<Arc<Burst>> {
        let burst = self.bursts.begin(time)?;
        self.stats.bursts += 1;

        let end_at = if self.config.is_continuous() {
            None
        } else {
            Some(time.saturating_add(self.config.burst_size))
        };
        self.state = BurstState::Active {
            end_at,
            next_sample: time,
        };
        Ok(burst)
    }

    fn set_next_sample(&mut self, at: Time) {
        if let BurstState::Active { next_sample, .. } = &mut self.state {
            *next_sample = at;
        }
    }

    /// Flush dangling watchpoints and close every burst
    ///
    /// Dangling events go to the burst that armed each watchpoint, in arming
    /// order; bursts are then closed in creation order. The first failure
    /// aborts the rest.
    pub fn finalize(mut self) -> SamplerResult<SamplerStats> {
        let span = span_operation("finalize");
        let lg2 = self.config.line_size_lg2;

        match self.flush_and_close(lg2) {
            Ok(()) => {
                span.record_items_processed(self.stats.dangling);
                span.record_result(true);
                info!(
                    accesses = self.stats.accesses,
                    armed = self.stats.armed,
                    samples = self.stats.samples,
                    dangling = self.stats.dangling,
                    bursts = self.stats.bursts,
                    "sampler finalized"
                );
                Ok(self.stats)
            }
            Err(e) => {
                span.record_error(&e);
                Err(e)
            }
        }
    }

    fn flush_and_close(&mut self, lg2: u8) -> SamplerResult<()> {
        for wp in self.watchpoints.drain() {
            wp.burst.log_dangling(&wp.access, lg2)?;
            self.stats.dangling += 1;
        }
        self.bursts.close_all()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Number of armed, unresolved lines
    pub fn live_watchpoints(&self) -> usize {
        self.watchpoints.len()
    }

    /// Whether `line` currently has a watchpoint
    pub fn is_armed(&self, line: u64) -> bool {
        self.watchpoints.contains(line)
    }

    pub fn active_burst(&self) -> Option<&Arc<Burst>> {
        self.bursts.active()
    }

    /// Every burst created so far, in creation order
    pub fn bursts(&self) -> &[Arc<Burst>] {
        self.bursts.bursts()
    }

    /// Next sampling tick, defined only while a burst is active
    pub fn next_sample_time(&self) -> Option<Time> {
        match self.state {
            BurstState::Active { next_sample, .. } => Some(next_sample),
            BurstState::Idle { .. } => None,
        }
    }

    /// End tick of the active bounded burst
    pub fn burst_end_time(&self) -> Option<Time> {
        match self.state {
            BurstState::Active { end_at, .. } => end_at,
            BurstState::Idle { .. } => None,
        }
    }

    /// Start tick of the next burst while idle
    pub fn next_burst_time(&self) -> Option<Time> {
        match self.state {
            BurstState::Idle { begin_at } => Some(begin_at),
            BurstState::Active { .. } => None,
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("bursts", &self.bursts)
            .field("live_watchpoints", &self.watchpoints.len())
            .field("stats", &self.stats)
            .finish()
    }
}
