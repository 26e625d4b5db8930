/*!
 * Trace Replay
 * Offline sampling of a recorded access trace
 *
 * Replay is strict: the first read or sampler error aborts the run.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::core::types::SamplerResult;
use crate::monitoring::span_operation;
use crate::sampler::Sampler;
use crate::trace::{TraceError, TraceEvent, TraceReader, TraceResult};

/// Counters of one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Events read from the trace
    pub events: u64,
    /// Data accesses handed to the sampler
    pub delivered: u64,
    /// Non-data accesses filtered out
    pub skipped: u64,
}

/// Feed every access event of `events` into `sampler`
///
/// Only data accesses reach the sampler. Any other event kind means the input
/// is not a raw access trace and fails the replay.
pub fn replay<I>(events: I, sampler: &mut Sampler) -> SamplerResult<ReplayStats>
where
    I: IntoIterator<Item = TraceResult<TraceEvent>>,
{
    let span = span_operation("replay");
    let mut stats = ReplayStats::default();

    let result = feed(events, sampler, &mut stats);

    span.record_items_processed(stats.events);
    match result {
        Ok(()) => {
            span.record_result(true);
            debug!(
                events = stats.events,
                delivered = stats.delivered,
                skipped = stats.skipped,
                "replay finished"
            );
            Ok(stats)
        }
        Err(e) => {
            span.record_error(&e);
            Err(e)
        }
    }
}

fn feed<I>(events: I, sampler: &mut Sampler, stats: &mut ReplayStats) -> SamplerResult<()>
where
    I: IntoIterator<Item = TraceResult<TraceEvent>>,
{
    for event in events {
        let event = event?;
        stats.events += 1;

        let access = match event {
            TraceEvent::Access { access } => access,
            other => {
                return Err(TraceError::UnexpectedEvent(format!(
                    "{} event in access trace",
                    other.kind()
                ))
                .into())
            }
        };

        if !access.kind.is_data_access() {
            stats.skipped += 1;
            continue;
        }

        sampler.access(&access)?;
        stats.delivered += 1;
    }
    Ok(())
}

/// Replay an access trace file
pub fn replay_file(path: &Path, sampler: &mut Sampler) -> SamplerResult<ReplayStats> {
    let reader = TraceReader::open(path)?;
    if !reader.header().is_trace() {
        return Err(TraceError::InvalidHeader(format!(
            "{} is not an access trace",
            path.display()
        ))
        .into());
    }
    replay(reader, sampler)
}
