/*!
 * Shared Sampler Tests
 * Multi-threaded access sources feeding one sampler
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

use reuse_sampler::trace::read_segment;
use reuse_sampler::{
    AccessType, ErrorPolicy, FileTraceWriter, MemoryTraceWriter, PeriodKind, Sampler,
    SamplerConfig, SamplerError, SharedSampler, TraceEvent, TraceResult, TraceSegment,
    TraceWriter,
};
use std::path::Path;

#[test]
fn test_threads_share_one_timeline() {
    let dir = TempDir::new().unwrap();
    let config = SamplerConfig::builder()
        .base_path(dir.path().join("live"))
        .sample_period(16)
        .sample_kind(PeriodKind::Constant)
        .burst_size(256)
        .burst_period(64)
        .burst_kind(PeriodKind::Constant)
        .build()
        .expect("valid config");
    let sampler = Sampler::with_writer(config, FileTraceWriter::new()).expect("sampler init");
    let shared = SharedSampler::new(sampler, ErrorPolicy::Propagate);

    let handles: Vec<_> = (0..4u32)
        .map(|tid| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..500u64 {
                    // Each thread loops over a private 16-line working set
                    let addr = (u64::from(tid) << 20) | ((i % 16) << 6);
                    let kind = if i % 10 == 9 {
                        AccessType::Prefetch
                    } else {
                        AccessType::Read
                    };
                    shared
                        .record(0x400000 + i, addr, tid, 8, kind)
                        .expect("record");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    // Prefetches do not advance the clock
    assert_eq!(shared.now(), 4 * 450);

    let stats = shared.finalize().expect("finalize");
    assert_eq!(stats.accesses, 1800);
    assert_eq!(stats.armed, stats.samples + stats.dangling);
    assert!(stats.samples > 0);

    let mut times = Vec::new();
    for index in 0..stats.bursts {
        let path = dir.path().join(format!("live.{index}"));
        let (_, events) = read_segment(&path).expect("segment readable");
        for event in events {
            if let TraceEvent::Sample { begin, end, .. } = event {
                assert_eq!(begin.tid, end.tid);
                assert!(end.time > begin.time);
                times.push(begin.time);
            }
        }
    }
    assert_eq!(times.len() as u64, stats.samples);
}

/// Writer whose segments refuse every append after the burst header
#[derive(Debug, Clone, Default)]
struct FailingWriter {
    inner: MemoryTraceWriter,
}

struct FailingSegment {
    inner: Box<dyn TraceSegment>,
    appended: usize,
}

impl TraceWriter for FailingWriter {
    fn open_segment(
        &mut self,
        path: &Path,
        header: &reuse_sampler::SegmentHeader,
    ) -> TraceResult<Box<dyn TraceSegment>> {
        let inner = self.inner.open_segment(path, header)?;
        Ok(Box::new(FailingSegment { inner, appended: 0 }))
    }
}

impl TraceSegment for FailingSegment {
    fn append(&mut self, event: &TraceEvent) -> TraceResult<()> {
        if self.appended > 0 {
            return Err(reuse_sampler::TraceError::Io("disk full".into()));
        }
        self.appended += 1;
        self.inner.append(event)
    }

    fn close(&mut self) -> TraceResult<()> {
        self.inner.close()
    }
}

fn failing_shared(policy: ErrorPolicy) -> SharedSampler {
    let config = SamplerConfig::builder()
        .base_path("failing")
        .sample_period(1)
        .sample_kind(PeriodKind::Constant)
        .build()
        .expect("valid config");
    let sampler = Sampler::with_writer(config, FailingWriter::default()).expect("sampler init");
    SharedSampler::new(sampler, policy)
}

#[test]
fn test_propagate_policy_returns_errors() {
    let shared = failing_shared(ErrorPolicy::Propagate);

    shared.record(0, 0x1000, 0, 8, AccessType::Read).unwrap();
    let err = shared
        .record(0, 0x1000, 0, 8, AccessType::Write)
        .unwrap_err();
    assert!(err.is_io());
    assert_eq!(shared.dropped_errors(), 0);
    // The failed access still consumed its tick
    assert_eq!(shared.now(), 2);
}

#[test]
fn test_log_and_continue_counts_errors() {
    let shared = Arc::new(failing_shared(ErrorPolicy::LogAndContinue));

    shared.record(0, 0x1000, 0, 8, AccessType::Read).unwrap();
    shared.record(0, 0x1000, 0, 8, AccessType::Write).unwrap();
    shared.record(0, 0x2000, 0, 8, AccessType::Read).unwrap();
    assert_eq!(shared.dropped_errors(), 1);

    // Dangling flush hits the same failing segment
    assert!(shared.finalize().unwrap_err().is_io());
    assert_eq!(shared.finalize().unwrap_err(), SamplerError::Finalized);
}

/// Writer whose second segment open fails
#[derive(Debug, Clone, Default)]
struct FlakyOpenWriter {
    inner: MemoryTraceWriter,
    opens: usize,
}

impl TraceWriter for FlakyOpenWriter {
    fn open_segment(
        &mut self,
        path: &Path,
        header: &reuse_sampler::SegmentHeader,
    ) -> TraceResult<Box<dyn TraceSegment>> {
        self.opens += 1;
        if self.opens == 2 {
            return Err(reuse_sampler::TraceError::Io("transient open failure".into()));
        }
        self.inner.open_segment(path, header)
    }
}

#[test]
fn test_bursts_resume_after_open_failure() {
    let config = SamplerConfig::builder()
        .base_path("flaky")
        .sample_period(2)
        .sample_kind(PeriodKind::Constant)
        .burst_size(10)
        .burst_period(0)
        .burst_kind(PeriodKind::Constant)
        .build()
        .expect("valid config");
    let writer = FlakyOpenWriter::default();
    let recorder = writer.inner.clone();
    let sampler = Sampler::with_writer(config, writer).expect("sampler init");
    let shared = SharedSampler::new(sampler, ErrorPolicy::LogAndContinue);

    for i in 0..10_000u64 {
        shared
            .record(0, i << 6, 0, 8, AccessType::Read)
            .expect("record");
    }
    assert_eq!(shared.dropped_errors(), 1);

    let stats = shared.finalize().expect("finalize");
    // One start at 0, then a retry at 11 and every 10 accesses after it
    assert_eq!(stats.bursts, 1000);
    assert_eq!(recorder.segments().len(), 1000);
    assert_eq!(stats.armed, 5000);
}
