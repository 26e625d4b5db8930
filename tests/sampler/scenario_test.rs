/*!
 * Scenario Tests
 * End-to-end sampling runs against the in-memory trace writer
 */

use pretty_assertions::assert_eq;
use reuse_sampler::{
    Access, MemoryTraceWriter, PeriodKind, Sampler, SamplerConfig, TraceEvent,
};

fn constant_sampler(
    base: &str,
    sample_period: u64,
    burst_size: u64,
    burst_period: u64,
) -> (MemoryTraceWriter, Sampler) {
    let recorder = MemoryTraceWriter::new();
    let config = SamplerConfig::builder()
        .base_path(base)
        .sample_period(sample_period)
        .sample_kind(PeriodKind::Constant)
        .burst_size(burst_size)
        .burst_period(burst_period)
        .burst_kind(PeriodKind::Constant)
        .line_size_lg2(6)
        .build()
        .expect("valid config");
    let sampler = Sampler::with_writer(config, recorder.clone()).expect("sampler init");
    (recorder, sampler)
}

/// A distinct cache line for every logical time
fn unique_line(time: u64) -> u64 {
    0x10_0000 + time * 64
}

#[test]
fn test_continuous_reuse_and_rearm() {
    let (recorder, mut sampler) = constant_sampler("a", 10, 0, 0);

    for t in 0..=10u64 {
        let access = match t {
            0 => Access::read(0x1000, t),
            7 => Access::write(0x1010, t),
            _ => Access::read(unique_line(t), t),
        };
        sampler.access(&access).expect("access");
    }

    assert!(sampler.is_armed(unique_line(10) >> 6));
    assert_eq!(sampler.next_sample_time(), Some(20));

    let stats = sampler.finalize().expect("finalize");
    assert_eq!(stats.bursts, 1);
    assert_eq!(stats.armed, 2);
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.dangling, 1);

    let segment = recorder.segment("a.0").expect("segment a.0");
    assert!(segment.closed);
    assert_eq!(
        segment.events,
        vec![
            TraceEvent::BurstStart { begin_time: 0 },
            TraceEvent::Sample {
                begin: Access::read(0x1000, 0),
                end: Access::write(0x1010, 7),
                line_size_lg2: 6,
            },
            TraceEvent::Dangling {
                begin: Access::read(unique_line(10), 10),
                line_size_lg2: 6,
            },
        ]
    );
}

#[test]
fn test_back_to_back_bursts_attribute_to_arming_burst() {
    let (recorder, mut sampler) = constant_sampler("b", 1000, 100, 0);

    for t in 0..=200u64 {
        let addr = if t == 150 { unique_line(0) } else { unique_line(t) };
        sampler.access(&Access::read(addr, t)).expect("access");
    }

    let stats = sampler.finalize().expect("finalize");
    assert_eq!(stats.bursts, 3);
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.dangling, 2);

    let first = recorder.segment("b.0").expect("segment b.0");
    assert_eq!(
        first.events,
        vec![
            TraceEvent::BurstStart { begin_time: 0 },
            TraceEvent::Sample {
                begin: Access::read(unique_line(0), 0),
                end: Access::read(unique_line(0), 150),
                line_size_lg2: 6,
            },
        ]
    );

    let second = recorder.segment("b.1").expect("segment b.1");
    assert_eq!(second.header.time_begin, 100);
    assert_eq!(
        second.events_of("dangling"),
        vec![&TraceEvent::Dangling {
            begin: Access::read(unique_line(100), 100),
            line_size_lg2: 6,
        }]
    );

    let order: Vec<String> = recorder
        .close_order()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    assert_eq!(order, vec!["b.0", "b.1", "b.2"]);
}

#[test]
fn test_idle_gap_between_bursts() {
    let (recorder, mut sampler) = constant_sampler("gap", 5, 10, 50);

    for t in 0..130u64 {
        sampler
            .access(&Access::read(unique_line(t), t))
            .expect("access");

        if t == 30 {
            assert!(!sampler.burst_active());
            assert_eq!(sampler.next_burst_time(), Some(60));
        }
        if t == 65 {
            assert_eq!(sampler.burst_end_time(), Some(70));
        }
    }

    let stats = sampler.finalize().expect("finalize");
    assert_eq!(stats.bursts, 3);
    assert_eq!(stats.armed, 6);
    assert_eq!(stats.dangling, 6);

    let starts: Vec<u64> = recorder
        .segments()
        .iter()
        .map(|s| s.header.time_begin)
        .collect();
    assert_eq!(starts, vec![0, 60, 120]);
}

#[test]
fn test_reuse_after_burst_end_still_sampled() {
    let (recorder, mut sampler) = constant_sampler("late", 100, 4, 1000);

    for t in 0..4u64 {
        sampler
            .access(&Access::read(unique_line(t), t))
            .expect("access");
    }
    // Burst 0 ended at t=4, the line armed at t=0 is still watched
    sampler
        .access(&Access::read(unique_line(9), 4))
        .expect("access");
    sampler
        .access(&Access::write(unique_line(0), 500))
        .expect("access");
    assert!(!sampler.burst_active());

    let stats = sampler.finalize().expect("finalize");
    assert_eq!(stats.samples, 1);
    assert_eq!(stats.dangling, 0);
    assert_eq!(recorder.count("sample"), 1);
}

#[test]
fn test_same_seed_same_output() {
    fn run(seed: u64) -> Vec<TraceEvent> {
        let recorder = MemoryTraceWriter::new();
        let config = SamplerConfig::builder()
            .base_path("seeded")
            .sample_period(8)
            .burst_size(64)
            .burst_period(32)
            .seed(seed)
            .build()
            .expect("valid config");
        let mut sampler = Sampler::with_writer(config, recorder.clone()).expect("sampler init");
        for t in 0..2_000u64 {
            let addr = (t * 7919 % 97) * 64;
            sampler.access(&Access::read(addr, t)).expect("access");
        }
        sampler.finalize().expect("finalize");
        recorder
            .segments()
            .into_iter()
            .flat_map(|s| s.events)
            .collect()
    }

    assert_eq!(run(42), run(42));
}
