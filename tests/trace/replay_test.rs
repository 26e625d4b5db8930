/*!
 * Replay Tests
 * Access traces on disk sampled into burst segment files
 */

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use reuse_sampler::trace::{read_segment, write_access_trace, SegmentFlags};
use reuse_sampler::{
    replay_file, Access, AccessType, FileTraceWriter, PeriodKind, Sampler, SamplerConfig,
    SamplerError, SegmentHeader, TraceError, TraceEvent, TraceSegment, TraceWriter,
};

fn file_sampler(dir: &TempDir, sample_period: u64) -> Sampler {
    let config = SamplerConfig::builder()
        .base_path(dir.path().join("out/sample"))
        .sample_period(sample_period)
        .sample_kind(PeriodKind::Constant)
        .argv(vec!["usfsampler".into(), "-s".into(), sample_period.to_string()])
        .build()
        .expect("valid config");
    Sampler::with_writer(config, FileTraceWriter::new().with_create_dirs()).expect("sampler init")
}

#[test]
fn test_replay_file_end_to_end() {
    let dir = TempDir::new().unwrap();
    let trace = dir.path().join("input.trace");

    let accesses = vec![
        Access::read(0x1000, 0).with_pc(0x400100),
        Access::new(0x7000, 1, AccessType::Prefetch),
        Access::write(0x2000, 1),
        Access::new(0x1020, 2, AccessType::ReadWrite).with_tid(3),
        Access::read(0x3000, 3),
        Access::read(0x4000, 4),
    ];
    assert_eq!(write_access_trace(&trace, accesses).unwrap(), 6);

    let mut sampler = file_sampler(&dir, 4);
    let stats = replay_file(&trace, &mut sampler).expect("replay");
    assert_eq!(stats.events, 6);
    assert_eq!(stats.delivered, 5);
    assert_eq!(stats.skipped, 1);

    let sampler_stats = sampler.finalize().expect("finalize");
    assert_eq!(sampler_stats.samples, 1);
    assert_eq!(sampler_stats.dangling, 1);

    let (header, events) = read_segment(&dir.path().join("out/sample.0")).unwrap();
    assert!(header.flags.contains(SegmentFlags::BURST | SegmentFlags::SAMPLE));
    assert_eq!(header.line_size, 64);
    assert_eq!(header.argv, vec!["usfsampler", "-s", "4"]);
    assert_eq!(
        events,
        vec![
            TraceEvent::BurstStart { begin_time: 0 },
            TraceEvent::Sample {
                begin: Access::read(0x1000, 0).with_pc(0x400100),
                end: Access::new(0x1020, 2, AccessType::ReadWrite).with_tid(3),
                line_size_lg2: 6,
            },
            TraceEvent::Dangling {
                begin: Access::read(0x4000, 4),
                line_size_lg2: 6,
            },
        ]
    );
}

#[test]
fn test_replay_rejects_sample_segment() {
    let dir = TempDir::new().unwrap();
    let not_a_trace = dir.path().join("bursts.0");

    let mut writer = FileTraceWriter::new();
    let mut segment = writer
        .open_segment(&not_a_trace, &SegmentHeader::burst(6))
        .unwrap();
    segment
        .append(&TraceEvent::BurstStart { begin_time: 0 })
        .unwrap();
    segment.close().unwrap();

    let mut sampler = file_sampler(&dir, 4);
    let err = replay_file(&not_a_trace, &mut sampler).unwrap_err();
    assert!(matches!(
        err,
        SamplerError::SegmentIo(TraceError::InvalidHeader(_))
    ));
    assert_eq!(sampler.stats().accesses, 0);
}

#[test]
fn test_replay_missing_input() {
    let dir = TempDir::new().unwrap();
    let mut sampler = file_sampler(&dir, 4);

    let err = replay_file(&dir.path().join("absent"), &mut sampler).unwrap_err();
    assert!(err.is_io());
}
