/*!
 * Property Tests
 * Accounting invariants over arbitrary access streams
 */

use proptest::prelude::*;
use std::collections::HashSet;

use reuse_sampler::{
    Access, AccessType, MemoryTraceWriter, PeriodKind, Sampler, SamplerConfig, TraceEvent,
};

fn period_kind() -> impl Strategy<Value = PeriodKind> {
    prop_oneof![Just(PeriodKind::Constant), Just(PeriodKind::Exponential)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_armed_access_resolves_exactly_once(
        lines in prop::collection::vec(0u64..32, 1..400),
        sample_period in 0u64..8,
        sample_kind in period_kind(),
        burst_size in 0u64..24,
        burst_period in 0u64..16,
        burst_kind in period_kind(),
        seed in any::<u64>(),
    ) {
        let recorder = MemoryTraceWriter::new();
        let config = SamplerConfig::builder()
            .base_path("prop")
            .sample_period(sample_period)
            .sample_kind(sample_kind)
            .burst_size(burst_size)
            .burst_period(burst_period)
            .burst_kind(burst_kind)
            .line_size_lg2(6)
            .seed(seed)
            .build()
            .unwrap();
        let mut sampler = Sampler::with_writer(config, recorder.clone()).unwrap();

        for (t, line) in lines.iter().enumerate() {
            let kind = if t % 3 == 0 { AccessType::Write } else { AccessType::Read };
            let access = Access::new((line << 6) | (t as u64 % 64), t as u64, kind);
            // Reuse is checked before arming, so a line is never armed twice
            prop_assert!(sampler.access(&access).is_ok());
            prop_assert!(sampler.live_watchpoints() <= 32);
        }

        let stats = sampler.finalize().unwrap();
        prop_assert_eq!(stats.accesses, lines.len() as u64);
        prop_assert_eq!(stats.armed, stats.samples + stats.dangling);

        let segments = recorder.segments();
        prop_assert_eq!(segments.len() as u64, stats.bursts);
        prop_assert!(segments.iter().all(|s| s.closed));
        let opened: Vec<_> = segments.iter().map(|s| s.path.clone()).collect();
        prop_assert_eq!(recorder.close_order(), opened);

        let mut resolved = HashSet::new();
        for event in segments.iter().flat_map(|s| s.events.iter()) {
            match event {
                TraceEvent::Sample { begin, end, .. } => {
                    prop_assert!(end.time > begin.time);
                    prop_assert_eq!(begin.line(6), end.line(6));
                    prop_assert!(resolved.insert(begin.time));
                }
                TraceEvent::Dangling { begin, .. } => {
                    prop_assert!(resolved.insert(begin.time));
                }
                _ => {}
            }
        }
        prop_assert_eq!(resolved.len() as u64, stats.armed);
    }
}
