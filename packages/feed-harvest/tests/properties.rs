//! Property tests for totality and bounds.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use feed_harvest::testing::{MockItem, ScriptedFeed};
use feed_harvest::{
    parse_count, CollectConfig, CollectionEngine, FieldSpec, IdentityKey, KeyNormalization,
    PaceConfig, Pacer, RecordSchema, Strategy as FieldStrategy, TimestampResolver,
    TimestampSource,
};
use proptest::prelude::*;

fn pace_config() -> impl Strategy<Value = PaceConfig> {
    (
        0u64..5_000,
        0u64..5_000,
        0u64..5_000,
        0u64..1_000,
        0usize..10,
        0usize..10,
        0.0f64..1.0,
    )
        .prop_map(|(initial, min, max, step, low, high, jitter)| {
            PaceConfig::new(
                Duration::from_millis(initial),
                Duration::from_millis(min),
                Duration::from_millis(max),
            )
            .with_step(Duration::from_millis(step))
            .with_thresholds(low, high)
            .with_jitter(jitter)
        })
}

proptest! {
    #[test]
    fn pacer_stays_within_bounds(
        config in pace_config(),
        yields in proptest::collection::vec(0usize..20, 0..100),
    ) {
        let mut pacer = Pacer::new(&config);
        let (min, max) = pacer.bounds();
        prop_assert!(min <= max);

        for step_yield in yields {
            pacer.observe(step_yield);
            let interval = pacer.current_interval();
            prop_assert!(interval >= min && interval <= max);
            let delay = pacer.next_delay();
            prop_assert!(delay >= min && delay <= max);
        }
    }

    #[test]
    fn resolver_is_total(displayed in ".{0,40}", machine in proptest::option::of(".{0,40}")) {
        let collected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let ts = TimestampResolver::new().resolve(&displayed, machine.as_deref(), collected);

        if matches!(ts.source, TimestampSource::Relative | TimestampSource::CollectionTime) {
            prop_assert_eq!(ts.datetime(), collected.naive_utc());
        }
    }

    #[test]
    fn resolver_falls_back_to_collection_time(displayed in "[a-z]{0,3}[0-9]{0,2}x{0,1}") {
        let collected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        let ts = TimestampResolver::new().resolve(&displayed, None, collected);
        prop_assert_eq!(ts.datetime(), collected.naive_utc());
    }

    #[test]
    fn count_parsing_never_panics(raw in ".{0,24}") {
        let _ = parse_count(&raw);
    }

    #[test]
    fn plain_and_suffixed_counts(n in 0u32..1_000_000) {
        prop_assert_eq!(parse_count(&n.to_string()), i64::from(n));
        prop_assert_eq!(parse_count(&format!("{n}K")), i64::from(n) * 1_000);
        prop_assert_eq!(parse_count(&format!("{n}m")), i64::from(n) * 1_000_000);
    }

    #[test]
    fn output_has_no_duplicates_and_respects_target(
        frames in proptest::collection::vec(
            proptest::collection::vec(0u8..12, 0..6),
            1..8,
        ),
        target in proptest::option::of(0usize..15),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let frames: Vec<Vec<MockItem>> = frames
            .into_iter()
            .map(|ids| {
                ids.into_iter()
                    .map(|id| MockItem::new().with_text(".id", &id.to_string()))
                    .collect()
            })
            .collect();
        let distinct: HashSet<String> = frames
            .iter()
            .flatten()
            .filter_map(|item| feed_harvest::ItemView::text(item, ".id").ok())
            .collect();

        let schema = RecordSchema::new(IdentityKey::new("id", KeyNormalization::Exact))
            .with_field(FieldSpec::text("id").with_strategy(FieldStrategy::text(".id")));
        let feed = ScriptedFeed::new().with_frames(frames).blocking_at_end();
        // High threshold so no refresh rewinds the feed before its end
        let mut engine = CollectionEngine::new(feed, schema)
            .unwrap()
            .with_config(CollectConfig::default().with_stall_threshold(100));

        let report = runtime.block_on(engine.collect(target, None));

        let ids: HashSet<&str> = report.records.iter().filter_map(|r| r.text("id")).collect();
        prop_assert_eq!(ids.len(), report.records.len());
        match target {
            Some(t) => prop_assert_eq!(report.records.len(), t.min(distinct.len())),
            None => prop_assert_eq!(report.records.len(), distinct.len()),
        }
    }
}
