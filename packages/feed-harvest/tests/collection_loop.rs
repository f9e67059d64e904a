//! Collection loop behavior against scripted feeds.

use std::collections::HashSet;
use std::time::Duration;

use feed_harvest::testing::{MockItem, ScriptedFeed};
use feed_harvest::{
    CollectConfig, CollectionEngine, CombineOp, FieldSpec, FieldValue, IdentityKey,
    KeyNormalization, PaceConfig, Probe, RecordSchema, StopReason, Strategy,
};
use tokio_util::sync::CancellationToken;

fn post(id: &str) -> MockItem {
    MockItem::new()
        .with_text(".id", id)
        .with_text(".likes", "1.2K")
}

fn posts(ids: &[&str]) -> Vec<MockItem> {
    ids.iter().map(|id| post(id)).collect()
}

fn schema() -> RecordSchema {
    RecordSchema::new(IdentityKey::new("id", KeyNormalization::Text))
        .with_field(
            FieldSpec::text("id")
                .with_strategy(Strategy::text(".id"))
                .required(),
        )
        .with_field(FieldSpec::count("likes").with_strategy(Strategy::text(".likes")))
}

fn identities(records: &[feed_harvest::Record]) -> HashSet<String> {
    records
        .iter()
        .filter_map(|r| r.text("id").map(str::to_string))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_frames_produce_no_duplicates() {
    // Infinite scroll keeps earlier items rendered
    let feed = ScriptedFeed::new()
        .with_frame(posts(&["a", "b"]))
        .with_frame(posts(&["a", "b", "c", "d"]))
        .with_frame(posts(&["c", "d", "e"]))
        .blocking_at_end();
    let mut engine = CollectionEngine::new(feed, schema()).unwrap();

    let report = engine.collect(None, None).await;

    assert_eq!(report.stop, StopReason::EndOfFeed);
    assert_eq!(report.accepted(), 5);
    assert_eq!(identities(&report.records).len(), report.records.len());
    assert_eq!(report.state.dedup().len(), report.state.accepted());
    assert_eq!(report.records[0].count("likes"), Some(1200));
}

#[tokio::test(start_paused = true)]
async fn test_target_is_respected_exactly() {
    let frames = (0..4)
        .map(|page| {
            (0..3)
                .map(|i| post(&format!("p{page}-{i}")))
                .collect::<Vec<_>>()
        })
        .collect();
    let feed = ScriptedFeed::new().with_frames(frames);
    let mut engine = CollectionEngine::new(feed, schema()).unwrap();

    let report = engine.collect(Some(5), None).await;

    assert_eq!(report.stop, StopReason::TargetReached);
    assert_eq!(report.accepted(), 5);
    let ids: Vec<&str> = report.records.iter().filter_map(|r| r.text("id")).collect();
    assert_eq!(ids, vec!["p0-0", "p0-1", "p0-2", "p1-0", "p1-1"]);
}

#[tokio::test(start_paused = true)]
async fn test_stall_refresh_exhausted_within_twice_threshold() {
    let feed = ScriptedFeed::new().with_frame(posts(&["a", "b", "c"]));
    let handle = feed.clone();
    let config = CollectConfig::default().with_stall_threshold(3);
    let mut engine = CollectionEngine::new(feed, schema())
        .unwrap()
        .with_config(config);

    let report = engine.collect(None, None).await;

    assert_eq!(report.stop, StopReason::Exhausted);
    assert_eq!(report.accepted(), 3);
    assert_eq!(report.refreshes, 1);
    assert!(report.steps <= 6, "took {} steps", report.steps);
    assert_eq!(handle.reset_call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_step_budget_bounds_navigation() {
    let frames = (0..50).map(|i| posts(&[&i.to_string()])).collect();
    let feed = ScriptedFeed::new().with_frames(frames);
    let handle = feed.clone();
    let mut engine = CollectionEngine::new(feed, schema())
        .unwrap()
        .with_config(CollectConfig::default().with_max_steps(7));

    let report = engine.collect(None, None).await;

    assert_eq!(report.stop, StopReason::StepBudget);
    assert_eq!(report.steps, 7);
    assert_eq!(handle.navigate_call_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_source_loss_keeps_records() {
    let frames = (0..10).map(|i| posts(&[&format!("id-{i}")])).collect();
    let feed = ScriptedFeed::new()
        .with_frames(frames)
        .failing_on_navigate(3);
    let mut engine = CollectionEngine::new(feed, schema()).unwrap();

    let report = engine.collect(None, None).await;

    assert!(matches!(report.stop, StopReason::SourceUnavailable { .. }));
    assert!(!report.stop.is_normal());
    assert_eq!(report.accepted(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_returns_initial_view() {
    let feed = ScriptedFeed::new()
        .with_frame(posts(&["a"]))
        .with_frame(posts(&["b"]));
    let handle = feed.clone();
    let token = CancellationToken::new();
    token.cancel();
    let mut engine = CollectionEngine::new(feed, schema())
        .unwrap()
        .with_cancellation(token);

    let report = engine.collect(None, None).await;

    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(report.accepted(), 1);
    assert_eq!(handle.navigate_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_interrupts_pacing_delay() {
    let frames = (0..1_000).map(|i| posts(&[&i.to_string()])).collect();
    let feed = ScriptedFeed::new().with_frames(frames);
    let pace = PaceConfig::new(
        Duration::from_secs(1),
        Duration::from_secs(1),
        Duration::from_secs(1),
    );
    let mut engine = CollectionEngine::new(feed, schema())
        .unwrap()
        .with_config(CollectConfig::default().with_pace(pace).with_max_steps(1_000));
    let token = engine.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        token.cancel();
    });

    let report = engine.collect(None, None).await;

    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(report.steps, 3);
    assert_eq!(report.accepted(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_items_without_required_fields_are_skipped() {
    let feed = ScriptedFeed::new()
        .with_frame(vec![
            post("a"),
            MockItem::new().with_text(".likes", "3"),
            post("b"),
        ])
        .blocking_at_end();
    let mut engine = CollectionEngine::new(feed, schema()).unwrap();

    let report = engine.collect(None, None).await;

    assert_eq!(report.accepted(), 2);
    // The broken item is seen again on the blocked step's re-harvest
    assert_eq!(report.skipped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_price_degrades_to_encoded_attribute() {
    let schema = RecordSchema::new(IdentityKey::new("asin", KeyNormalization::Exact))
        .with_field(FieldSpec::text("asin").with_strategy(Strategy::attr("", "data-asin")))
        .with_field(
            FieldSpec::score("price")
                .with_strategy(Strategy::Combine {
                    first: Probe::text(".a-price-whole"),
                    second: Probe::text(".a-price-fraction"),
                    op: CombineOp::Decimal,
                })
                .with_strategy(Strategy::Scale {
                    probe: Probe::attr(".a-price", "data-a-price"),
                    divisor: 100.0,
                }),
        );

    let full = MockItem::new()
        .with_attr("", "data-asin", "B001")
        .with_text(".a-price-whole", "19.")
        .with_text(".a-price-fraction", "99");
    let encoded_only = MockItem::new()
        .with_attr("", "data-asin", "B002")
        .with_attr(".a-price", "data-a-price", "4550");
    let no_price = MockItem::new().with_attr("", "data-asin", "B003");

    let feed = ScriptedFeed::new()
        .with_frame(vec![full, encoded_only, no_price])
        .blocking_at_end();
    let mut engine = CollectionEngine::new(feed, schema).unwrap();

    let report = engine.collect(None, None).await;
    let prices: Vec<&FieldValue> = report
        .records
        .iter()
        .filter_map(|r| r.get("price"))
        .collect();

    assert_eq!(
        prices,
        vec![
            &FieldValue::Score(19.99),
            &FieldValue::Score(45.5),
            &FieldValue::Absent
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resumed_run_shares_dedup() {
    let first = ScriptedFeed::new()
        .with_frame(posts(&["a", "b", "c"]))
        .blocking_at_end();
    let mut engine = CollectionEngine::new(first, schema()).unwrap();
    let report = engine.collect(None, None).await;
    assert_eq!(report.accepted(), 3);

    let second = ScriptedFeed::new()
        .with_frame(posts(&["c", "d"]))
        .with_frame(posts(&["a", "e"]))
        .blocking_at_end();
    let mut engine = CollectionEngine::new(second, schema()).unwrap();
    let report = engine.resume(report.into_state(), None, None).await;

    let ids: Vec<&str> = report.records.iter().filter_map(|r| r.text("id")).collect();
    assert_eq!(ids, vec!["d", "e"]);
    assert_eq!(report.state.accepted(), 5);
    assert_eq!(identities(report.state.records()).len(), 5);
}
