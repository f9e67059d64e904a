//! Multi-strategy field extraction with graceful degradation.

use chrono::{DateTime, Utc};
use tracing::{trace, warn};
use url::Url;

use crate::error::ExtractError;
use crate::extract::field::{FieldKind, FieldSpec};
use crate::extract::numeric::{try_parse_count, try_parse_score};
use crate::extract::timestamp::TimestampResolver;
use crate::traits::item::ItemView;
use crate::types::record::FieldValue;

/// Result of extracting one field.
///
/// There is no error variant: every failure inside a strategy is a
/// fallthrough, and running out of strategies is `Absent`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Found(FieldValue),
    Absent,
}

impl ExtractionOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The found value, or `fallback` when absent.
    pub fn unwrap_or(self, fallback: FieldValue) -> FieldValue {
        match self {
            Self::Found(value) => value,
            Self::Absent => fallback,
        }
    }
}

/// Pulls typed fields out of items.
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    base_url: Option<Url>,
    resolver: TimestampResolver,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join relative URL values against this base.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_resolver(mut self, resolver: TimestampResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Try each strategy in order; keep the first value with the kind's shape.
    pub fn extract<I: ItemView + ?Sized>(
        &self,
        item: &I,
        field: &FieldSpec,
        collected_at: DateTime<Utc>,
    ) -> ExtractionOutcome {
        if field.kind == FieldKind::Timestamp {
            return self.extract_timestamp(item, field, collected_at);
        }

        for (position, strategy) in field.strategies.iter().enumerate() {
            match strategy.apply(item) {
                Ok(raw) => {
                    let raw = field.transform(&raw);
                    if let Some(value) = self.coerce(field.kind, &raw, collected_at) {
                        return ExtractionOutcome::Found(value);
                    }
                    trace!(
                        field = %field.name,
                        strategy = strategy.label(),
                        position,
                        raw = %raw,
                        "Value has the wrong shape, trying next strategy"
                    );
                }
                Err(err) => self.note_failure(field, strategy.label(), position, &err),
            }
        }

        ExtractionOutcome::Absent
    }

    /// Coerce a raw string into the kind's shape.
    ///
    /// Used for strategy output and for declared defaults.
    pub fn coerce(
        &self,
        kind: FieldKind,
        raw: &str,
        collected_at: DateTime<Utc>,
    ) -> Option<FieldValue> {
        let raw = raw.trim();
        match kind {
            FieldKind::Text => (!raw.is_empty()).then(|| FieldValue::Text(raw.to_string())),
            FieldKind::Count => try_parse_count(raw).map(FieldValue::Count),
            FieldKind::Score => try_parse_score(raw).map(FieldValue::Score),
            FieldKind::Url => self.absolute_url(raw).map(FieldValue::Url),
            FieldKind::Timestamp => (!raw.is_empty())
                .then(|| FieldValue::Timestamp(self.resolver.resolve(raw, None, collected_at))),
        }
    }

    fn extract_timestamp<I: ItemView + ?Sized>(
        &self,
        item: &I,
        field: &FieldSpec,
        collected_at: DateTime<Utc>,
    ) -> ExtractionOutcome {
        let displayed = field
            .strategies
            .iter()
            .enumerate()
            .find_map(|(position, strategy)| match strategy.apply(item) {
                Ok(raw) => Some(field.transform(&raw)).filter(|s| !s.trim().is_empty()),
                Err(err) => {
                    self.note_failure(field, strategy.label(), position, &err);
                    None
                }
            });

        let machine = field
            .machine
            .as_ref()
            .and_then(|probe| probe.read(item).ok())
            .filter(|s| !s.trim().is_empty());

        if displayed.is_none() && machine.is_none() {
            return ExtractionOutcome::Absent;
        }

        let resolved = self.resolver.resolve(
            displayed.as_deref().unwrap_or_default(),
            machine.as_deref(),
            collected_at,
        );
        ExtractionOutcome::Found(FieldValue::Timestamp(resolved))
    }

    fn absolute_url(&self, raw: &str) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        match Url::parse(raw) {
            Ok(url) if url.has_host() => Some(url.to_string()),
            Ok(_) => None,
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .as_ref()
                .and_then(|base| base.join(raw).ok())
                .map(|url| url.to_string()),
            Err(_) => None,
        }
    }

    fn note_failure(&self, field: &FieldSpec, strategy: &str, position: usize, err: &ExtractError) {
        if let ExtractError::InvalidSelector { selector } = err {
            warn!(field = %field.name, strategy, position, selector = %selector, "Invalid selector in field strategy");
        } else {
            trace!(field = %field.name, strategy, position, error = %err, "Strategy fell through");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::field::{CombineOp, Probe, Strategy, Transform};
    use crate::testing::MockItem;
    use crate::types::record::TimestampSource;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn price_field() -> FieldSpec {
        FieldSpec::score("price")
            .with_strategy(Strategy::Combine {
                first: Probe::text(".a-price-whole"),
                second: Probe::text(".a-price-fraction"),
                op: CombineOp::Decimal,
            })
            .with_strategy(Strategy::Scale {
                probe: Probe::attr(".a-price", "data-a-price"),
                divisor: 100.0,
            })
    }

    #[test]
    fn test_primary_strategy_wins() {
        let item = MockItem::new()
            .with_text(".a-price-whole", "24.")
            .with_text(".a-price-fraction", "99")
            .with_attr(".a-price", "data-a-price", "1000");

        let outcome = FieldExtractor::new().extract(&item, &price_field(), now());
        assert_eq!(outcome, ExtractionOutcome::Found(FieldValue::Score(24.99)));
    }

    #[test]
    fn test_degrades_to_secondary_strategy() {
        let item = MockItem::new().with_attr(".a-price", "data-a-price", "2499");

        let outcome = FieldExtractor::new().extract(&item, &price_field(), now());
        assert_eq!(outcome, ExtractionOutcome::Found(FieldValue::Score(24.99)));
    }

    #[test]
    fn test_all_strategies_exhausted() {
        let outcome = FieldExtractor::new().extract(&MockItem::new(), &price_field(), now());
        assert_eq!(outcome, ExtractionOutcome::Absent);
    }

    #[test]
    fn test_wrong_shape_falls_through() {
        let item = MockItem::new()
            .with_text(".likes", "Like")
            .with_attr(".likes", "aria-label", "1.2K");
        let field = FieldSpec::count("likes")
            .with_strategy(Strategy::text(".likes"))
            .with_strategy(Strategy::attr(".likes", "aria-label"));

        let outcome = FieldExtractor::new().extract(&item, &field, now());
        assert_eq!(outcome, ExtractionOutcome::Found(FieldValue::Count(1200)));
    }

    #[test]
    fn test_invalid_selector_is_absorbed() {
        let item = MockItem::new().with_text("h3", "Title");
        let field = FieldSpec::text("title")
            .with_strategy(Strategy::pattern("h3", "(", 1))
            .with_strategy(Strategy::text("h3"));

        let outcome = FieldExtractor::new().extract(&item, &field, now());
        assert_eq!(outcome, ExtractionOutcome::Found(FieldValue::Text("Title".to_string())));
    }

    #[test]
    fn test_relative_urls_join_base() {
        let item = MockItem::new().with_attr("a", "href", "/watch?v=abc");
        let field = FieldSpec::url("link").with_strategy(Strategy::attr("a", "href"));

        let without_base = FieldExtractor::new().extract(&item, &field, now());
        assert_eq!(without_base, ExtractionOutcome::Absent);

        let extractor =
            FieldExtractor::new().with_base_url(Url::parse("https://www.youtube.com").unwrap());
        assert_eq!(
            extractor.extract(&item, &field, now()),
            ExtractionOutcome::Found(FieldValue::Url(
                "https://www.youtube.com/watch?v=abc".to_string()
            ))
        );
    }

    #[test]
    fn test_transforms_run_before_shape_check() {
        let item = MockItem::new().with_text(".user", "\n  Ada Lovelace\n@ada ");
        let field = FieldSpec::text("username")
            .with_strategy(Strategy::text(".user"))
            .with_transform(Transform::FirstLine);

        let outcome = FieldExtractor::new().extract(&item, &field, now());
        assert_eq!(
            outcome,
            ExtractionOutcome::Found(FieldValue::Text("Ada Lovelace".to_string()))
        );
    }

    #[test]
    fn test_timestamp_uses_machine_attribute() {
        let item = MockItem::new()
            .with_text("time", "Oct 15")
            .with_attr("time", "datetime", "2018-10-15T21:54:07.000Z");
        let field = FieldSpec::timestamp("posted")
            .with_strategy(Strategy::text("time"))
            .with_machine(Probe::attr("time", "datetime"));

        let outcome = FieldExtractor::new().extract(&item, &field, now());
        let ExtractionOutcome::Found(FieldValue::Timestamp(ts)) = outcome else {
            panic!("expected a timestamp, got {outcome:?}");
        };
        assert_eq!(ts.source, TimestampSource::Machine);
        assert_eq!(ts.to_string(), "2018-10-15 21:54:07");
    }

    #[test]
    fn test_timestamp_absent_when_nothing_rendered() {
        let field = FieldSpec::timestamp("posted")
            .with_strategy(Strategy::text("time"))
            .with_machine(Probe::attr("time", "datetime"));

        let outcome = FieldExtractor::new().extract(&MockItem::new(), &field, now());
        assert_eq!(outcome, ExtractionOutcome::Absent);
    }
}
