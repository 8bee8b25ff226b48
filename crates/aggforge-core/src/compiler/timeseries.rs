//! Fixed-interval time bucketing

use serde_json::{json, Value};

use crate::fields::{self, Domain};
use crate::models::{Metric, TimeRange};

use super::Aggs;

/// Key of a metric's time-series bucket aggregation
pub fn time_series_key(metric: Metric) -> String {
    format!("{metric}#TIME_SERIES")
}

/// Wrap a metric's aggregations in `interval_ms` wide time buckets
///
/// Buckets are anchored to the start of the time range and, when both bounds
/// are set, cover the whole range even where no document matched.
pub fn wrap_time_series(
    domain: Domain,
    metric: Metric,
    interval_ms: u64,
    time_range: &TimeRange,
    leaf: Aggs,
) -> Aggs {
    let mut histogram = json!({
        "field": fields::timestamp_field(domain),
        "fixed_interval": format!("{interval_ms}ms"),
        "min_doc_count": 0
    });

    if let Some(from) = time_range.from_ms() {
        let interval = i64::try_from(interval_ms).unwrap_or(i64::MAX).max(1);
        histogram["offset"] = json!(format!("{}ms", from.rem_euclid(interval)));
    }

    if let Some((min, max)) = time_range.bounds_ms() {
        histogram["extended_bounds"] = json!({ "min": min, "max": max });
    }

    let mut aggs = Aggs::new();
    aggs.insert(
        time_series_key(metric),
        json!({ "date_histogram": histogram, "aggs": Value::Object(leaf) }),
    );
    aggs
}
