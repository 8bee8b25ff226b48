//! Measure aggregation builder
//!
//! Each `(metric, measure)` pair compiles to one of two shapes:
//!
//! - a single metric aggregation keyed `<METRIC>#<MEASURE>`
//! - a derived pair for RPS and PERCENTAGE: an outer one-bucket
//!   `date_histogram` keyed `_<METRIC>#<MEASURE>` holding a `bucket_script`
//!   keyed `<METRIC>#<MEASURE>`
//!
//! The shape is picked by [`strategy`], an exhaustive match on the domain and
//! measure that also looks at how the metric is stored.

use serde_json::{json, Value};

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::fields::{self, Domain, MetricSource};
use crate::models::{Measure, Metric, MetricMeasuresQuery, TimeRange};

use super::Aggs;

/// The window a derived rate or ratio is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    span_ms: i64,
    offset_ms: i64,
    bounds: Option<(i64, i64)>,
}

impl RateWindow {
    /// One window spanning the whole time range; needs both bounds
    ///
    /// Both bounds are inclusive, so the window is one millisecond longer
    /// than `to - from`.
    pub fn over(time_range: &TimeRange) -> Option<Self> {
        let (from, to) = time_range.bounds_ms()?;
        let span_ms = (to - from + 1).max(1);

        Some(Self {
            span_ms,
            offset_ms: from.rem_euclid(span_ms),
            bounds: Some((from, to)),
        })
    }

    /// One window per time-series bucket
    pub fn per_interval(interval_ms: u64, time_range: &TimeRange) -> Self {
        let span_ms = i64::try_from(interval_ms).unwrap_or(i64::MAX).max(1);

        Self {
            span_ms,
            offset_ms: time_range.from_ms().map_or(0, |from| from.rem_euclid(span_ms)),
            bounds: None,
        }
    }

    fn seconds(&self) -> f64 {
        self.span_ms as f64 / 1000.0
    }

    fn histogram(&self) -> Value {
        let mut histogram = json!({
            "field": fields::TIMESTAMP_FIELD,
            "fixed_interval": format!("{}ms", self.span_ms),
            "offset": format!("{}ms", self.offset_ms),
            "min_doc_count": 0
        });

        if let Some((min, max)) = self.bounds {
            histogram["hard_bounds"] = json!({ "min": min, "max": max });
        }

        histogram
    }
}

/// Key of a measure's value aggregation
pub fn measure_key(metric: Metric, measure: Measure) -> String {
    format!("{metric}#{measure}")
}

/// Key of the bucket wrapping a derived measure
pub fn derived_key(metric: Metric, measure: Measure) -> String {
    format!("_{metric}#{measure}")
}

/// How a rate counts events
#[derive(Debug, Clone, Copy, PartialEq)]
enum Events {
    /// One event per document
    Documents,
    /// Events summed from a per-document increment
    Increments,
}

/// Aggregation shape for one `(metric, measure)` pair
#[derive(Debug, Clone, Copy, PartialEq)]
enum Strategy {
    /// Single-value metric aggregation on a field
    Field {
        op: &'static str,
        field: &'static str,
    },
    /// `percentiles` with one requested percent
    Percentile { field: &'static str, percent: f64 },
    /// `filter` on error statuses, its doc count is the value
    StatusErrors,
    /// `sum`/`avg` over a script adding two fields
    Combined {
        op: &'static str,
        fields: [&'static str; 2],
    },
    /// Events per second over the window, errors only when `errors` is set
    Rate { events: Events, errors: bool },
    /// Errors over total events in the window
    ErrorRatio(Events),
}

fn strategy(domain: Domain, metric: Metric, measure: Measure) -> Result<Strategy> {
    let source = fields::metric_source(domain, metric)?;
    let field = || fields::resolve_metric(domain, metric);

    let strategy = match (domain, measure) {
        (_, Measure::Min) => Strategy::Field {
            op: "min",
            field: field()?,
        },
        (_, Measure::Max) => Strategy::Field {
            op: "max",
            field: field()?,
        },
        (_, Measure::Avg) => match source {
            MetricSource::Combined(sent, received) => Strategy::Combined {
                op: "avg",
                fields: [sent, received],
            },
            _ => Strategy::Field {
                op: "avg",
                field: field()?,
            },
        },
        (_, Measure::P50) => percentile(field()?, 50.0),
        (_, Measure::P90) => percentile(field()?, 90.0),
        (_, Measure::P95) => percentile(field()?, 95.0),
        (_, Measure::P99) => percentile(field()?, 99.0),
        (Domain::Http, Measure::Count) => match source {
            MetricSource::Hits | MetricSource::Value(_) => Strategy::Field {
                op: "value_count",
                field: fields::TIMESTAMP_FIELD,
            },
            MetricSource::Errors => Strategy::StatusErrors,
            MetricSource::Accumulated(field) => Strategy::Field { op: "sum", field },
            MetricSource::Combined(sent, received) => Strategy::Combined {
                op: "sum",
                fields: [sent, received],
            },
        },
        (Domain::Message, Measure::Count) => match source {
            MetricSource::Errors => Strategy::Field {
                op: "sum",
                field: fields::MESSAGE_ERROR_COUNT_INCREMENT_FIELD,
            },
            _ => Strategy::Field {
                op: "sum",
                field: fields::MESSAGE_COUNT_INCREMENT_FIELD,
            },
        },
        (Domain::Http, Measure::Rps) => Strategy::Rate {
            events: Events::Documents,
            errors: source == MetricSource::Errors,
        },
        (Domain::Message, Measure::Rps) => Strategy::Rate {
            events: Events::Increments,
            errors: source == MetricSource::Errors,
        },
        (Domain::Http, Measure::Percentage) => Strategy::ErrorRatio(Events::Documents),
        (Domain::Message, Measure::Percentage) => Strategy::ErrorRatio(Events::Increments),
    };

    Ok(strategy)
}

fn percentile(field: &'static str, percent: f64) -> Strategy {
    Strategy::Percentile { field, percent }
}

/// Build every measure aggregation of one metric
///
/// `window` is required as soon as a derived measure (RPS, PERCENTAGE) is
/// requested.
pub fn build_metric_aggs(
    domain: Domain,
    query: &MetricMeasuresQuery,
    window: Option<RateWindow>,
    config: &CompilerConfig,
) -> Result<Aggs> {
    let mut aggs = Aggs::new();

    for &measure in &query.measures {
        let metric = query.metric;
        let key = measure_key(metric, measure);

        match strategy(domain, metric, measure)? {
            Strategy::Field { op, field } => {
                aggs.insert(key, json!({ op: { "field": field } }));
            }
            Strategy::Percentile { field, percent } => {
                aggs.insert(
                    key,
                    json!({ "percentiles": { "field": field, "percents": [percent] } }),
                );
            }
            Strategy::StatusErrors => {
                aggs.insert(key, status_errors(config));
            }
            Strategy::Combined { op, fields } => {
                aggs.insert(key, json!({ op: { "script": { "source": sum_script(fields) } } }));
            }
            Strategy::Rate { events, errors } => {
                let window = require_window(window, metric, measure)?;
                aggs.insert(
                    derived_key(metric, measure),
                    rate(window, events, errors, key, config),
                );
            }
            Strategy::ErrorRatio(events) => {
                let window = require_window(window, metric, measure)?;
                aggs.insert(
                    derived_key(metric, measure),
                    error_ratio(window, events, key, config),
                );
            }
        }
    }

    Ok(aggs)
}

/// Path a bucket aggregation orders by to sort on a measure
pub fn sort_path(domain: Domain, metric: Metric, measure: Measure) -> Result<String> {
    let key = measure_key(metric, measure);

    match strategy(domain, metric, measure)? {
        Strategy::Field { .. } | Strategy::Combined { .. } => Ok(key),
        Strategy::Percentile { percent, .. } => Ok(format!("{key}[{percent:?}]")),
        Strategy::StatusErrors => Ok(format!("{key}>_count")),
        Strategy::Rate { .. } | Strategy::ErrorRatio(_) => Err(Error::invalid_shape(format!(
            "buckets cannot be sorted by the derived measure {key}"
        ))),
    }
}

fn require_window(window: Option<RateWindow>, metric: Metric, measure: Measure) -> Result<RateWindow> {
    window.ok_or_else(|| {
        Error::invalid_shape(format!(
            "{metric}#{measure} needs a time range with both bounds"
        ))
    })
}

fn status_errors(config: &CompilerConfig) -> Value {
    let field = fields::STATUS_FIELD;
    json!({ "filter": { "range": { field: { "gte": config.error_status_from } } } })
}

fn sum_script([a, b]: [&str; 2]) -> String {
    format!(
        "(doc['{a}'].size() == 0 ? 0 : doc['{a}'].value) + (doc['{b}'].size() == 0 ? 0 : doc['{b}'].value)"
    )
}

fn rate(
    window: RateWindow,
    events: Events,
    errors: bool,
    key: String,
    config: &CompilerConfig,
) -> Value {
    let mut inner = Aggs::new();

    let count_path = match (events, errors) {
        (Events::Documents, false) => "_count",
        (Events::Documents, true) => {
            inner.insert("errors".to_string(), status_errors(config));
            "errors>_count"
        }
        (Events::Increments, false) => {
            inner.insert(
                "count".to_string(),
                json!({ "sum": { "field": fields::MESSAGE_COUNT_INCREMENT_FIELD } }),
            );
            "count"
        }
        (Events::Increments, true) => {
            inner.insert(
                "errors".to_string(),
                json!({ "sum": { "field": fields::MESSAGE_ERROR_COUNT_INCREMENT_FIELD } }),
            );
            "errors"
        }
    };

    inner.insert(
        key,
        json!({
            "bucket_script": {
                "buckets_path": { "count": count_path },
                "script": format!("params.count / {:?}", window.seconds())
            }
        }),
    );

    json!({ "date_histogram": window.histogram(), "aggs": inner })
}

fn error_ratio(window: RateWindow, events: Events, key: String, config: &CompilerConfig) -> Value {
    let mut inner = Aggs::new();

    let (errors_path, total_path) = match events {
        Events::Documents => {
            inner.insert("errors".to_string(), status_errors(config));
            ("errors>_count", "_count")
        }
        Events::Increments => {
            inner.insert(
                "errors".to_string(),
                json!({ "sum": { "field": fields::MESSAGE_ERROR_COUNT_INCREMENT_FIELD } }),
            );
            inner.insert(
                "total".to_string(),
                json!({ "sum": { "field": fields::MESSAGE_COUNT_INCREMENT_FIELD } }),
            );
            ("errors", "total")
        }
    };

    inner.insert(
        key,
        json!({
            "bucket_script": {
                "buckets_path": { "errors": errors_path, "total": total_path },
                "script": "params.total == 0 ? 0 : params.errors / params.total"
            }
        }),
    );

    json!({ "date_histogram": window.histogram(), "aggs": inner })
}
