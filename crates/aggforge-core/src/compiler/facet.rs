//! Facet and range nesting
//!
//! Wraps one metric's aggregations in bucket aggregations, one level per
//! facet. Levels are keyed `<METRIC>#<FACET>` and nest outer to inner in
//! facet declaration order.

use serde_json::{json, Value};

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::fields::{self, Domain};
use crate::models::{Facet, FacetGrouping, MetricMeasuresQuery, NumberRange};

use super::measure;
use super::Aggs;

/// HTTP status classes used when grouping by status code group
pub const STATUS_CLASSES: [(&str, NumberRange); 5] = [
    ("1xx", NumberRange::new(100.0, 200.0)),
    ("2xx", NumberRange::new(200.0, 300.0)),
    ("3xx", NumberRange::new(300.0, 400.0)),
    ("4xx", NumberRange::new(400.0, 500.0)),
    ("5xx", NumberRange::new(500.0, 600.0)),
];

/// Nest a metric's aggregations inside the buckets of `grouping`
pub fn nest_facets(
    domain: Domain,
    query: &MetricMeasuresQuery,
    grouping: &FacetGrouping,
    leaf: Aggs,
    config: &CompilerConfig,
) -> Result<Aggs> {
    match grouping {
        FacetGrouping::Nested(facets) => {
            let mut aggs = leaf;
            for &facet in facets.iter().rev() {
                let (kind, body) = bucket(domain, facet, config)?;
                aggs = level(query, facet, kind, body, aggs);
            }
            Ok(aggs)
        }
        FacetGrouping::Top { facet, limit } => {
            let body = top_terms(domain, query, *facet, *limit)?;
            Ok(level(query, *facet, "terms", body, leaf))
        }
        FacetGrouping::Ranges { facet, ranges } => {
            let body = explicit_ranges(domain, *facet, ranges)?;
            Ok(level(query, *facet, "range", body, leaf))
        }
    }
}

fn level(query: &MetricMeasuresQuery, facet: Facet, kind: &str, body: Value, inner: Aggs) -> Aggs {
    let mut aggs = Aggs::new();
    aggs.insert(
        format!("{}#{facet}", query.metric),
        json!({ kind: body, "aggs": inner }),
    );
    aggs
}

fn bucket(domain: Domain, facet: Facet, config: &CompilerConfig) -> Result<(&'static str, Value)> {
    let field = fields::resolve_facet(domain, facet)?;

    if facet == Facet::HttpStatusCodeGroup {
        let ranges: Vec<Value> = STATUS_CLASSES
            .iter()
            .map(|(key, range)| range_bucket(key, range))
            .collect();
        return Ok(("range", json!({ "field": field, "ranges": ranges })));
    }

    let mut terms = json!({ "field": field });
    if let Some(size) = config.default_facet_size {
        terms["size"] = json!(size);
    }

    Ok(("terms", terms))
}

fn top_terms(domain: Domain, query: &MetricMeasuresQuery, facet: Facet, limit: u32) -> Result<Value> {
    if facet == Facet::HttpStatusCodeGroup {
        return Err(Error::invalid_shape(format!("{facet} buckets cannot be limited")));
    }

    let field = fields::resolve_facet(domain, facet)?;
    let sort = query.sort.ok_or_else(|| {
        Error::invalid_shape(format!("limit on {facet} needs a sort on {}", query.metric))
    })?;
    let path = measure::sort_path(domain, query.metric, sort.measure)?;

    Ok(json!({
        "field": field,
        "size": limit,
        "order": { path: sort.order.as_str() }
    }))
}

fn explicit_ranges(domain: Domain, facet: Facet, ranges: &[NumberRange]) -> Result<Value> {
    if !facet.is_status() {
        return Err(Error::invalid_shape(format!(
            "ranges only apply to status facets, not {facet}"
        )));
    }
    if ranges.is_empty() {
        return Err(Error::invalid_shape(format!("no ranges given for {facet}")));
    }

    let field = fields::resolve_facet(domain, facet)?;
    let ranges: Vec<Value> = ranges.iter().map(|r| range_bucket(&r.key(), r)).collect();

    Ok(json!({ "field": field, "ranges": ranges }))
}

fn range_bucket(key: &str, range: &NumberRange) -> Value {
    json!({ "key": key, "from": range.from, "to": range.to })
}
