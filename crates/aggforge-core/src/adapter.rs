//! Query adapters
//!
//! Each adapter turns one kind of analytics request into a complete
//! [`QueryDocument`]. Requests are validated before anything is compiled, and
//! any failure aborts the whole document.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::compiler::{
    build_metric_aggs, compile_filters, nest_facets, wrap_time_series, Aggs, RateWindow,
};
use crate::config::CompilerConfig;
use crate::document::QueryDocument;
use crate::error::{Error, Result};
use crate::fields::Domain;
use crate::models::{FacetGrouping, FacetsQuery, MeasuresQuery, TimeSeriesQuery};

/// Compiles one kind of request into a query document
pub trait QueryAdapter {
    /// Request type handled by the adapter
    type Query;

    /// Compile `query`
    fn adapt(&self, query: &Self::Query) -> Result<QueryDocument>;
}

/// Flat measures over the whole time range
#[derive(Debug, Clone, Default)]
pub struct MeasuresQueryAdapter {
    domain: Domain,
    config: CompilerConfig,
}

impl MeasuresQueryAdapter {
    /// Create an adapter for `domain`
    pub fn new(domain: Domain, config: CompilerConfig) -> Self {
        Self { domain, config }
    }
}

impl QueryAdapter for MeasuresQueryAdapter {
    type Query = MeasuresQuery;

    fn adapt(&self, query: &MeasuresQuery) -> Result<QueryDocument> {
        compile_measures(self.domain, query, None, &self.config)
            .map_err(|err| rejected("measures", self.domain, err))
    }
}

/// Measures grouped by facets
#[derive(Debug, Clone, Default)]
pub struct FacetsQueryAdapter {
    domain: Domain,
    config: CompilerConfig,
}

impl FacetsQueryAdapter {
    /// Create an adapter for `domain`
    pub fn new(domain: Domain, config: CompilerConfig) -> Self {
        Self { domain, config }
    }

    fn compile(&self, query: &FacetsQuery) -> Result<QueryDocument> {
        query.validate()?;

        let filters = compile_filters(self.domain, &query.time_range, &query.filters, None)?;
        let window = RateWindow::over(&query.time_range);

        let mut aggs = Aggs::new();
        for metric in &query.metrics {
            let leaf = build_metric_aggs(self.domain, metric, window, &self.config)?;
            aggs.extend(nest_facets(
                self.domain,
                metric,
                &query.grouping,
                leaf,
                &self.config,
            )?);
        }

        debug!(
            domain = %self.domain,
            metrics = query.metrics.len(),
            facets = query.grouping.facets().len(),
            "Compiled facets query"
        );

        Ok(QueryDocument::new(filters, aggs))
    }
}

impl QueryAdapter for FacetsQueryAdapter {
    type Query = FacetsQuery;

    fn adapt(&self, query: &FacetsQuery) -> Result<QueryDocument> {
        self.compile(query)
            .map_err(|err| rejected("facets", self.domain, err))
    }
}

/// Measures bucketed over time
///
/// When facets are requested they bucket outside the time series: each facet
/// leaf holds its own `<METRIC>#TIME_SERIES` histogram.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesQueryAdapter {
    domain: Domain,
    config: CompilerConfig,
}

impl TimeSeriesQueryAdapter {
    /// Create an adapter for `domain`
    pub fn new(domain: Domain, config: CompilerConfig) -> Self {
        Self { domain, config }
    }

    fn compile(&self, query: &TimeSeriesQuery) -> Result<QueryDocument> {
        query.validate()?;

        let filters = compile_filters(self.domain, &query.time_range, &query.filters, None)?;
        let window = RateWindow::per_interval(query.interval, &query.time_range);
        let grouping = FacetGrouping::Nested(query.facets.clone());

        let mut aggs = Aggs::new();
        for metric in &query.metrics {
            let leaf = build_metric_aggs(self.domain, metric, Some(window), &self.config)?;
            let series = wrap_time_series(
                self.domain,
                metric.metric,
                query.interval,
                &query.time_range,
                leaf,
            );

            if query.facets.is_empty() {
                aggs.extend(series);
            } else {
                aggs.extend(nest_facets(
                    self.domain,
                    metric,
                    &grouping,
                    series,
                    &self.config,
                )?);
            }
        }

        debug!(
            domain = %self.domain,
            metrics = query.metrics.len(),
            interval_ms = query.interval,
            facets = query.facets.len(),
            "Compiled time-series query"
        );

        Ok(QueryDocument::new(filters, aggs))
    }
}

impl QueryAdapter for TimeSeriesQueryAdapter {
    type Query = TimeSeriesQuery;

    fn adapt(&self, query: &TimeSeriesQuery) -> Result<QueryDocument> {
        self.compile(query)
            .map_err(|err| rejected("time-series", self.domain, err))
    }
}

/// Message measures, optionally restricted to a set of request ids
#[derive(Debug, Clone, Default)]
pub struct MessageMeasuresQueryAdapter {
    config: CompilerConfig,
}

impl MessageMeasuresQueryAdapter {
    /// Create a message measures adapter
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile `query`; an absent or empty id set adds no request-id clause
    pub fn adapt(
        &self,
        query: &MeasuresQuery,
        request_ids: Option<&BTreeSet<String>>,
    ) -> Result<QueryDocument> {
        compile_measures(Domain::Message, query, request_ids, &self.config)
            .map_err(|err| rejected("message measures", Domain::Message, err))
    }
}

fn compile_measures(
    domain: Domain,
    query: &MeasuresQuery,
    request_ids: Option<&BTreeSet<String>>,
    config: &CompilerConfig,
) -> Result<QueryDocument> {
    query.validate()?;

    let filters = compile_filters(domain, &query.time_range, &query.filters, request_ids)?;
    let window = RateWindow::over(&query.time_range);

    let mut aggs = Aggs::new();
    for metric in &query.metrics {
        aggs.extend(build_metric_aggs(domain, metric, window, config)?);
    }

    debug!(
        %domain,
        metrics = query.metrics.len(),
        filters = filters.len(),
        "Compiled measures query"
    );

    Ok(QueryDocument::new(filters, aggs))
}

fn rejected(kind: &str, domain: Domain, err: Error) -> Error {
    warn!(query = kind, %domain, error = %err, "Rejected analytics query");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Facet, Filter, FilterName, Measure, Metric, MetricMeasuresQuery, TimeRange};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const FROM: i64 = 1756104349879;
    const TO: i64 = 1756190749879;

    fn range() -> TimeRange {
        TimeRange::from_millis(Some(FROM), Some(TO)).unwrap()
    }

    #[test]
    fn test_measures_document() {
        let query = MeasuresQuery::new(
            range(),
            vec![Filter::eq(FilterName::Api, "api-1")],
            vec![
                MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count, Measure::Rps]),
                MetricMeasuresQuery::new(Metric::HttpGatewayLatency, [Measure::Avg]),
            ],
        );
        let doc = MeasuresQueryAdapter::default().adapt(&query).unwrap();

        assert_eq!(doc.size, 0);
        assert_eq!(doc.filters()[1], json!({ "term": { "api-id": "api-1" } }));
        let keys: Vec<&String> = doc.aggs().keys().collect();
        assert_eq!(
            keys,
            ["HTTP_REQUESTS#COUNT", "_HTTP_REQUESTS#RPS", "HTTP_GATEWAY_LATENCY#AVG"]
        );
    }

    #[test]
    fn test_unresolved_metric_fails_whole_document() {
        let query = MeasuresQuery::new(
            range(),
            vec![],
            vec![
                MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count]),
                MetricMeasuresQuery::new(Metric::MessagePayloadSize, [Measure::Avg]),
            ],
        );
        let err = MeasuresQueryAdapter::default().adapt(&query).unwrap_err();

        assert!(matches!(err, Error::UnresolvedField { .. }));
    }

    #[test]
    fn test_invalid_request_is_rejected_before_compiling() {
        let query = MeasuresQuery::new(range(), vec![], vec![]);
        let err = MeasuresQueryAdapter::default().adapt(&query).unwrap_err();

        assert!(matches!(err, Error::InvalidQueryShape(_)));
    }

    #[test]
    fn test_time_series_with_facets_buckets_facets_outside() {
        let query = TimeSeriesQuery::new(
            range(),
            vec![],
            3_600_000,
            vec![MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count, Measure::Rps])],
        )
        .with_facets(vec![Facet::Api]);
        let doc = TimeSeriesQueryAdapter::default().adapt(&query).unwrap();

        let series = &doc.aggs()["HTTP_REQUESTS#API"]["aggs"]["HTTP_REQUESTS#TIME_SERIES"];
        assert_eq!(series["date_histogram"]["fixed_interval"], "3600000ms");

        let rps = &series["aggs"]["_HTTP_REQUESTS#RPS"];
        assert_eq!(rps["date_histogram"]["fixed_interval"], "3600000ms");
        assert_eq!(
            rps["aggs"]["HTTP_REQUESTS#RPS"]["bucket_script"]["script"],
            "params.count / 3600.0"
        );
    }

    #[test]
    fn test_message_request_ids() {
        let query = MeasuresQuery::new(
            range(),
            vec![],
            vec![MetricMeasuresQuery::new(Metric::Messages, [Measure::Count])],
        );
        let ids: BTreeSet<String> = ["r1", "r2", "r3"].into_iter().map(String::from).collect();
        let adapter = MessageMeasuresQueryAdapter::default();

        let doc = adapter.adapt(&query, Some(&ids)).unwrap();
        let id_clauses: Vec<_> = doc
            .filters()
            .iter()
            .filter(|c| c["terms"].get("request-id").is_some())
            .collect();
        assert_eq!(id_clauses.len(), 1);
        assert_eq!(id_clauses[0]["terms"]["request-id"].as_array().unwrap().len(), 3);

        for ids in [None, Some(&BTreeSet::new())] {
            let doc = adapter.adapt(&query, ids).unwrap();
            assert!(!doc.to_json().unwrap().contains("request-id"));
        }
    }
}
