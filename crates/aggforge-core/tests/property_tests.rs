//! Property tests for query compilation
//!
//! Uses proptest to check that compilation is deterministic and that every
//! supported request compiles to a document carrying its measure keys.

use aggforge::prelude::*;
use proptest::prelude::*;

// =============================================================================
// Request Strategies
// =============================================================================

fn time_range() -> impl Strategy<Value = TimeRange> {
    (1_600_000_000_000i64..1_800_000_000_000, 1i64..(30 * 86_400_000)).prop_map(|(from, span)| {
        TimeRange::from_millis(Some(from), Some(from + span)).unwrap()
    })
}

fn http_filter() -> impl Strategy<Value = Filter> {
    let names = prop::sample::select(vec![
        FilterName::Api,
        FilterName::Application,
        FilterName::Plan,
        FilterName::HttpMethod,
        FilterName::HttpPath,
        FilterName::McpProxyTool,
    ]);
    (names, prop::collection::vec("[a-z0-9-]{1,12}", 1..4)).prop_map(|(name, values)| {
        if values.len() == 1 {
            Filter::eq(name, values[0].clone())
        } else {
            Filter::is_in(name, values)
        }
    })
}

fn latency_measures() -> impl Strategy<Value = MetricMeasuresQuery> {
    let metrics = prop::sample::select(vec![
        Metric::HttpGatewayLatency,
        Metric::HttpGatewayResponseTime,
        Metric::HttpEndpointResponseTime,
    ]);
    let measures = prop::sample::subsequence(
        vec![
            Measure::Min,
            Measure::Max,
            Measure::Avg,
            Measure::Count,
            Measure::P50,
            Measure::P90,
            Measure::P95,
            Measure::P99,
            Measure::Rps,
        ],
        1..6,
    );
    (metrics, measures).prop_map(|(metric, measures)| MetricMeasuresQuery::new(metric, measures))
}

fn measures_query() -> impl Strategy<Value = MeasuresQuery> {
    (
        time_range(),
        prop::collection::vec(http_filter(), 0..4),
        latency_measures(),
    )
        .prop_map(|(range, filters, metric)| MeasuresQuery::new(range, filters, vec![metric]))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn compiling_twice_is_byte_identical(query in measures_query()) {
        let adapter = MeasuresQueryAdapter::default();
        let first = adapter.adapt(&query).unwrap().to_json().unwrap();
        let second = adapter.adapt(&query).unwrap().to_json().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_measure_has_a_key(query in measures_query()) {
        let doc = MeasuresQueryAdapter::default().adapt(&query).unwrap();
        let metric = &query.metrics[0];
        for measure in &metric.measures {
            let key = if measure.is_derived() {
                format!("_{}#{measure}", metric.metric)
            } else {
                format!("{}#{measure}", metric.metric)
            };
            prop_assert!(doc.aggs().contains_key(&key), "missing {}", key);
        }
    }

    #[test]
    fn filters_follow_declaration_order(query in measures_query()) {
        let doc = MeasuresQueryAdapter::default().adapt(&query).unwrap();
        prop_assert_eq!(doc.filters().len(), query.filters.len() + 1);
        prop_assert!(doc.filters()[0].get("range").is_some());
    }

    #[test]
    fn facets_compile_deterministically(
        query in measures_query(),
        facets in prop::sample::subsequence(
            vec![Facet::Api, Facet::Plan, Facet::Gateway, Facet::HttpStatusCodeGroup],
            1..4,
        ),
    ) {
        let query = FacetsQuery::new(
            query.time_range,
            query.filters,
            query.metrics,
            FacetGrouping::Nested(facets),
        );
        let adapter = FacetsQueryAdapter::default();
        let first = adapter.adapt(&query).unwrap().to_json().unwrap();
        let second = adapter.adapt(&query).unwrap().to_json().unwrap();
        prop_assert_eq!(first, second);
    }
}
