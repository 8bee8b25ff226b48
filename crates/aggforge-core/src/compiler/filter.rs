//! Filter clause compilation

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::fields::{self, Domain, FieldRef};
use crate::models::{Filter, Operator, TimeRange};

/// Build the `bool.filter` clauses of a query
///
/// The time range clause comes first (when any bound is set), then one clause
/// per filter in declaration order, then the request-id clause when
/// `request_ids` is non-empty.
pub fn compile_filters(
    domain: Domain,
    time_range: &TimeRange,
    filters: &[Filter],
    request_ids: Option<&BTreeSet<String>>,
) -> Result<Vec<Value>> {
    let mut clauses = Vec::with_capacity(filters.len() + 2);

    if let Some(clause) = time_range_clause(domain, time_range) {
        clauses.push(clause);
    }

    for filter in filters {
        let field = fields::resolve_filter(domain, filter.name)?;
        clauses.push(filter_clause(field, filter));
    }

    if let Some(ids) = request_ids.filter(|ids| !ids.is_empty()) {
        let field = fields::request_id_field(domain);
        clauses.push(json!({ "terms": { field: ids } }));
    }

    Ok(clauses)
}

fn time_range_clause(domain: Domain, time_range: &TimeRange) -> Option<Value> {
    if time_range.is_unbounded() {
        return None;
    }

    let mut bounds = Map::new();
    if let Some(from) = time_range.from_ms() {
        bounds.insert("gte".to_string(), json!(from));
    }
    if let Some(to) = time_range.to_ms() {
        bounds.insert("lte".to_string(), json!(to));
    }

    let field = fields::timestamp_field(domain);
    Some(json!({ "range": { field: bounds } }))
}

fn filter_clause(field: FieldRef, filter: &Filter) -> Value {
    match field {
        FieldRef::Single(field) => match_clause(field, filter),
        FieldRef::AnyOf(fields) => {
            let should: Vec<Value> = fields.iter().map(|f| match_clause(f, filter)).collect();
            json!({ "bool": { "should": should, "minimum_should_match": 1 } })
        }
    }
}

fn match_clause(field: &str, filter: &Filter) -> Value {
    match (filter.operator, filter.values.as_slice()) {
        (Operator::Eq, [value]) => json!({ "term": { field: value } }),
        _ => json!({ "terms": { field: filter.values } }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::FilterName;
    use pretty_assertions::assert_eq;

    const FROM: i64 = 1756104349879;
    const TO: i64 = 1756190749879;

    fn range(from: Option<i64>, to: Option<i64>) -> TimeRange {
        TimeRange::from_millis(from, to).unwrap()
    }

    #[test]
    fn test_time_range_clause_first() {
        let clauses = compile_filters(
            Domain::Http,
            &range(Some(FROM), Some(TO)),
            &[Filter::is_in(FilterName::Api, ["api-1"])],
            None,
        )
        .unwrap();

        assert_eq!(clauses[0]["range"]["@timestamp"]["gte"], json!(FROM));
        assert_eq!(clauses[0]["range"]["@timestamp"]["lte"], json!(TO));
        assert_eq!(clauses[1], json!({ "terms": { "api-id": ["api-1"] } }));
    }

    #[test]
    fn test_missing_bound_is_omitted() {
        let clauses = compile_filters(Domain::Http, &range(None, Some(TO)), &[], None).unwrap();

        assert_eq!(clauses, vec![json!({ "range": { "@timestamp": { "lte": TO } } })]);
    }

    #[test]
    fn test_unbounded_range_emits_nothing() {
        let clauses = compile_filters(Domain::Http, &TimeRange::default(), &[], None).unwrap();
        assert!(clauses.is_empty());
    }

    #[test]
    fn test_eq_and_in_clauses_keep_order() {
        let filters = [
            Filter::eq(FilterName::HttpMethod, "GET"),
            Filter::is_in(FilterName::Plan, ["p1", "p2"]),
            Filter::eq(FilterName::McpProxyTool, "search"),
        ];

        let clauses = compile_filters(Domain::Http, &TimeRange::default(), &filters, None).unwrap();

        assert_eq!(
            clauses,
            vec![
                json!({ "term": { "http-method": "GET" } }),
                json!({ "terms": { "plan-id": ["p1", "p2"] } }),
                json!({ "term": { "additional-metrics.keyword_mcp-proxy_tools/call": "search" } }),
            ]
        );
    }

    #[test]
    fn test_legacy_fields_use_should() {
        let filters = [Filter::eq(FilterName::HttpPath, "/orders")];

        let clauses = compile_filters(Domain::Http, &TimeRange::default(), &filters, None).unwrap();

        assert_eq!(
            clauses,
            vec![json!({
                "bool": {
                    "should": [
                        { "term": { "path-info": "/orders" } },
                        { "term": { "uri": "/orders" } }
                    ],
                    "minimum_should_match": 1
                }
            })]
        );
    }

    #[test]
    fn test_request_ids() {
        let ids: BTreeSet<String> = ["r1", "r2", "r3"].iter().map(|s| s.to_string()).collect();

        let clauses =
            compile_filters(Domain::Message, &range(Some(FROM), Some(TO)), &[], Some(&ids)).unwrap();

        let request_clauses: Vec<_> = clauses
            .iter()
            .filter(|c| c.pointer("/terms/request-id").is_some())
            .collect();
        assert_eq!(request_clauses.len(), 1);
        assert_eq!(request_clauses[0]["terms"]["request-id"], json!(["r1", "r2", "r3"]));
    }

    #[test]
    fn test_empty_request_ids_emit_nothing() {
        let empty = BTreeSet::new();
        for ids in [None, Some(&empty)] {
            let clauses = compile_filters(Domain::Message, &TimeRange::default(), &[], ids).unwrap();
            assert!(clauses.is_empty());
        }
    }

    #[test]
    fn test_unsupported_filter_fails() {
        let filters = [Filter::eq(FilterName::KafkaTopic, "orders")];

        let err = compile_filters(Domain::Message, &TimeRange::default(), &filters, None).unwrap_err();
        assert!(matches!(err, Error::UnresolvedField { .. }));
    }
}
