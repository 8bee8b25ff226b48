//! Top-level search query document

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::compiler::Aggs;
use crate::error::Result;

/// An aggregation-only search request
///
/// Serializes as `{"query":{"bool":{"filter":[...]}},"aggs":{...},"size":0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    /// Matching documents
    pub query: Query,
    /// Aggregations, in insertion order
    pub aggs: Aggs,
    /// Number of hits returned, always zero
    pub size: u32,
}

/// The `query` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Boolean filter context
    #[serde(rename = "bool")]
    pub bool_query: BoolQuery,
}

/// A `bool` query holding only filter clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Clauses every document must match
    pub filter: Vec<Value>,
}

impl QueryDocument {
    /// Create a document from filter clauses and aggregations
    pub fn new(filter: Vec<Value>, aggs: Aggs) -> Self {
        Self {
            query: Query {
                bool_query: BoolQuery { filter },
            },
            aggs,
            size: 0,
        }
    }

    /// Filter clauses
    pub fn filters(&self) -> &[Value] {
        &self.query.bool_query.filter
    }

    /// Aggregations
    pub fn aggs(&self) -> &Aggs {
        &self.aggs
    }

    /// Document as a JSON value
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_layout() {
        let mut aggs = Aggs::new();
        aggs.insert("b".into(), json!({}));
        aggs.insert("a".into(), json!({}));
        let doc = QueryDocument::new(vec![json!({ "term": { "api-id": "x" } })], aggs);

        assert_eq!(
            doc.to_json().unwrap(),
            r#"{"query":{"bool":{"filter":[{"term":{"api-id":"x"}}]}},"aggs":{"b":{},"a":{}},"size":0}"#
        );
        assert_eq!(doc.filters().len(), 1);
    }
}
