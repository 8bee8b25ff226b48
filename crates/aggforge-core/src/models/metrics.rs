//! Metric and measure vocabulary

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A quantity that can be measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    // HTTP traffic
    /// Number of HTTP requests
    HttpRequests,
    /// HTTP requests answered with an error status
    HttpErrors,
    /// Time spent inside the gateway, upstream excluded
    HttpGatewayLatency,
    /// Total response time seen by the gateway
    HttpGatewayResponseTime,
    /// Response time of the upstream endpoint
    HttpEndpointResponseTime,
    /// Request body size
    HttpRequestContentLength,
    /// Response body size
    HttpResponseContentLength,

    // LLM proxy
    /// Prompt tokens sent to the model
    LlmPromptTokenSent,
    /// Completion tokens received from the model
    LlmPromptTokenReceived,
    /// Sent plus received tokens
    LlmPromptTotalToken,
    /// Cost of the sent tokens
    LlmPromptTokenSentCost,
    /// Cost of the received tokens
    LlmPromptTokenReceivedCost,
    /// Sent plus received cost
    LlmPromptTokenTotalCost,

    // Message traffic
    /// Number of messages
    Messages,
    /// Messages that failed
    MessageErrors,
    /// Time spent inside the gateway per message
    MessageGatewayLatency,
    /// Message payload size
    MessagePayloadSize,
}

impl Metric {
    /// Every metric, in declaration order
    pub const ALL: [Metric; 17] = [
        Self::HttpRequests,
        Self::HttpErrors,
        Self::HttpGatewayLatency,
        Self::HttpGatewayResponseTime,
        Self::HttpEndpointResponseTime,
        Self::HttpRequestContentLength,
        Self::HttpResponseContentLength,
        Self::LlmPromptTokenSent,
        Self::LlmPromptTokenReceived,
        Self::LlmPromptTotalToken,
        Self::LlmPromptTokenSentCost,
        Self::LlmPromptTokenReceivedCost,
        Self::LlmPromptTokenTotalCost,
        Self::Messages,
        Self::MessageErrors,
        Self::MessageGatewayLatency,
        Self::MessagePayloadSize,
    ];

    /// Vocabulary name, as used in aggregation keys
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HttpRequests => "HTTP_REQUESTS",
            Self::HttpErrors => "HTTP_ERRORS",
            Self::HttpGatewayLatency => "HTTP_GATEWAY_LATENCY",
            Self::HttpGatewayResponseTime => "HTTP_GATEWAY_RESPONSE_TIME",
            Self::HttpEndpointResponseTime => "HTTP_ENDPOINT_RESPONSE_TIME",
            Self::HttpRequestContentLength => "HTTP_REQUEST_CONTENT_LENGTH",
            Self::HttpResponseContentLength => "HTTP_RESPONSE_CONTENT_LENGTH",
            Self::LlmPromptTokenSent => "LLM_PROMPT_TOKEN_SENT",
            Self::LlmPromptTokenReceived => "LLM_PROMPT_TOKEN_RECEIVED",
            Self::LlmPromptTotalToken => "LLM_PROMPT_TOTAL_TOKEN",
            Self::LlmPromptTokenSentCost => "LLM_PROMPT_TOKEN_SENT_COST",
            Self::LlmPromptTokenReceivedCost => "LLM_PROMPT_TOKEN_RECEIVED_COST",
            Self::LlmPromptTokenTotalCost => "LLM_PROMPT_TOKEN_TOTAL_COST",
            Self::Messages => "MESSAGES",
            Self::MessageErrors => "MESSAGE_ERRORS",
            Self::MessageGatewayLatency => "MESSAGE_GATEWAY_LATENCY",
            Self::MessagePayloadSize => "MESSAGE_PAYLOAD_SIZE",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistical reduction applied to a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Measure {
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Average value
    Avg,
    /// Count, or sum for accumulated metrics
    Count,
    /// 50th percentile
    P50,
    /// 90th percentile
    P90,
    /// 95th percentile
    P95,
    /// 99th percentile
    P99,
    /// Rate per second over the window
    Rps,
    /// Error ratio over the window
    Percentage,
}

impl Measure {
    /// Every measure, in declaration order
    pub const ALL: [Measure; 10] = [
        Self::Min,
        Self::Max,
        Self::Avg,
        Self::Count,
        Self::P50,
        Self::P90,
        Self::P95,
        Self::P99,
        Self::Rps,
        Self::Percentage,
    ];

    /// Vocabulary name, as used in aggregation keys
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
            Self::Count => "COUNT",
            Self::P50 => "P50",
            Self::P90 => "P90",
            Self::P95 => "P95",
            Self::P99 => "P99",
            Self::Rps => "RPS",
            Self::Percentage => "PERCENTAGE",
        }
    }

    /// Whether the measure needs a bucket-level computation
    pub const fn is_derived(self) -> bool {
        matches!(self, Self::Rps | Self::Percentage)
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    #[default]
    Desc,
}

impl SortOrder {
    /// Backend spelling of the direction
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort on one of the requested measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Measure to sort buckets by
    pub measure: Measure,
    /// Direction
    pub order: SortOrder,
}

/// Measures requested for one metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricMeasuresQuery {
    /// The metric
    pub metric: Metric,

    /// Requested measures, iterated in declaration order
    pub measures: BTreeSet<Measure>,

    /// Optional bucket sort, only honoured by sorted facet queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

impl MetricMeasuresQuery {
    /// Create an unsorted metric query
    pub fn new(metric: Metric, measures: impl IntoIterator<Item = Measure>) -> Self {
        Self {
            metric,
            measures: measures.into_iter().collect(),
            sort: None,
        }
    }

    /// Sort buckets by one of the requested measures
    pub fn sorted_by(mut self, measure: Measure, order: SortOrder) -> Result<Self> {
        self.sort = Some(Sort { measure, order });
        self.validate()?;
        Ok(self)
    }

    /// Check the measure set and sort invariants
    pub fn validate(&self) -> Result<()> {
        if self.measures.is_empty() {
            return Err(Error::invalid_shape(format!(
                "{} requests no measures",
                self.metric
            )));
        }

        if let Some(sort) = &self.sort {
            if !self.measures.contains(&sort.measure) {
                return Err(Error::invalid_shape(format!(
                    "{} is sorted by {} which is not a requested measure",
                    self.metric, sort.measure
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_wire_format() {
        for metric in Metric::ALL {
            let wire = serde_json::to_value(metric).unwrap();
            assert_eq!(wire, serde_json::Value::String(metric.to_string()));
        }
        for measure in Measure::ALL {
            let wire = serde_json::to_value(measure).unwrap();
            assert_eq!(wire, serde_json::Value::String(measure.to_string()));
        }
    }

    #[test]
    fn test_sort_must_be_requested() {
        let query = MetricMeasuresQuery::new(Metric::HttpRequests, [Measure::Count])
            .sorted_by(Measure::Rps, SortOrder::Desc);

        assert!(matches!(query, Err(Error::InvalidQueryShape(_))));
    }

    #[test]
    fn test_empty_measures_rejected() {
        let query = MetricMeasuresQuery::new(Metric::HttpRequests, []);
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_measures_iterate_in_declaration_order() {
        let query = MetricMeasuresQuery::new(
            Metric::HttpGatewayLatency,
            [Measure::P99, Measure::Min, Measure::Avg],
        );
        let order: Vec<_> = query.measures.iter().copied().collect();
        assert_eq!(order, vec![Measure::Min, Measure::Avg, Measure::P99]);
    }
}
