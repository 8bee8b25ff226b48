//! Field resolution
//!
//! Maps the metric, filter and facet vocabulary to the field names of the
//! metrics indices. Lookups are scoped to a [`Domain`]: HTTP request metrics
//! and message metrics live in different indices with different fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Facet, FilterName, Metric};

/// Timestamp field shared by both metrics indices
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Request identifier field
pub const REQUEST_ID_FIELD: &str = "request-id";

/// HTTP status field
pub const STATUS_FIELD: &str = "status";

/// Per-document message count increment
pub const MESSAGE_COUNT_INCREMENT_FIELD: &str = "count-increment";

/// Per-document message error increment
pub const MESSAGE_ERROR_COUNT_INCREMENT_FIELD: &str = "error-count-increment";

const LLM_TOKENS_SENT_FIELD: &str = "additional-metrics.long_llm-proxy_tokens-sent";
const LLM_TOKENS_RECEIVED_FIELD: &str = "additional-metrics.long_llm-proxy_tokens-received";
const LLM_SENT_COST_FIELD: &str = "additional-metrics.double_llm-proxy_sent-cost";
const LLM_RECEIVED_COST_FIELD: &str = "additional-metrics.double_llm-proxy_received-cost";

const MCP_METHOD_FIELD: &str = "additional-metrics.keyword_mcp-proxy_method";
const MCP_TOOL_FIELD: &str = "additional-metrics.keyword_mcp-proxy_tools/call";
const MCP_RESOURCE_FIELD: &str = "additional-metrics.keyword_mcp-proxy_resources/read";
const MCP_PROMPT_FIELD: &str = "additional-metrics.keyword_mcp-proxy_prompts/get";

// Older documents stored the request path under `uri`.
const HTTP_PATH_FIELDS: &[&str] = &["path-info", "uri"];

/// Metrics index family a query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// HTTP request metrics
    #[default]
    Http,
    /// Message metrics
    Message,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Message => f.write_str("message"),
        }
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "message" | "messages" => Ok(Self::Message),
            other => Err(Error::config(format!("unknown domain: {other}"))),
        }
    }
}

/// Kind of identifier being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A metric
    Metric,
    /// A filter name
    Filter,
    /// A facet
    Facet,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => f.write_str("metric"),
            Self::Filter => f.write_str("filter"),
            Self::Facet => f.write_str("facet"),
        }
    }
}

/// Physical field(s) behind a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef {
    /// One field
    Single(&'static str),
    /// Any of several fields, current name first
    AnyOf(&'static [&'static str]),
}

impl FieldRef {
    /// Candidate field names
    pub fn fields(&self) -> &[&'static str] {
        match self {
            Self::Single(field) => std::slice::from_ref(field),
            Self::AnyOf(fields) => fields,
        }
    }
}

/// How a metric is stored in a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// Every document counts once
    Hits,
    /// Documents flagged as errors
    Errors,
    /// A numeric value per document
    Value(&'static str),
    /// A numeric value that is summed rather than counted
    Accumulated(&'static str),
    /// The sum of two accumulated values
    Combined(&'static str, &'static str),
}

/// Field holding the document timestamp
pub fn timestamp_field(_domain: Domain) -> &'static str {
    TIMESTAMP_FIELD
}

/// Field holding the request identifier
pub fn request_id_field(_domain: Domain) -> &'static str {
    REQUEST_ID_FIELD
}

/// Resolve how a metric is stored in a domain
pub fn metric_source(domain: Domain, metric: Metric) -> Result<MetricSource> {
    use MetricSource::*;

    let source = match (domain, metric) {
        (Domain::Http, Metric::HttpRequests) => Hits,
        (Domain::Http, Metric::HttpErrors) => Errors,
        (Domain::Http, Metric::HttpGatewayLatency) => Value("gateway-latency-ms"),
        (Domain::Http, Metric::HttpGatewayResponseTime) => Value("gateway-response-time-ms"),
        (Domain::Http, Metric::HttpEndpointResponseTime) => Value("endpoint-response-time-ms"),
        (Domain::Http, Metric::HttpRequestContentLength) => Value("request-content-length"),
        (Domain::Http, Metric::HttpResponseContentLength) => Value("response-content-length"),
        (Domain::Http, Metric::LlmPromptTokenSent) => Accumulated(LLM_TOKENS_SENT_FIELD),
        (Domain::Http, Metric::LlmPromptTokenReceived) => Accumulated(LLM_TOKENS_RECEIVED_FIELD),
        (Domain::Http, Metric::LlmPromptTokenSentCost) => Accumulated(LLM_SENT_COST_FIELD),
        (Domain::Http, Metric::LlmPromptTokenReceivedCost) => Accumulated(LLM_RECEIVED_COST_FIELD),
        (Domain::Http, Metric::LlmPromptTotalToken) => {
            Combined(LLM_TOKENS_SENT_FIELD, LLM_TOKENS_RECEIVED_FIELD)
        }
        (Domain::Http, Metric::LlmPromptTokenTotalCost) => {
            Combined(LLM_SENT_COST_FIELD, LLM_RECEIVED_COST_FIELD)
        }
        (Domain::Message, Metric::Messages) => Hits,
        (Domain::Message, Metric::MessageErrors) => Errors,
        (Domain::Message, Metric::MessageGatewayLatency) => Value("gateway-latency-ms"),
        (Domain::Message, Metric::MessagePayloadSize) => Value("content-length"),
        _ => return Err(Error::unresolved(domain, FieldKind::Metric, metric)),
    };

    Ok(source)
}

/// Resolve the single value field of a metric
pub fn resolve_metric(domain: Domain, metric: Metric) -> Result<&'static str> {
    match metric_source(domain, metric)? {
        MetricSource::Value(field) | MetricSource::Accumulated(field) => Ok(field),
        MetricSource::Hits | MetricSource::Errors | MetricSource::Combined(..) => {
            Err(Error::unresolved(domain, FieldKind::Metric, metric))
        }
    }
}

/// Resolve the field(s) a filter applies to
pub fn resolve_filter(domain: Domain, name: FilterName) -> Result<FieldRef> {
    use FieldRef::Single;

    let field = match (domain, name) {
        (_, FilterName::Api) => Single("api-id"),
        (_, FilterName::Gateway) => Single("gateway"),
        (Domain::Http, FilterName::Application) => Single("application-id"),
        (Domain::Http, FilterName::Plan) => Single("plan-id"),
        (Domain::Http, FilterName::Zone) => Single("zone"),
        (Domain::Http, FilterName::Tenant) => Single("tenant"),
        (Domain::Http, FilterName::Host) => Single("host"),
        (Domain::Http, FilterName::Entrypoint) => Single("entrypoint-id"),
        (Domain::Http, FilterName::HttpMethod) => Single("http-method"),
        (Domain::Http, FilterName::HttpStatus) => Single(STATUS_FIELD),
        (Domain::Http, FilterName::HttpPath) => FieldRef::AnyOf(HTTP_PATH_FIELDS),
        (Domain::Http, FilterName::HttpPathMapping) => Single("mapped-path"),
        (Domain::Http, FilterName::GeoIpCountry) => Single("geoip.country_iso_code"),
        (Domain::Http, FilterName::ConsumerIp) => Single("remote-address"),
        (Domain::Http, FilterName::McpProxyMethod) => Single(MCP_METHOD_FIELD),
        (Domain::Http, FilterName::McpProxyTool) => Single(MCP_TOOL_FIELD),
        (Domain::Http, FilterName::McpProxyResource) => Single(MCP_RESOURCE_FIELD),
        (Domain::Http, FilterName::McpProxyPrompt) => Single(MCP_PROMPT_FIELD),
        (Domain::Message, FilterName::ConnectorType) => Single("connector-type"),
        (Domain::Message, FilterName::ConnectorId) => Single("connector-id"),
        (Domain::Message, FilterName::Operation) => Single("operation"),
        _ => return Err(Error::unresolved(domain, FieldKind::Filter, name)),
    };

    Ok(field)
}

/// Resolve the field a facet buckets on
pub fn resolve_facet(domain: Domain, facet: Facet) -> Result<&'static str> {
    let field = match (domain, facet) {
        (_, Facet::Api) => "api-id",
        (_, Facet::Gateway) => "gateway",
        (Domain::Http, Facet::Application) => "application-id",
        (Domain::Http, Facet::Plan) => "plan-id",
        (Domain::Http, Facet::Zone) => "zone",
        (Domain::Http, Facet::Tenant) => "tenant",
        (Domain::Http, Facet::Host) => "host",
        (Domain::Http, Facet::Entrypoint) => "entrypoint-id",
        (Domain::Http, Facet::HttpMethod) => "http-method",
        (Domain::Http, Facet::HttpStatus | Facet::HttpStatusCodeGroup) => STATUS_FIELD,
        (Domain::Http, Facet::HttpPath) => HTTP_PATH_FIELDS[0],
        (Domain::Http, Facet::HttpPathMapping) => "mapped-path",
        (Domain::Http, Facet::GeoIpCountry) => "geoip.country_iso_code",
        (Domain::Http, Facet::ConsumerIp) => "remote-address",
        (Domain::Http, Facet::McpProxyMethod) => MCP_METHOD_FIELD,
        (Domain::Http, Facet::McpProxyTool) => MCP_TOOL_FIELD,
        (Domain::Http, Facet::McpProxyResource) => MCP_RESOURCE_FIELD,
        (Domain::Http, Facet::McpProxyPrompt) => MCP_PROMPT_FIELD,
        (Domain::Message, Facet::ConnectorType) => "connector-type",
        (Domain::Message, Facet::ConnectorId) => "connector-id",
        (Domain::Message, Facet::Operation) => "operation",
        _ => return Err(Error::unresolved(domain, FieldKind::Facet, facet)),
    };

    Ok(field)
}

/// One resolvable vocabulary entry
#[derive(Debug, Clone, Serialize)]
pub struct FieldMapping {
    /// What the entry is
    pub kind: FieldKind,
    /// Vocabulary name
    pub name: &'static str,
    /// Backend field(s)
    pub fields: Vec<&'static str>,
}

/// Every metric, filter and facet that resolves in a domain
pub fn mappings(domain: Domain) -> Vec<FieldMapping> {
    let metrics = Metric::ALL.iter().filter_map(|&metric| {
        let fields = match metric_source(domain, metric).ok()? {
            MetricSource::Hits => vec![TIMESTAMP_FIELD],
            MetricSource::Errors if domain == Domain::Http => vec![STATUS_FIELD],
            MetricSource::Errors => vec![MESSAGE_ERROR_COUNT_INCREMENT_FIELD],
            MetricSource::Value(field) | MetricSource::Accumulated(field) => vec![field],
            MetricSource::Combined(a, b) => vec![a, b],
        };
        Some(FieldMapping {
            kind: FieldKind::Metric,
            name: metric.as_str(),
            fields,
        })
    });

    let filters = FilterName::ALL.iter().filter_map(|&name| {
        let field = resolve_filter(domain, name).ok()?;
        Some(FieldMapping {
            kind: FieldKind::Filter,
            name: name.as_str(),
            fields: field.fields().to_vec(),
        })
    });

    let facets = Facet::ALL.iter().filter_map(|&facet| {
        Some(FieldMapping {
            kind: FieldKind::Facet,
            name: facet.as_str(),
            fields: vec![resolve_facet(domain, facet).ok()?],
        })
    });

    metrics.chain(filters).chain(facets).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FilterName::McpProxyMethod, "additional-metrics.keyword_mcp-proxy_method")]
    #[case(FilterName::McpProxyTool, "additional-metrics.keyword_mcp-proxy_tools/call")]
    #[case(FilterName::McpProxyResource, "additional-metrics.keyword_mcp-proxy_resources/read")]
    #[case(FilterName::McpProxyPrompt, "additional-metrics.keyword_mcp-proxy_prompts/get")]
    fn test_mcp_filters(#[case] name: FilterName, #[case] expected: &'static str) {
        assert_eq!(
            resolve_filter(Domain::Http, name).unwrap(),
            FieldRef::Single(expected)
        );
    }

    #[rstest]
    #[case(Facet::McpProxyMethod, "additional-metrics.keyword_mcp-proxy_method")]
    #[case(Facet::McpProxyTool, "additional-metrics.keyword_mcp-proxy_tools/call")]
    #[case(Facet::McpProxyResource, "additional-metrics.keyword_mcp-proxy_resources/read")]
    #[case(Facet::McpProxyPrompt, "additional-metrics.keyword_mcp-proxy_prompts/get")]
    fn test_mcp_facets(#[case] facet: Facet, #[case] expected: &str) {
        assert_eq!(resolve_facet(Domain::Http, facet).unwrap(), expected);
    }

    #[test]
    fn test_kafka_topic_resolves_nowhere() {
        for domain in [Domain::Http, Domain::Message] {
            let err = resolve_filter(domain, FilterName::KafkaTopic).unwrap_err();
            assert!(matches!(
                err,
                Error::UnresolvedField {
                    kind: FieldKind::Filter,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_message_only_vocabulary_rejected_in_http() {
        assert!(resolve_filter(Domain::Http, FilterName::ConnectorType).is_err());
        assert!(resolve_facet(Domain::Http, Facet::Operation).is_err());
        assert!(metric_source(Domain::Http, Metric::Messages).is_err());
        assert!(resolve_metric(Domain::Http, Metric::MessageGatewayLatency).is_err());
    }

    #[test]
    fn test_http_only_vocabulary_rejected_in_message() {
        assert!(resolve_filter(Domain::Message, FilterName::Application).is_err());
        assert!(resolve_facet(Domain::Message, Facet::HttpStatus).is_err());
        assert!(metric_source(Domain::Message, Metric::HttpGatewayLatency).is_err());
    }

    #[test]
    fn test_counters_have_no_value_field() {
        assert!(resolve_metric(Domain::Http, Metric::HttpRequests).is_err());
        assert!(resolve_metric(Domain::Http, Metric::LlmPromptTotalToken).is_err());
        assert_eq!(
            resolve_metric(Domain::Http, Metric::HttpGatewayLatency).unwrap(),
            "gateway-latency-ms"
        );
    }

    #[test]
    fn test_path_filter_matches_legacy_field() {
        let field = resolve_filter(Domain::Http, FilterName::HttpPath).unwrap();
        assert_eq!(field.fields(), &["path-info", "uri"]);
    }

    #[test]
    fn test_common_fields() {
        assert_eq!(resolve_facet(Domain::Http, Facet::Api).unwrap(), "api-id");
        assert_eq!(resolve_facet(Domain::Message, Facet::Api).unwrap(), "api-id");
        assert_eq!(resolve_facet(Domain::Http, Facet::HttpStatusCodeGroup).unwrap(), "status");
    }

    #[test]
    fn test_mappings_only_list_resolvable_entries() {
        let http = mappings(Domain::Http);
        assert!(http.iter().any(|m| m.name == "HTTP_GATEWAY_LATENCY"));
        assert!(!http.iter().any(|m| m.name == "KAFKA_TOPIC"));
        assert!(!http.iter().any(|m| m.name == "MESSAGES"));

        let message = mappings(Domain::Message);
        assert!(message.iter().any(|m| m.name == "CONNECTOR_TYPE"));
        assert!(!message.iter().any(|m| m.name == "HTTP_STATUS"));
    }

    #[test]
    fn test_domain_from_str() {
        assert_eq!("HTTP".parse::<Domain>().unwrap(), Domain::Http);
        assert_eq!("message".parse::<Domain>().unwrap(), Domain::Message);
        assert!("kafka".parse::<Domain>().is_err());
    }
}
