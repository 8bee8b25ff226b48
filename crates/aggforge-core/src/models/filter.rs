//! Request filters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of a filterable dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterName {
    /// API identifier
    Api,
    /// Application identifier
    Application,
    /// Plan identifier
    Plan,
    /// Gateway instance
    Gateway,
    /// Gateway zone
    Zone,
    /// Tenant
    Tenant,
    /// Request host
    Host,
    /// Entrypoint identifier
    Entrypoint,
    /// HTTP method
    HttpMethod,
    /// HTTP status code
    HttpStatus,
    /// Request path
    HttpPath,
    /// Path mapping matched by the request
    HttpPathMapping,
    /// Country resolved from the client IP
    GeoIpCountry,
    /// Client IP address
    ConsumerIp,
    /// MCP method
    McpProxyMethod,
    /// MCP tool invoked through `tools/call`
    McpProxyTool,
    /// MCP resource read through `resources/read`
    McpProxyResource,
    /// MCP prompt fetched through `prompts/get`
    McpProxyPrompt,
    /// Message connector type
    ConnectorType,
    /// Message connector identifier
    ConnectorId,
    /// Message operation (publish or subscribe)
    Operation,
    /// Kafka topic
    KafkaTopic,
}

impl FilterName {
    /// Every filter name, in declaration order
    pub const ALL: [FilterName; 22] = [
        Self::Api,
        Self::Application,
        Self::Plan,
        Self::Gateway,
        Self::Zone,
        Self::Tenant,
        Self::Host,
        Self::Entrypoint,
        Self::HttpMethod,
        Self::HttpStatus,
        Self::HttpPath,
        Self::HttpPathMapping,
        Self::GeoIpCountry,
        Self::ConsumerIp,
        Self::McpProxyMethod,
        Self::McpProxyTool,
        Self::McpProxyResource,
        Self::McpProxyPrompt,
        Self::ConnectorType,
        Self::ConnectorId,
        Self::Operation,
        Self::KafkaTopic,
    ];

    /// Vocabulary name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "API",
            Self::Application => "APPLICATION",
            Self::Plan => "PLAN",
            Self::Gateway => "GATEWAY",
            Self::Zone => "ZONE",
            Self::Tenant => "TENANT",
            Self::Host => "HOST",
            Self::Entrypoint => "ENTRYPOINT",
            Self::HttpMethod => "HTTP_METHOD",
            Self::HttpStatus => "HTTP_STATUS",
            Self::HttpPath => "HTTP_PATH",
            Self::HttpPathMapping => "HTTP_PATH_MAPPING",
            Self::GeoIpCountry => "GEO_IP_COUNTRY",
            Self::ConsumerIp => "CONSUMER_IP",
            Self::McpProxyMethod => "MCP_PROXY_METHOD",
            Self::McpProxyTool => "MCP_PROXY_TOOL",
            Self::McpProxyResource => "MCP_PROXY_RESOURCE",
            Self::McpProxyPrompt => "MCP_PROXY_PROMPT",
            Self::ConnectorType => "CONNECTOR_TYPE",
            Self::ConnectorId => "CONNECTOR_ID",
            Self::Operation => "OPERATION",
            Self::KafkaTopic => "KAFKA_TOPIC",
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Field equals the single value
    Eq,
    /// Field equals any of the values
    In,
}

/// A single filter on a named dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Dimension to filter on
    pub name: FilterName,
    /// Comparison operator
    pub operator: Operator,
    /// Values, in request order
    pub values: Vec<String>,
}

impl Filter {
    /// Create an equality filter
    pub fn eq(name: FilterName, value: impl Into<String>) -> Self {
        Self {
            name,
            operator: Operator::Eq,
            values: vec![value.into()],
        }
    }

    /// Create a membership filter
    pub fn is_in<I, S>(name: FilterName, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            operator: Operator::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Check that the value list fits the operator
    pub fn validate(&self) -> Result<()> {
        match (self.operator, self.values.len()) {
            (Operator::Eq, 1) => Ok(()),
            (Operator::Eq, n) => Err(Error::invalid_shape(format!(
                "EQ filter on {} needs exactly one value, got {n}",
                self.name
            ))),
            (Operator::In, 0) => Err(Error::invalid_shape(format!(
                "IN filter on {} has no values",
                self.name
            ))),
            (Operator::In, _) => Ok(()),
        }
    }
}
