//! Grouping dimensions and numeric bucket ranges

use std::fmt;

use serde::{Deserialize, Serialize};

/// A dimension results can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facet {
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
    /// HTTP status class (1xx to 5xx)
    HttpStatusCodeGroup,
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
    /// MCP tool
    McpProxyTool,
    /// MCP resource
    McpProxyResource,
    /// MCP prompt
    McpProxyPrompt,
    /// Message connector type
    ConnectorType,
    /// Message connector identifier
    ConnectorId,
    /// Message operation
    Operation,
}

impl Facet {
    /// Every facet, in declaration order
    pub const ALL: [Facet; 22] = [
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
        Self::HttpStatusCodeGroup,
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
    ];

    /// Vocabulary name, as used in aggregation keys
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
            Self::HttpStatusCodeGroup => "HTTP_STATUS_CODE_GROUP",
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
        }
    }

    /// Whether the facet groups by HTTP status and so accepts numeric ranges
    pub const fn is_status(self) -> bool {
        matches!(self, Self::HttpStatus | Self::HttpStatusCodeGroup)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric bucket boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    /// Lower bound
    pub from: f64,
    /// Upper bound
    pub to: f64,
}

impl NumberRange {
    /// Create a range
    pub const fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// Bucket key, e.g. `100-199`
    pub fn key(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}
