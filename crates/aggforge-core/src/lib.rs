//! # AggForge
//!
//! Compiles typed analytics requests into search aggregation queries.
//!
//! A request names a time range, filters and the metrics to measure, and may
//! group them by facets or time buckets. AggForge turns it into a single
//! Elasticsearch/OpenSearch query document with `size: 0`, ready to send.
//!
//! ## Architecture
//!
//! - **Fields**: vocabulary to index field resolution, per domain
//! - **Compiler**: filter clauses, measure aggregations, facet and time nesting
//! - **Adapters**: one entry point per request kind
//!
//! ## Quick Start
//!
//! ```
//! use aggforge::prelude::*;
//!
//! let query = MeasuresQuery::new(
//!     TimeRange::from_millis(Some(1756104349879), Some(1756190749879))?,
//!     vec![Filter::eq(FilterName::Api, "my-api")],
//!     vec![MetricMeasuresQuery::new(Metric::HttpGatewayLatency, [Measure::Avg, Measure::P99])],
//! );
//!
//! let doc = MeasuresQueryAdapter::new(Domain::Http, CompilerConfig::default()).adapt(&query)?;
//! assert!(doc.aggs().contains_key("HTTP_GATEWAY_LATENCY#P99"));
//! # Ok::<(), aggforge::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::adapter::{
        FacetsQueryAdapter, MeasuresQueryAdapter, MessageMeasuresQueryAdapter, QueryAdapter,
        TimeSeriesQueryAdapter,
    };
    pub use crate::config::{CompilerConfig, Config};
    pub use crate::document::QueryDocument;
    pub use crate::error::{Error, Result};
    pub use crate::fields::Domain;
    pub use crate::models::*;
}
