//! Aggregation query compiler
//!
//! Turns request models into the pieces of a backend query document:
//!
//! - **filter**: `bool.filter` clauses from the time range, filters and request ids
//! - **measure**: one aggregation (or a derived pair) per metric and measure
//! - **facet**: nested `terms`/`range` buckets around a metric's aggregations
//! - **timeseries**: fixed-interval `date_histogram` buckets around them
//!
//! Every function is pure. Output maps keep insertion order, so compiling the
//! same request twice yields identical JSON.

pub mod facet;
pub mod filter;
pub mod measure;
pub mod timeseries;

pub use facet::nest_facets;
pub use filter::compile_filters;
pub use measure::{build_metric_aggs, RateWindow};
pub use timeseries::wrap_time_series;

/// An ordered `aggs` object
pub type Aggs = serde_json::Map<String, serde_json::Value>;
