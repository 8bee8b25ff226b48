//! Request models for AggForge

mod facet;
mod filter;
mod metrics;
mod query;

pub use facet::*;
pub use filter::*;
pub use metrics::*;
pub use query::*;
