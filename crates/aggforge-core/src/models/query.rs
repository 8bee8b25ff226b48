//! Analytics requests accepted by the query adapters

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::facet::{Facet, NumberRange};
use super::filter::Filter;
use super::metrics::{Metric, MetricMeasuresQuery};

/// Time window of a request, both bounds optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Create a time range
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Create a time range from epoch milliseconds
    pub fn from_millis(from: Option<i64>, to: Option<i64>) -> Result<Self> {
        let convert = |ms: i64| {
            DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| Error::invalid_shape(format!("timestamp {ms} is out of range")))
        };

        Ok(Self {
            from: from.map(convert).transpose()?,
            to: to.map(convert).transpose()?,
        })
    }

    /// Lower bound in epoch milliseconds
    pub fn from_ms(&self) -> Option<i64> {
        self.from.map(|t| t.timestamp_millis())
    }

    /// Upper bound in epoch milliseconds
    pub fn to_ms(&self) -> Option<i64> {
        self.to.map(|t| t.timestamp_millis())
    }

    /// Both bounds in epoch milliseconds, when both are set
    pub fn bounds_ms(&self) -> Option<(i64, i64)> {
        Some((self.from_ms()?, self.to_ms()?))
    }

    /// Whether neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Check bound ordering
    pub fn validate(&self) -> Result<()> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(Error::invalid_shape(format!(
                "time range starts at {from} after it ends at {to}"
            ))),
            _ => Ok(()),
        }
    }
}

/// Flat measures over the whole window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuresQuery {
    /// Time window
    #[serde(default)]
    pub time_range: TimeRange,
    /// Filters, in declaration order
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Requested metrics
    pub metrics: Vec<MetricMeasuresQuery>,
}

impl MeasuresQuery {
    /// Create a measures query
    pub fn new(time_range: TimeRange, filters: Vec<Filter>, metrics: Vec<MetricMeasuresQuery>) -> Self {
        Self {
            time_range,
            filters,
            metrics,
        }
    }

    /// Check every structural invariant of the request
    pub fn validate(&self) -> Result<()> {
        validate_common(&self.time_range, &self.filters, &self.metrics)
    }
}

/// How a facets query groups its buckets
#[derive(Debug, Clone, PartialEq)]
pub enum FacetGrouping {
    /// One nested terms level per facet, outer to inner
    Nested(Vec<Facet>),
    /// A single facet keeping the `limit` best buckets by each metric's sort
    Top {
        /// The facet
        facet: Facet,
        /// Number of buckets kept
        limit: u32,
    },
    /// A status facet bucketed by explicit numeric ranges
    Ranges {
        /// The status facet
        facet: Facet,
        /// Bucket boundaries, in output order
        ranges: Vec<NumberRange>,
    },
}

impl FacetGrouping {
    /// Facets involved, outer to inner
    pub fn facets(&self) -> &[Facet] {
        match self {
            Self::Nested(facets) => facets,
            Self::Top { facet, .. } | Self::Ranges { facet, .. } => std::slice::from_ref(facet),
        }
    }
}

/// Measures grouped by one or more facets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FacetsRequest", into = "FacetsRequest")]
pub struct FacetsQuery {
    /// Time window
    pub time_range: TimeRange,
    /// Filters, in declaration order
    pub filters: Vec<Filter>,
    /// Requested metrics
    pub metrics: Vec<MetricMeasuresQuery>,
    /// Bucketing
    pub grouping: FacetGrouping,
}

impl FacetsQuery {
    /// Create a facets query
    pub fn new(
        time_range: TimeRange,
        filters: Vec<Filter>,
        metrics: Vec<MetricMeasuresQuery>,
        grouping: FacetGrouping,
    ) -> Self {
        Self {
            time_range,
            filters,
            metrics,
            grouping,
        }
    }

    /// Check every structural invariant of the request
    pub fn validate(&self) -> Result<()> {
        validate_common(&self.time_range, &self.filters, &self.metrics)?;

        match &self.grouping {
            FacetGrouping::Nested(facets) => {
                if facets.is_empty() {
                    return Err(Error::invalid_shape("facets query without facets"));
                }
                validate_distinct_facets(facets)?;
            }
            FacetGrouping::Top { limit, .. } => {
                if *limit == 0 {
                    return Err(Error::invalid_shape("limit must be positive"));
                }
                if let Some(unsorted) = self.metrics.iter().find(|m| m.sort.is_none()) {
                    return Err(Error::invalid_shape(format!(
                        "limit requires a sort on every metric, {} has none",
                        unsorted.metric
                    )));
                }
            }
            FacetGrouping::Ranges { facet, ranges } => {
                if !facet.is_status() {
                    return Err(Error::invalid_shape(format!(
                        "ranges only apply to status facets, not {facet}"
                    )));
                }
                if ranges.is_empty() {
                    return Err(Error::invalid_shape("ranges requested but none given"));
                }
            }
        }

        Ok(())
    }
}

/// Flat wire form of a [`FacetsQuery`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsRequest {
    /// Time window
    #[serde(default)]
    pub time_range: TimeRange,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Requested metrics
    pub metrics: Vec<MetricMeasuresQuery>,
    /// Facets, outer to inner
    pub facets: Vec<Facet>,
    /// Bucket limit, single facet only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Numeric ranges, single status facet only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<NumberRange>>,
}

impl TryFrom<FacetsRequest> for FacetsQuery {
    type Error = Error;

    fn try_from(request: FacetsRequest) -> Result<Self> {
        let single_facet = |what: &str| match request.facets.as_slice() {
            [facet] => Ok(*facet),
            facets => Err(Error::invalid_shape(format!(
                "{what} needs exactly one facet, got {}",
                facets.len()
            ))),
        };

        let grouping = match (request.limit, &request.ranges) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_shape("limit and ranges cannot be combined"))
            }
            (None, Some(ranges)) => FacetGrouping::Ranges {
                facet: single_facet("ranges")?,
                ranges: ranges.clone(),
            },
            (Some(limit), None) => FacetGrouping::Top {
                facet: single_facet("limit")?,
                limit,
            },
            (None, None) => FacetGrouping::Nested(request.facets.clone()),
        };

        let query = FacetsQuery::new(request.time_range, request.filters, request.metrics, grouping);
        query.validate()?;
        Ok(query)
    }
}

impl From<FacetsQuery> for FacetsRequest {
    fn from(query: FacetsQuery) -> Self {
        let (facets, limit, ranges) = match query.grouping {
            FacetGrouping::Nested(facets) => (facets, None, None),
            FacetGrouping::Top { facet, limit } => (vec![facet], Some(limit), None),
            FacetGrouping::Ranges { facet, ranges } => (vec![facet], None, Some(ranges)),
        };

        Self {
            time_range: query.time_range,
            filters: query.filters,
            metrics: query.metrics,
            facets,
            limit,
            ranges,
        }
    }
}

/// Measures bucketed over fixed time intervals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesQuery {
    /// Time window
    #[serde(default)]
    pub time_range: TimeRange,
    /// Filters, in declaration order
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Bucket width in milliseconds
    pub interval: u64,
    /// Requested metrics
    pub metrics: Vec<MetricMeasuresQuery>,
    /// Optional facets, each bucketing outside the time series
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
}

impl TimeSeriesQuery {
    /// Create a time-series query without facets
    pub fn new(
        time_range: TimeRange,
        filters: Vec<Filter>,
        interval: u64,
        metrics: Vec<MetricMeasuresQuery>,
    ) -> Self {
        Self {
            time_range,
            filters,
            interval,
            metrics,
            facets: Vec::new(),
        }
    }

    /// Group each series by the given facets
    pub fn with_facets(mut self, facets: Vec<Facet>) -> Self {
        self.facets = facets;
        self
    }

    /// Check every structural invariant of the request
    pub fn validate(&self) -> Result<()> {
        validate_common(&self.time_range, &self.filters, &self.metrics)?;

        if self.interval == 0 {
            return Err(Error::invalid_shape("time-series interval must be positive"));
        }

        validate_distinct_facets(&self.facets)
    }
}

fn validate_distinct_facets(facets: &[Facet]) -> Result<()> {
    let mut seen = HashSet::new();
    match facets.iter().find(|f| !seen.insert(**f)) {
        Some(dup) => Err(Error::invalid_shape(format!("facet {dup} is requested twice"))),
        None => Ok(()),
    }
}

fn validate_common(
    time_range: &TimeRange,
    filters: &[Filter],
    metrics: &[MetricMeasuresQuery],
) -> Result<()> {
    time_range.validate()?;

    for filter in filters {
        filter.validate()?;
    }

    if metrics.is_empty() {
        return Err(Error::invalid_shape("no metrics requested"));
    }

    let mut seen: HashSet<Metric> = HashSet::new();
    for metric in metrics {
        metric.validate()?;
        if !seen.insert(metric.metric) {
            return Err(Error::invalid_shape(format!(
                "metric {} is requested twice",
                metric.metric
            )));
        }
    }

    Ok(())
}
