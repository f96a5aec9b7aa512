//! Line filters applied before parsing
//!
//! Pageview dumps are tens of millions of lines per hour; most consumers only
//! want a sliver of them. Filters run on the raw text so rejected lines never
//! pay for field splitting or integer parsing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Caller-supplied line predicate
pub type LinePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Errors raised while building a filter chain
#[derive(Debug, Error)]
pub enum FilterConfigError {
    #[error("invalid regex {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Declarative filter configuration. Every condition is optional; the ones
/// that are present are combined with logical AND.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Keep lines starting with this prefix
    #[serde(default)]
    pub starts_with: Option<String>,
    /// Keep lines containing this substring
    #[serde(default)]
    pub contains: Option<String>,
    /// Keep lines where this regex matches anywhere
    #[serde(default)]
    pub regex: Option<String>,
    /// Keep lines accepted by this predicate
    #[serde(skip)]
    pub custom: Option<LinePredicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = Some(prefix.into());
        self
    }

    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(predicate));
        self
    }

    /// True when no condition would be applied
    pub fn is_empty(&self) -> bool {
        non_empty(&self.starts_with).is_none()
            && non_empty(&self.contains).is_none()
            && self.regex.is_none()
            && self.custom.is_none()
    }

    /// Compile into a chain, validating the regex up front
    pub fn build(&self) -> Result<FilterChain, FilterConfigError> {
        FilterChain::new(self)
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSpec")
            .field("starts_with", &self.starts_with)
            .field("contains", &self.contains)
            .field("regex", &self.regex)
            .field("custom", &self.custom.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Empty strings are treated as "not set"
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A single compiled condition
#[derive(Clone)]
enum LineFilter {
    Prefix(String),
    Contains(String),
    Pattern(Regex),
    Custom(LinePredicate),
}

impl LineFilter {
    fn accepts(&self, line: &str) -> bool {
        match self {
            LineFilter::Prefix(prefix) => line.starts_with(prefix.as_str()),
            LineFilter::Contains(needle) => line.contains(needle.as_str()),
            LineFilter::Pattern(re) => re.is_match(line),
            LineFilter::Custom(predicate) => predicate(line),
        }
    }
}

impl fmt::Debug for LineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFilter::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            LineFilter::Contains(c) => f.debug_tuple("Contains").field(c).finish(),
            LineFilter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            LineFilter::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// Compiled AND of the configured conditions. An empty chain accepts every line.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<LineFilter>,
}

impl FilterChain {
    /// Build a chain from a spec. Conditions run cheapest first:
    /// prefix, substring, regex, then the caller's predicate.
    pub fn new(spec: &FilterSpec) -> Result<Self, FilterConfigError> {
        let mut filters = Vec::with_capacity(4);

        if let Some(prefix) = non_empty(&spec.starts_with) {
            filters.push(LineFilter::Prefix(prefix.to_string()));
        }
        if let Some(needle) = non_empty(&spec.contains) {
            filters.push(LineFilter::Contains(needle.to_string()));
        }
        if let Some(pattern) = &spec.regex {
            let re = Regex::new(pattern).map_err(|source| FilterConfigError::InvalidRegex {
                pattern: pattern.clone(),
                source,
            })?;
            filters.push(LineFilter::Pattern(re));
        }
        if let Some(predicate) = &spec.custom {
            filters.push(LineFilter::Custom(Arc::clone(predicate)));
        }

        Ok(Self { filters })
    }

    /// Chain that keeps everything
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Whether every configured condition accepts `line`. Stops at the first rejection.
    pub fn accepts(&self, line: &str) -> bool {
        self.filters.iter().all(|f| f.accepts(line))
    }

    /// Number of active conditions
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
