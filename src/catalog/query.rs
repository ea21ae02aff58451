//! Per-session query parameters and filter merging.
//!
//! Each WebSocket session carries the decoded query parameters of its
//! upgrade request. When a subscribe request supplies a filter body,
//! the body is merged into those parameters under [`FILTER_PARAM`],
//! overwriting any previous value, with spaces encoded as `+` (the
//! convention the filter-compiler side expects).

use std::collections::BTreeMap;

/// Query parameter holding the active filter expression.
pub const FILTER_PARAM: &str = "$filter";

/// Decoded key/value query parameters for one session.
///
/// Values are stored decoded; only the filter body carries the
/// `+`-for-space encoding applied by [`ResourceQuery::with_filter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    params: BTreeMap<String, String>,
}

impl ResourceQuery {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query from already-decoded key/value pairs.
    ///
    /// The WebSocket upgrade handler feeds this from axum's `Query`
    /// extractor, which has already percent-decoded the pairs.
    #[must_use]
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: params
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Merges a filter body into the query, overwriting any previous
    /// filter. Spaces in the body are encoded as `+`.
    #[must_use]
    pub fn with_filter(mut self, filter: &str) -> Self {
        self.params
            .insert(FILTER_PARAM.to_string(), filter.replace(' ', "+"));
        self
    }

    /// Returns the stored filter value, if any, in its `+`-encoded form.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.params.get(FILTER_PARAM).map(String::as_str)
    }

    /// Returns the filter expression with the `+` encoding undone,
    /// ready for the filter compiler.
    #[must_use]
    pub fn filter_expression(&self) -> Option<String> {
        self.filter().map(|raw| raw.replace('+', " "))
    }

    /// Returns the value of an arbitrary query parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns `true` if the query holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
