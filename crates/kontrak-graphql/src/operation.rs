//! Request and response envelopes.

use serde::{Deserialize, Serialize};

use crate::error::GraphqlError;

/// GraphQL request payload as sent over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest<V> {
    /// Query text.
    pub query: String,
    /// Variables.
    pub variables: V,
    /// Optional operation name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl<V> GraphqlRequest<V> {
    /// Create a new request.
    #[must_use]
    pub fn new(query: impl Into<String>, variables: V) -> Self {
        Self {
            query: query.into(),
            variables,
            operation_name: None,
        }
    }

    /// Attach an operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// GraphQL response container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphqlResponse<T> {
    /// Response data.
    #[serde(default)]
    pub data: Option<T>,
    /// GraphQL errors.
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
    /// Extensions payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl<T> GraphqlResponse<T> {
    /// Response with data and no errors.
    #[must_use]
    pub const fn from_data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// Response carrying only errors.
    #[must_use]
    pub const fn from_errors(errors: Vec<GraphqlError>) -> Self {
        Self {
            data: None,
            errors,
            extensions: None,
        }
    }

    /// Returns `true` if no GraphQL errors were returned.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// How a read interacts with the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Always hit the network and leave the cache untouched.
    #[default]
    NoCache,
    /// Always hit the network and store the result.
    NetworkOnly,
    /// Serve from the cache, falling back to the network on a miss.
    CacheFirst,
}

impl CachePolicy {
    /// Whether a successful network result is written to the cache.
    #[must_use]
    pub const fn writes_cache(self) -> bool {
        matches!(self, Self::NetworkOnly | Self::CacheFirst)
    }

    /// Whether the cache is consulted before the network.
    #[must_use]
    pub const fn reads_cache(self) -> bool {
        matches!(self, Self::CacheFirst)
    }
}

impl std::str::FromStr for CachePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "no-cache" => Ok(Self::NoCache),
            "network-only" => Ok(Self::NetworkOnly),
            "cache-first" => Ok(Self::CacheFirst),
            other => Err(format!("unknown cache policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_camel_case_operation_name() {
        let request = GraphqlRequest::new("query A { a }", serde_json::json!({}))
            .with_operation_name("A");
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["operationName"], "A");
        assert_eq!(value["query"], "query A { a }");
    }

    #[test]
    fn response_defaults_missing_fields() {
        let response: GraphqlResponse<serde_json::Value> =
            serde_json::from_str(r#"{"data": {"a": 1}}"#).expect("parse");
        assert!(response.is_ok());
        assert_eq!(response.data, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn cache_policy_parses_kebab_names() {
        assert_eq!("cache-first".parse::<CachePolicy>(), Ok(CachePolicy::CacheFirst));
        assert_eq!("no-cache".parse::<CachePolicy>(), Ok(CachePolicy::NoCache));
        assert!("sometimes".parse::<CachePolicy>().is_err());
        assert!(CachePolicy::NetworkOnly.writes_cache());
        assert!(!CachePolicy::NetworkOnly.reads_cache());
        assert!(!CachePolicy::NoCache.writes_cache());
    }
}
