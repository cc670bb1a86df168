//! GitHub GraphQL transport.
//!
//! Every call posts one query document with its variables. GraphQL reports most
//! failures inside a 200 response, so the envelope is decoded here and errors are
//! folded into [`GraphQlOutcome`].

use crate::facts::resilient_http::{HttpError, RequestSpec, ResilientClient};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub message: String,
}

/// Result of a GraphQL call once the envelope has been opened.
#[derive(Debug)]
pub enum GraphQlOutcome<T> {
    /// The server produced data; partial errors are ignored.
    Data(T),

    /// The server produced no data, only errors.
    Errors(Vec<GraphQlError>),

    /// The call itself failed.
    Http(HttpError),
}

#[derive(Debug, Clone)]
pub struct GraphQlClient {
    client: ResilientClient,
    endpoint: String,
    token: Option<Arc<str>>,
}

impl GraphQlClient {
    #[must_use]
    pub fn new(client: ResilientClient, endpoint: impl Into<String>, token: Option<&str>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.map(str::trim).filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub async fn query<T: DeserializeOwned>(&self, name: &'static str, query: &str, variables: serde_json::Value) -> GraphQlOutcome<T> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut spec = RequestSpec::post_json(name, self.endpoint.as_str(), body);
        if let Some(token) = &self.token {
            spec = spec.bearer_auth(token.as_ref());
        }

        match self.client.request_json::<Envelope<T>>(&spec).await {
            Ok(Envelope { data: Some(data), .. }) => GraphQlOutcome::Data(data),
            Ok(Envelope { data: None, errors }) => GraphQlOutcome::Errors(errors),
            Err(e) => GraphQlOutcome::Http(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        value: Option<u32>,
    }

    #[test]
    fn test_envelope_with_data() {
        let envelope: Envelope<Probe> = serde_json::from_str(r#"{ "data": { "value": 3 } }"#).unwrap();
        assert_eq!(envelope.data.unwrap().value, Some(3));
        assert!(envelope.errors.is_empty());
    }

    #[test]
    fn test_envelope_with_errors_only() {
        let envelope: Envelope<Probe> =
            serde_json::from_str(r#"{ "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve" }] }"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.errors[0].kind.as_deref(), Some("NOT_FOUND"));
    }

    #[test]
    fn test_blank_token_is_ignored() {
        let client = ResilientClient::new(crate::facts::resilient_http::HttpSettings::default()).unwrap();
        assert!(!GraphQlClient::new(client.clone(), "http://localhost/graphql", Some("  ")).has_token());
        assert!(GraphQlClient::new(client, "http://localhost/graphql", Some("ghp_x")).has_token());
    }
}
