use crate::common::error::Result;
use serde_json::Value;

/// How a request authenticates against its source.
///
/// Google Places takes its key as a query parameter, so it travels in `params`
/// and uses `RequestAuth::None`.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestAuth {
    None,
    Bearer(String),
}

/// An outbound GET against one external source
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub auth: RequestAuth,
}

impl ApiRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
            auth: RequestAuth::None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = RequestAuth::Bearer(token.into());
        self
    }
}

/// Blocking JSON transport. Implementations must not interpret the payload beyond
/// parsing it as JSON.
pub trait HttpClientPort: Send + Sync {
    fn get_json(&self, request: &ApiRequest) -> Result<Value>;
}
