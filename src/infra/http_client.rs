use crate::app::ports::{ApiRequest, HttpClientPort, RequestAuth};
use crate::common::error::{AggregatorError, Result};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AggregatorError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpClientPort for ReqwestHttp {
    fn get_json(&self, request: &ApiRequest) -> Result<Value> {
        let mut builder = self.client.get(&request.endpoint).query(&request.params);
        if let RequestAuth::Bearer(token) = &request.auth {
            builder = builder.bearer_auth(token);
        }

        let t0 = Instant::now();
        let resp = builder.send().map_err(|e| {
            crate::observability::metrics::sources::request_error();
            AggregatorError::source_fetch(&request.endpoint, e)
        })?;
        let status = resp.status();
        let body = resp.text().map_err(|e| {
            crate::observability::metrics::sources::request_error();
            AggregatorError::source_fetch(&request.endpoint, e)
        })?;

        if !status.is_success() {
            crate::observability::metrics::sources::request_error();
            return Err(AggregatorError::source_fetch(
                &request.endpoint,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        crate::observability::metrics::sources::request_success();
        crate::observability::metrics::sources::request_duration(t0.elapsed().as_secs_f64());
        debug!(
            endpoint = %request.endpoint,
            status = status.as_u16(),
            bytes = body.len(),
            "Fetched upstream payload"
        );

        serde_json::from_str(&body).map_err(|e| {
            AggregatorError::source_fetch(&request.endpoint, format!("response is not JSON: {}", e))
        })
    }
}
