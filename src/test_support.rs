//! Test doubles shared by the unit tests.

use crate::app::ports::{ApiRequest, HttpClientPort};
use crate::common::error::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&ApiRequest) -> Result<Value> + Send + Sync>;

/// HTTP client that answers from a closure and counts every call.
pub struct FakeHttp {
    responder: Responder,
    calls: AtomicUsize,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeHttp {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClientPort for FakeHttp {
    fn get_json(&self, request: &ApiRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// Look up a query parameter on a recorded request
pub fn param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
