#![allow(dead_code)]

use food_aggregator::app::ports::{ApiRequest, HttpClientPort};
use food_aggregator::common::constants::{
    PLACES_DETAILS_ENDPOINT, PLACES_NEARBY_ENDPOINT, YELP_SEARCH_ENDPOINT,
};
use food_aggregator::common::error::{AggregatorError, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&ApiRequest) -> Result<Value> + Send + Sync>;

/// Answers requests from a closure and records every call.
pub struct FakeHttp {
    responder: Responder,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

/// Call log that outlives a `FakeHttp` moved into a session
#[derive(Clone)]
pub struct CallLog {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl CallLog {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.endpoint.clone())
            .collect()
    }
}

impl FakeHttp {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> CallLog {
        CallLog {
            calls: self.calls.clone(),
            requests: self.requests.clone(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpClientPort for FakeHttp {
    fn get_json(&self, request: &ApiRequest) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

pub fn param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// One Yelp business in the Ann Arbor fixture, with its Google counterpart
pub struct Restaurant {
    pub name: &'static str,
    pub rating: f64,
    pub categories: &'static [&'static str],
    /// `None` when Google has nothing near the restaurant
    pub google: Option<(&'static str, f64)>,
}

pub const ANN_ARBOR: &[Restaurant] = &[
    Restaurant { name: "Poke Fish", rating: 4.5, categories: &["Poke", "Sushi Bars"], google: Some(("Poke fish sushi", 4.6)) },
    Restaurant { name: "Frita Batidos", rating: 4.0, categories: &["Cuban", "Burgers"], google: Some(("Frita Batidos", 4.5)) },
    Restaurant { name: "Zingerman's Delicatessen", rating: 4.0, categories: &["Delis", "Sandwiches"], google: Some(("Zingerman's Delicatessen", 4.7)) },
    Restaurant { name: "Jolly Pumpkin", rating: 4.0, categories: &["Bars", "Pizza"], google: None },
    Restaurant { name: "Slurping Turtle", rating: 3.5, categories: &["Ramen", "Bars"], google: Some(("Slurping Turtle", 4.3)) },
    Restaurant { name: "Sava's", rating: 4.0, categories: &["American (New)", "Bars"], google: Some(("Sava's", 4.4)) },
    Restaurant { name: "Blank Slate Creamery", rating: 5.0, categories: &["Ice Cream & Frozen Yogurt"], google: Some(("Blank Slate Creamery", 4.8)) },
    Restaurant { name: "Tomukun Noodle Bar", rating: 4.0, categories: &["Ramen", "Korean"], google: None },
    Restaurant { name: "Mani Osteria", rating: 4.0, categories: &["Italian", "Pizza", "Bars"], google: Some(("Mani Osteria & Bar", 4.5)) },
    Restaurant { name: "Jerusalem Garden", rating: 4.5, categories: &["Middle Eastern"], google: Some(("Jerusalem Garden", 4.6)) },
    Restaurant { name: "Aventura", rating: 4.0, categories: &["Tapas Bars", "Spanish"], google: Some(("Aventura", 4.4)) },
];

pub fn latitude(index: usize) -> f64 {
    (42280 + index) as f64 / 1000.0
}

pub fn longitude(_index: usize) -> f64 {
    -83.7430
}

pub fn yelp_payload(restaurants: &[Restaurant]) -> Value {
    let businesses: Vec<Value> = restaurants
        .iter()
        .enumerate()
        .map(|(i, r)| {
            json!({
                "name": r.name,
                "rating": r.rating,
                "review_count": 100 + i,
                "price": "$$",
                "location": {
                    "display_address": [format!("{} Main St", 100 + i), "Ann Arbor, MI 48104"],
                    "city": "Ann Arbor",
                    "state": "MI"
                },
                "coordinates": { "latitude": latitude(i), "longitude": longitude(i) },
                "categories": r.categories.iter().map(|c| json!({ "alias": c.to_lowercase(), "title": c })).collect::<Vec<_>>()
            })
        })
        .collect();
    json!({ "businesses": businesses, "total": restaurants.len() })
}

fn restaurant_at(location: &str) -> Option<usize> {
    (0..ANN_ARBOR.len()).find(|&i| format!("{},{}", latitude(i), longitude(i)) == location)
}

/// Responder serving the Ann Arbor fixture for every endpoint the pipeline calls
pub fn ann_arbor_responder(request: &ApiRequest) -> Result<Value> {
    if request.endpoint == YELP_SEARCH_ENDPOINT {
        return match param(request, "location") {
            Some("Ann+Arbor") => Ok(yelp_payload(ANN_ARBOR)),
            _ => Ok(json!({ "businesses": [], "total": 0 })),
        };
    }

    if request.endpoint == PLACES_NEARBY_ENDPOINT {
        let index = param(request, "location").and_then(restaurant_at);
        let Some((i, (name, _))) = index.and_then(|i| ANN_ARBOR[i].google.map(|g| (i, g))) else {
            return Ok(json!({ "status": "ZERO_RESULTS", "results": [] }));
        };
        return Ok(json!({
            "status": "OK",
            "results": [
                { "place_id": format!("place-{}", i), "name": name },
                { "place_id": format!("far-{}", i), "name": "Somewhere Else" }
            ]
        }));
    }

    if request.endpoint == PLACES_DETAILS_ENDPOINT {
        let place_id = param(request, "placeid").unwrap_or_default();
        let details = place_id
            .strip_prefix("place-")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| ANN_ARBOR[i].google.map(|g| (i, g)));
        let Some((i, (name, rating))) = details else {
            return Ok(json!({ "status": "NOT_FOUND" }));
        };
        return Ok(json!({
            "status": "OK",
            "result": {
                "name": name,
                "rating": rating,
                "geometry": { "location": { "lat": latitude(i), "lng": longitude(i) } },
                "types": ["restaurant", "food", "point_of_interest", "establishment"]
            }
        }));
    }

    Err(AggregatorError::source_fetch(&request.endpoint, "unexpected endpoint"))
}

pub fn ann_arbor_http() -> FakeHttp {
    FakeHttp::new(ann_arbor_responder)
}
