use crate::app::ports::ApiRequest;
use crate::cache::CachedFetcher;
use crate::common::constants::{
    GOOGLE_PLACES_SOURCE, PLACES_DETAILS_ENDPOINT, PLACES_NEARBY_ENDPOINT, PLACES_STATUS_OK,
};
use crate::common::error::{AggregatorError, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

/// A place returned by nearby search, in distance order
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyCandidate {
    pub place_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    pub rating: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<NearbyResult>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    place_id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsEnvelope {
    status: String,
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
    rating: f64,
    geometry: Geometry,
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Secondary source: Google Places nearby search and place details
pub struct GooglePlacesClient {
    nearby_endpoint: String,
    details_endpoint: String,
    api_key: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            nearby_endpoint: PLACES_NEARBY_ENDPOINT.to_string(),
            details_endpoint: PLACES_DETAILS_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoints(
        mut self,
        nearby_endpoint: impl Into<String>,
        details_endpoint: impl Into<String>,
    ) -> Self {
        self.nearby_endpoint = nearby_endpoint.into();
        self.details_endpoint = details_endpoint.into();
        self
    }

    /// The keyword only narrows the search; results stay ranked by distance.
    pub fn nearby_request(&self, latitude: f64, longitude: f64, name_hint: &str) -> ApiRequest {
        ApiRequest::new(&self.nearby_endpoint)
            .param("key", &self.api_key)
            .param("location", format!("{},{}", coordinate(latitude), coordinate(longitude)))
            .param("rankby", "distance")
            .param("keyword", name_hint.replace(' ', "+"))
    }

    pub fn details_request(&self, place_id: &str) -> ApiRequest {
        ApiRequest::new(&self.details_endpoint)
            .param("key", &self.api_key)
            .param("placeid", place_id)
    }

    /// Candidates nearest to the coordinate first. A non-OK status (including
    /// ZERO_RESULTS) yields no candidates.
    #[instrument(skip(self, fetcher))]
    pub fn find_nearby(
        &self,
        fetcher: &mut CachedFetcher<'_>,
        latitude: f64,
        longitude: f64,
        name_hint: &str,
    ) -> Result<Vec<NearbyCandidate>> {
        let payload = fetcher.fetch(&self.nearby_request(latitude, longitude, name_hint))?;
        parse_nearby(payload)
    }

    /// `Ok(None)` when Places reports a non-OK status for the place.
    #[instrument(skip(self, fetcher))]
    pub fn fetch_details(
        &self,
        fetcher: &mut CachedFetcher<'_>,
        place_id: &str,
    ) -> Result<Option<PlaceDetails>> {
        let payload = fetcher.fetch(&self.details_request(place_id))?;
        parse_details(place_id, payload)
    }
}

/// Decimal rendering that always keeps a fractional part (`42.0`, not `42`), so
/// signatures match cache documents written by earlier tooling.
fn coordinate(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

pub fn parse_nearby(payload: Value) -> Result<Vec<NearbyCandidate>> {
    let response: NearbyResponse = serde_json::from_value(payload)
        .map_err(|e| AggregatorError::malformed(GOOGLE_PLACES_SOURCE, e))?;

    if response.status != PLACES_STATUS_OK {
        debug!(status = %response.status, "Nearby search returned no usable results");
        return Ok(Vec::new());
    }

    Ok(response
        .results
        .into_iter()
        .map(|r| NearbyCandidate {
            place_id: r.place_id,
            name: r.name,
        })
        .collect())
}

pub fn parse_details(place_id: &str, payload: Value) -> Result<Option<PlaceDetails>> {
    let envelope: DetailsEnvelope = serde_json::from_value(payload)
        .map_err(|e| AggregatorError::malformed(GOOGLE_PLACES_SOURCE, e))?;

    if envelope.status != PLACES_STATUS_OK {
        debug!(place_id, status = %envelope.status, "Place details unavailable");
        return Ok(None);
    }

    let result = envelope.result.ok_or_else(|| {
        AggregatorError::malformed(
            GOOGLE_PLACES_SOURCE,
            format!("details for {} have status OK but no result", place_id),
        )
    })?;
    let place: PlaceResult = serde_json::from_value(result)
        .map_err(|e| AggregatorError::malformed(GOOGLE_PLACES_SOURCE, e))?;

    Ok(Some(PlaceDetails {
        place_id: place_id.to_string(),
        name: place.name,
        rating: place.rating,
        latitude: place.geometry.location.lat,
        longitude: place.geometry.location.lng,
        types: place.types,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::param;
    use serde_json::json;

    #[test]
    fn test_nearby_request_shape() {
        let client = GooglePlacesClient::new("places-key");
        let request = client.nearby_request(42.2597, -83.6891, "Poke Fish");

        assert_eq!(request.endpoint, PLACES_NEARBY_ENDPOINT);
        assert_eq!(param(&request, "key"), Some("places-key"));
        assert_eq!(param(&request, "location"), Some("42.2597,-83.6891"));
        assert_eq!(param(&request, "rankby"), Some("distance"));
        assert_eq!(param(&request, "keyword"), Some("Poke+Fish"));
    }

    #[test]
    fn test_whole_number_coordinates_keep_fraction() {
        let client = GooglePlacesClient::new("places-key");
        let request = client.nearby_request(42.0, -83.0, "Diner");
        assert_eq!(param(&request, "location"), Some("42.0,-83.0"));

        let sig = crate::cache::signature(&request.endpoint, &request.params);
        assert!(sig.contains("_location-42.0,-83.0_"));
    }

    #[test]
    fn test_parse_nearby_keeps_distance_order() {
        let payload = json!({
            "status": "OK",
            "results": [
                {"place_id": "near", "name": "Poke fish sushi"},
                {"place_id": "far", "name": "Poke Bowl Co"}
            ]
        });

        let candidates = parse_nearby(payload).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].place_id, "near");
        assert_eq!(candidates[0].name.as_deref(), Some("Poke fish sushi"));
        assert_eq!(candidates[1].place_id, "far");
    }

    #[test]
    fn test_parse_nearby_zero_results() {
        let candidates = parse_nearby(json!({"status": "ZERO_RESULTS", "results": []})).unwrap();
        assert!(candidates.is_empty());

        let denied = parse_nearby(json!({"status": "REQUEST_DENIED"})).unwrap();
        assert!(denied.is_empty());
    }

    #[test]
    fn test_parse_details_ok() {
        let payload = json!({
            "status": "OK",
            "result": {
                "name": "Poke fish sushi",
                "rating": 4.6,
                "geometry": {"location": {"lat": 42.2597, "lng": -83.689106}},
                "types": ["restaurant", "food", "point_of_interest"]
            }
        });

        let details = parse_details("near", payload).unwrap().unwrap();
        assert_eq!(details.place_id, "near");
        assert_eq!(details.name, "Poke fish sushi");
        assert_eq!(details.rating, 4.6);
        assert_eq!(details.longitude, -83.689106);
        assert_eq!(details.types, vec!["restaurant", "food", "point_of_interest"]);
    }

    #[test]
    fn test_parse_details_non_ok_is_none() {
        let details = parse_details("gone", json!({"status": "NOT_FOUND"})).unwrap();
        assert!(details.is_none());
    }

    #[test]
    fn test_parse_details_missing_rating_is_malformed() {
        let payload = json!({
            "status": "OK",
            "result": {
                "name": "New Place",
                "geometry": {"location": {"lat": 1.0, "lng": 2.0}},
                "types": []
            }
        });
        let err = parse_details("new", payload).unwrap_err();
        assert!(matches!(
            err,
            AggregatorError::MalformedResponse { api: "google_places", .. }
        ));
    }
}
