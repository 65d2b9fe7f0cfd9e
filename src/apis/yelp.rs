use crate::app::ports::ApiRequest;
use crate::cache::CachedFetcher;
use crate::common::constants::{YELP_SEARCH_ENDPOINT, YELP_SEARCH_TERM, YELP_SOURCE};
use crate::common::error::{AggregatorError, Result};
use crate::domain::BusinessRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    businesses: Vec<YelpBusiness>,
}

#[derive(Debug, Deserialize)]
struct YelpBusiness {
    name: String,
    rating: f64,
    review_count: u32,
    location: YelpLocation,
    coordinates: YelpCoordinates,
    // Yelp leaves the price tier out for businesses that never set one
    price: Option<String>,
    categories: Vec<YelpCategory>,
}

#[derive(Debug, Deserialize)]
struct YelpLocation {
    display_address: Vec<String>,
    city: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct YelpCoordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct YelpCategory {
    title: String,
}

/// Primary source: Yelp Fusion business search
pub struct YelpClient {
    endpoint: String,
    term: String,
    api_key: String,
}

impl YelpClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: YELP_SEARCH_ENDPOINT.to_string(),
            term: YELP_SEARCH_TERM.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn search_request(&self, city: &str) -> ApiRequest {
        ApiRequest::new(&self.endpoint)
            .param("location", city.replace(' ', "+"))
            .param("term", &self.term)
            .bearer(&self.api_key)
    }

    /// Fetch the restaurants Yelp lists for `city`, in response order.
    ///
    /// `Ok(None)` means Yelp has no businesses for the city; callers abort the
    /// city rather than treating it as an empty result.
    #[instrument(skip(self, fetcher))]
    pub fn fetch_businesses(
        &self,
        fetcher: &mut CachedFetcher<'_>,
        city: &str,
    ) -> Result<Option<Vec<BusinessRecord>>> {
        let payload = fetcher.fetch(&self.search_request(city))?;
        let records = parse_businesses(payload)?;
        if records.is_empty() {
            info!("Yelp returned no businesses");
            return Ok(None);
        }
        debug!(count = records.len(), "Parsed Yelp businesses");
        Ok(Some(records))
    }
}

/// Turn a business search payload into records with sequential ids
pub fn parse_businesses(payload: Value) -> Result<Vec<BusinessRecord>> {
    let response: SearchResponse =
        serde_json::from_value(payload).map_err(|e| AggregatorError::malformed(YELP_SOURCE, e))?;

    response
        .businesses
        .into_iter()
        .enumerate()
        .map(|(id, business)| {
            let address = business
                .location
                .display_address
                .into_iter()
                .next()
                .ok_or_else(|| {
                    AggregatorError::malformed(
                        YELP_SOURCE,
                        format!("business '{}' has an empty display_address", business.name),
                    )
                })?;
            Ok(BusinessRecord {
                id,
                name: business.name,
                rating: business.rating,
                avg_rating: None,
                review_count: Some(business.review_count),
                address,
                city: business.location.city,
                state: business.location.state,
                latitude: business.coordinates.latitude,
                longitude: business.coordinates.longitude,
                price: business.price,
                categories: business.categories.into_iter().map(|c| c.title).collect(),
                source_count: 1,
            })
        })
        .collect()
}
