use crate::apis::{GooglePlacesClient, YelpClient};
use crate::cache::CachedFetcher;
use crate::common::error::Result;
use crate::config::{Config, Credentials};
use crate::domain::{CategoryTally, CityData, CityOutcome};
use crate::pipeline::reconcile::Reconciler;
use tracing::{info, instrument};

/// Runs one city end to end: primary fetch, reconciliation, tallies.
pub struct AggregatePipeline {
    yelp: YelpClient,
    reconciler: Reconciler,
}

impl AggregatePipeline {
    pub fn new(yelp: YelpClient, reconciler: Reconciler) -> Self {
        Self { yelp, reconciler }
    }

    pub fn from_config(config: &Config, credentials: &Credentials) -> Self {
        let yelp = YelpClient::new(&credentials.yelp_api_key)
            .with_endpoint(&config.yelp.endpoint)
            .with_term(&config.yelp.term);
        let places = GooglePlacesClient::new(&credentials.google_places_key)
            .with_endpoints(&config.places.nearby_endpoint, &config.places.details_endpoint);
        Self::new(yelp, Reconciler::with_policy(places, config.match_policy()))
    }

    pub fn policy_name(&self) -> &'static str {
        self.reconciler.policy_name()
    }

    /// Either every collection for the city or `NoData`; an error anywhere
    /// discards the partial work.
    #[instrument(skip(self, fetcher))]
    pub fn run_for_city(&self, fetcher: &mut CachedFetcher<'_>, city: &str) -> Result<CityOutcome> {
        let Some(mut primary) = self.yelp.fetch_businesses(fetcher, city)? else {
            crate::observability::metrics::pipeline::city_no_data();
            return Ok(CityOutcome::NoData);
        };

        let mut primary_tally = CategoryTally::new();
        for record in &primary {
            primary_tally.record(&record.categories);
        }

        let reconciliation = self.reconciler.reconcile(fetcher, &mut primary)?;

        info!(
            primary = primary.len(),
            secondary = reconciliation.secondary.len(),
            primary_categories = primary_tally.len(),
            secondary_categories = reconciliation.secondary_tally.len(),
            "City data collected"
        );
        crate::observability::metrics::pipeline::city_collected(primary.len());

        Ok(CityOutcome::Collected(CityData {
            city: city.to_string(),
            primary,
            secondary: reconciliation.secondary,
            primary_tally,
            secondary_tally: reconciliation.secondary_tally,
        }))
    }
}
