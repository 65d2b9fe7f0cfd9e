use crate::apis::{GooglePlacesClient, NearbyCandidate, PlaceDetails};
use crate::cache::CachedFetcher;
use crate::common::error::Result;
use crate::domain::{BusinessRecord, CategoryTally};
use std::collections::HashSet;
use tracing::{debug, info};

/// Decides which nearby candidate, if any, is the same restaurant as a primary record
pub trait MatchPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn select<'c>(
        &self,
        record: &BusinessRecord,
        candidates: &'c [NearbyCandidate],
    ) -> Option<&'c NearbyCandidate>;
}

/// The nearest place to the known coordinate is taken to be the same place.
/// No fallback to farther candidates and no similarity threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestNeighborPolicy;

impl MatchPolicy for NearestNeighborPolicy {
    fn name(&self) -> &'static str {
        "nearest"
    }

    fn select<'c>(
        &self,
        _record: &BusinessRecord,
        candidates: &'c [NearbyCandidate],
    ) -> Option<&'c NearbyCandidate> {
        candidates.first()
    }
}

/// Nearest candidate whose name shares enough tokens with the primary name
#[derive(Debug, Clone, Copy)]
pub struct NameSimilarityPolicy {
    pub min_similarity: f64,
}

impl NameSimilarityPolicy {
    pub fn new(min_similarity: f64) -> Self {
        Self { min_similarity }
    }
}

impl MatchPolicy for NameSimilarityPolicy {
    fn name(&self) -> &'static str {
        "name_similarity"
    }

    fn select<'c>(
        &self,
        record: &BusinessRecord,
        candidates: &'c [NearbyCandidate],
    ) -> Option<&'c NearbyCandidate> {
        candidates.iter().find(|c| {
            c.name
                .as_deref()
                .map(|name| name_similarity(&record.name, name) >= self.min_similarity)
                .unwrap_or(false)
        })
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .trim()
        .replace('&', "and")
        .replace(['-', '_', '\''], " ")
}

/// Token Jaccard similarity of two names after normalization (0.0 to 1.0)
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a == b {
        return 1.0;
    }

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 1.0;
    }
    tokens_a.intersection(&tokens_b).count() as f64 / union as f64
}

/// Unweighted mean of the two ratings, rounded to two decimals
pub fn blend_rating(primary: f64, secondary: f64) -> f64 {
    (((primary + secondary) / 2.0) * 100.0).round() / 100.0
}

/// The merged view of a matched pair: the secondary source's name, rating,
/// types and coordinates on the primary record's id and address.
pub fn merge_record(primary: &BusinessRecord, details: &PlaceDetails, blended: f64) -> BusinessRecord {
    BusinessRecord {
        id: primary.id,
        name: details.name.clone(),
        rating: details.rating,
        avg_rating: Some(blended),
        review_count: None,
        address: primary.address.clone(),
        city: primary.city.clone(),
        state: primary.state.clone(),
        latitude: details.latitude,
        longitude: details.longitude,
        price: None,
        categories: details.types.clone(),
        source_count: 2,
    }
}

/// Output of matching one city's primary records against the secondary source
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub secondary: Vec<BusinessRecord>,
    pub secondary_tally: CategoryTally,
}

pub struct Reconciler {
    places: GooglePlacesClient,
    policy: Box<dyn MatchPolicy>,
}

impl Reconciler {
    pub fn new(places: GooglePlacesClient) -> Self {
        Self::with_policy(places, Box::new(NearestNeighborPolicy))
    }

    pub fn with_policy(places: GooglePlacesClient, policy: Box<dyn MatchPolicy>) -> Self {
        Self { places, policy }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Look up every primary record in the secondary source, in order.
    ///
    /// Matched records get their blended rating and `source_count = 2`; unmatched
    /// ones are left untouched and contribute nothing to the secondary output.
    pub fn reconcile(
        &self,
        fetcher: &mut CachedFetcher<'_>,
        primary: &mut [BusinessRecord],
    ) -> Result<Reconciliation> {
        let mut out = Reconciliation::default();

        for record in primary.iter_mut() {
            let candidates =
                self.places
                    .find_nearby(fetcher, record.latitude, record.longitude, &record.name)?;

            let Some(candidate) = self.policy.select(record, &candidates) else {
                debug!(id = record.id, name = %record.name, "No candidate selected");
                crate::observability::metrics::reconcile::unmatched();
                continue;
            };

            let Some(details) = self.places.fetch_details(fetcher, &candidate.place_id)? else {
                debug!(id = record.id, place_id = %candidate.place_id, "Candidate has no usable details");
                crate::observability::metrics::reconcile::unmatched();
                continue;
            };

            let blended = blend_rating(record.rating, details.rating);
            record.avg_rating = Some(blended);
            record.source_count = 2;

            debug!(
                id = record.id,
                primary = %record.name,
                secondary = %details.name,
                blended,
                "Matched record"
            );
            crate::observability::metrics::reconcile::matched();

            out.secondary_tally.record(&details.types);
            out.secondary.push(merge_record(record, &details, blended));
        }

        info!(
            policy = self.policy.name(),
            primary = primary.len(),
            matched = out.secondary.len(),
            "Reconciliation finished"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RequestCache;
    use crate::common::constants::{PLACES_DETAILS_ENDPOINT, PLACES_NEARBY_ENDPOINT};
    use crate::test_support::{param, FakeHttp};
    use serde_json::json;
    use tempfile::tempdir;

    fn record(id: usize, name: &str, rating: f64) -> BusinessRecord {
        BusinessRecord {
            id,
            name: name.to_string(),
            rating,
            avg_rating: None,
            review_count: Some(10),
            address: format!("{} Main St", id),
            city: "Ann Arbor".to_string(),
            state: "MI".to_string(),
            latitude: 42.0 + id as f64 / 100.0,
            longitude: -83.0,
            price: Some("$$".to_string()),
            categories: vec!["Bars".to_string()],
            source_count: 1,
        }
    }

    fn candidate(id: &str, name: &str) -> NearbyCandidate {
        NearbyCandidate {
            place_id: id.to_string(),
            name: Some(name.to_string()),
        }
    }

    #[test]
    fn test_blend_rating() {
        assert_eq!(blend_rating(4.5, 4.6), 4.55);
        assert_eq!(blend_rating(4.0, 4.3), 4.15);
        assert_eq!(blend_rating(4.0, 4.5), 4.25);
        assert_eq!(blend_rating(3.0, 3.0), 3.0);
    }

    #[test]
    fn test_nearest_policy_takes_first_candidate_only() {
        let r = record(0, "Poke Fish", 4.5);
        let candidates = vec![candidate("a", "Totally Different"), candidate("b", "Poke Fish")];

        let chosen = NearestNeighborPolicy.select(&r, &candidates).unwrap();
        assert_eq!(chosen.place_id, "a");
        assert!(NearestNeighborPolicy.select(&r, &[]).is_none());
    }

    #[test]
    fn test_name_similarity_policy_skips_unrelated_neighbors() {
        let r = record(0, "Poke Fish", 4.5);
        let candidates = vec![candidate("a", "Shell Station"), candidate("b", "Poke fish sushi")];

        let chosen = NameSimilarityPolicy::new(0.5).select(&r, &candidates).unwrap();
        assert_eq!(chosen.place_id, "b");
        assert!(NameSimilarityPolicy::new(0.9).select(&r, &candidates).is_none());
    }

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("Isalita", "isalita"), 1.0);
        assert_eq!(name_similarity("Mikette Bistro & Bar", "mikette bistro and bar"), 1.0);
        assert!((name_similarity("Poke Fish", "Poke fish sushi") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(name_similarity("Zingerman's", "Frita Batidos"), 0.0);
    }

    #[test]
    fn test_merge_record_fields() {
        let primary = record(3, "Poke Fish", 4.5);
        let details = PlaceDetails {
            place_id: "p".to_string(),
            name: "Poke fish sushi".to_string(),
            rating: 4.6,
            latitude: 42.2597,
            longitude: -83.689106,
            types: vec!["restaurant".to_string(), "food".to_string()],
        };

        let merged = merge_record(&primary, &details, 4.55);
        assert_eq!(merged.id, 3);
        assert_eq!(merged.name, "Poke fish sushi");
        assert_eq!(merged.rating, 4.6);
        assert_eq!(merged.avg_rating, Some(4.55));
        assert_eq!(merged.address, primary.address);
        assert_eq!(merged.city, "Ann Arbor");
        assert_eq!(merged.longitude, -83.689106);
        assert_eq!(merged.review_count, None);
        assert_eq!(merged.price, None);
        assert_eq!(merged.categories, vec!["restaurant", "food"]);
    }

    #[test]
    fn test_reconcile_matches_and_skips() {
        let dir = tempdir().unwrap();
        // Record 0 matches; record 1's nearest place has no details; record 2 has no neighbors
        let http = FakeHttp::new(|req| {
            if req.endpoint == PLACES_NEARBY_ENDPOINT {
                return Ok(match param(req, "keyword") {
                    Some("Poke+Fish") => json!({"status": "OK", "results": [
                        {"place_id": "poke", "name": "Poke fish sushi"},
                        {"place_id": "other", "name": "Other"}
                    ]}),
                    Some("Closed+Diner") => json!({"status": "OK", "results": [
                        {"place_id": "closed", "name": "Closed Diner"}
                    ]}),
                    _ => json!({"status": "ZERO_RESULTS", "results": []}),
                });
            }
            assert_eq!(req.endpoint, PLACES_DETAILS_ENDPOINT);
            Ok(match param(req, "placeid") {
                Some("poke") => json!({"status": "OK", "result": {
                    "name": "Poke fish sushi",
                    "rating": 4.6,
                    "geometry": {"location": {"lat": 42.2597, "lng": -83.689106}},
                    "types": ["restaurant", "food"]
                }}),
                _ => json!({"status": "NOT_FOUND"}),
            })
        });
        let mut cache = RequestCache::load(dir.path().join("cache.json"));
        let mut fetcher = CachedFetcher::new(&mut cache, &http);

        let mut primary = vec![
            record(0, "Poke Fish", 4.5),
            record(1, "Closed Diner", 3.5),
            record(2, "Lonely Cafe", 4.0),
        ];
        let reconciler = Reconciler::new(GooglePlacesClient::new("k"));
        let out = reconciler.reconcile(&mut fetcher, &mut primary).unwrap();

        assert_eq!(primary[0].avg_rating, Some(4.55));
        assert_eq!(primary[0].source_count, 2);

        for unmatched in &primary[1..] {
            assert_eq!(unmatched.avg_rating, None);
            assert_eq!(unmatched.source_count, 1);
        }

        assert_eq!(out.secondary.len(), 1);
        assert_eq!(out.secondary[0].id, 0);
        assert_eq!(out.secondary[0].name, "Poke fish sushi");
        assert_eq!(out.secondary_tally.count("restaurant"), 1);
        assert_eq!(out.secondary_tally.count("food"), 1);

        // Only the first-ranked candidate's details were requested
        let detail_lookups: Vec<String> = http
            .requests()
            .iter()
            .filter(|r| r.endpoint == PLACES_DETAILS_ENDPOINT)
            .filter_map(|r| param(r, "placeid").map(str::to_string))
            .collect();
        assert_eq!(detail_lookups, vec!["poke", "closed"]);
    }
}
