pub mod google_places;
pub mod yelp;

pub use google_places::{GooglePlacesClient, NearbyCandidate, PlaceDetails};
pub use yelp::YelpClient;
