/// Source names used in logs, metrics and the store's category tables

pub const YELP_SOURCE: &str = "yelp";
pub const GOOGLE_PLACES_SOURCE: &str = "google_places";

// Default endpoints
pub const YELP_SEARCH_ENDPOINT: &str = "https://api.yelp.com/v3/businesses/search";
pub const PLACES_NEARBY_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
pub const PLACES_DETAILS_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/details/json";

pub const YELP_SEARCH_TERM: &str = "restaurant";

/// Status value Google Places reports for a usable response
pub const PLACES_STATUS_OK: &str = "OK";

// Credentials are read from the environment (after dotenv)
pub const YELP_API_KEY_VAR: &str = "YELP_API_KEY";
pub const GOOGLE_PLACES_KEY_VAR: &str = "GOOGLE_PLACES_KEY";

// Local files
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_CACHE_PATH: &str = "food_cache.json";
pub const DEFAULT_DATABASE_PATH: &str = "food.db";

/// How many categories the reports look at
pub const DEFAULT_TOP_CATEGORIES: usize = 10;
