use crate::common::constants::{
    DEFAULT_CACHE_PATH, DEFAULT_CONFIG_PATH, DEFAULT_DATABASE_PATH, DEFAULT_TOP_CATEGORIES,
    GOOGLE_PLACES_KEY_VAR, PLACES_DETAILS_ENDPOINT, PLACES_NEARBY_ENDPOINT, YELP_API_KEY_VAR,
    YELP_SEARCH_ENDPOINT, YELP_SEARCH_TERM,
};
use crate::common::error::{AggregatorError, Result};
use crate::pipeline::{MatchPolicy, NameSimilarityPolicy, NearestNeighborPolicy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache_path: PathBuf,
    pub database_path: PathBuf,
    pub top_categories: usize,
    pub request_timeout_secs: u64,
    pub yelp: YelpConfig,
    pub places: PlacesConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YelpConfig {
    pub endpoint: String,
    pub term: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub nearby_endpoint: String,
    pub details_endpoint: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub policy: MatchPolicyKind,
    /// Only used by the name similarity policy
    pub min_name_similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicyKind {
    Nearest,
    NameSimilarity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            top_categories: DEFAULT_TOP_CATEGORIES,
            request_timeout_secs: 30,
            yelp: YelpConfig::default(),
            places: PlacesConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

impl Default for YelpConfig {
    fn default() -> Self {
        Self {
            endpoint: YELP_SEARCH_ENDPOINT.to_string(),
            term: YELP_SEARCH_TERM.to_string(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            nearby_endpoint: PLACES_NEARBY_ENDPOINT.to_string(),
            details_endpoint: PLACES_DETAILS_ENDPOINT.to_string(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            policy: MatchPolicyKind::Nearest,
            min_name_similarity: 0.5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// A missing file means defaults; an unreadable or invalid one is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            AggregatorError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_categories == 0 {
            return Err(AggregatorError::Config(
                "top_categories must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.matching.min_name_similarity) {
            return Err(AggregatorError::Config(format!(
                "matching.min_name_similarity must be within 0..=1, got {}",
                self.matching.min_name_similarity
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn match_policy(&self) -> Box<dyn MatchPolicy> {
        match self.matching.policy {
            MatchPolicyKind::Nearest => Box::new(NearestNeighborPolicy),
            MatchPolicyKind::NameSimilarity => {
                Box::new(NameSimilarityPolicy::new(self.matching.min_name_similarity))
            }
        }
    }
}

/// API keys for both sources, taken from the environment
#[derive(Clone)]
pub struct Credentials {
    pub yelp_api_key: String,
    pub google_places_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            yelp_api_key: required_var(YELP_API_KEY_VAR)?,
            google_places_key: required_var(GOOGLE_PLACES_KEY_VAR)?,
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|e| AggregatorError::Config(format!("{} is not available: {}", name, e)))
}
