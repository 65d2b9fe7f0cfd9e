use std::collections::HashMap;

/// One restaurant observation from one source
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessRecord {
    /// Zero-based position in the primary search response. Merged secondary
    /// records carry the id of the primary record they matched.
    pub id: usize,
    pub name: String,
    pub rating: f64,
    /// Blended rating, set once a counterpart is found in the other source
    pub avg_rating: Option<f64>,
    pub review_count: Option<u32>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub price: Option<String>,
    pub categories: Vec<String>,
    /// 1 while unmatched, 2 once matched to the other source
    pub source_count: u8,
}

impl BusinessRecord {
    pub fn is_matched(&self) -> bool {
        self.source_count >= 2
    }
}

/// Frequency of category labels across one source's records in one run.
///
/// `most_common` orders by descending count and breaks ties by first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    counts: HashMap<String, usize>,
    first_seen: Vec<String>,
}

impl CategoryTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let label = label.as_ref();
            match self.counts.get_mut(label) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(label.to_string(), 1);
                    self.first_seen.push(label.to_string());
                }
            }
        }
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn most_common(&self, k: usize) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .first_seen
            .iter()
            .map(|label| (label.clone(), self.count(label)))
            .collect();
        // Stable sort keeps first-seen order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

/// Everything one city run produces, handed to storage as a unit
#[derive(Debug, Clone)]
pub struct CityData {
    pub city: String,
    pub primary: Vec<BusinessRecord>,
    pub secondary: Vec<BusinessRecord>,
    pub primary_tally: CategoryTally,
    pub secondary_tally: CategoryTally,
}

impl CityData {
    pub fn matched_count(&self) -> usize {
        self.primary.iter().filter(|r| r.is_matched()).count()
    }
}

/// Result of running the pipeline for a city
#[derive(Debug, Clone)]
pub enum CityOutcome {
    Collected(CityData),
    /// The primary source has no businesses for the city. Expected, not a fault.
    NoData,
}
