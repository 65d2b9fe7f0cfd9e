//! Simple metrics module for the food aggregator
//!
//! Records through the `metrics` facade using Prometheus naming conventions.
//! `init_metrics` installs an in-process Prometheus recorder; `render` returns the
//! current snapshot in text exposition format.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = HANDLE.set(handle);
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Snapshot of every recorded metric, or `None` before `init_metrics`
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Current value of an unlabelled counter in the rendered snapshot
pub fn counter_value(name: MetricName) -> Option<u64> {
    let snapshot = render()?;
    snapshot.lines().find_map(|line| {
        let (metric, value) = line.split_once(' ')?;
        if metric == name.as_str() {
            value.trim().parse::<f64>().ok().map(|v| v as u64)
        } else {
            None
        }
    })
}

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Request cache
    CacheHits,
    CacheMisses,
    CacheLoadFailures,
    CachePersists,

    // Upstream sources
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestDuration,

    // Reconciliation
    ReconcileMatched,
    ReconcileUnmatched,

    // Aggregate pipeline
    PipelineCitiesCollected,
    PipelineCitiesNoData,
    PipelineRecordsCollected,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::CacheHits => "food_cache_hits_total",
            MetricName::CacheMisses => "food_cache_misses_total",
            MetricName::CacheLoadFailures => "food_cache_load_failures_total",
            MetricName::CachePersists => "food_cache_persists_total",

            MetricName::SourcesRequestsSuccess => "food_sources_requests_success_total",
            MetricName::SourcesRequestsError => "food_sources_requests_error_total",
            MetricName::SourcesRequestDuration => "food_sources_request_duration_seconds",

            MetricName::ReconcileMatched => "food_reconcile_matched_total",
            MetricName::ReconcileUnmatched => "food_reconcile_unmatched_total",

            MetricName::PipelineCitiesCollected => "food_pipeline_cities_collected_total",
            MetricName::PipelineCitiesNoData => "food_pipeline_cities_no_data_total",
            MetricName::PipelineRecordsCollected => "food_pipeline_records_collected",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn emit_counter(name: MetricName, value: u64) {
    ::metrics::counter!(name.as_str()).increment(value);
}

pub fn emit_histogram(name: MetricName, value: f64) {
    ::metrics::histogram!(name.as_str()).record(value);
}

pub mod cache {
    use super::{emit_counter, MetricName};

    pub fn hit() {
        emit_counter(MetricName::CacheHits, 1);
    }

    pub fn miss() {
        emit_counter(MetricName::CacheMisses, 1);
    }

    /// The persisted document was unreadable and the cache started cold
    pub fn load_failed() {
        emit_counter(MetricName::CacheLoadFailures, 1);
    }

    pub fn persisted() {
        emit_counter(MetricName::CachePersists, 1);
    }
}

pub mod sources {
    use super::{emit_counter, emit_histogram, MetricName};

    pub fn request_success() {
        emit_counter(MetricName::SourcesRequestsSuccess, 1);
    }

    pub fn request_error() {
        emit_counter(MetricName::SourcesRequestsError, 1);
    }

    pub fn request_duration(secs: f64) {
        emit_histogram(MetricName::SourcesRequestDuration, secs);
    }
}

pub mod reconcile {
    use super::{emit_counter, MetricName};

    pub fn matched() {
        emit_counter(MetricName::ReconcileMatched, 1);
    }

    pub fn unmatched() {
        emit_counter(MetricName::ReconcileUnmatched, 1);
    }
}

pub mod pipeline {
    use super::{emit_counter, emit_histogram, MetricName};

    pub fn city_collected(primary_records: usize) {
        emit_counter(MetricName::PipelineCitiesCollected, 1);
        emit_histogram(MetricName::PipelineRecordsCollected, primary_records as f64);
    }

    pub fn city_no_data() {
        emit_counter(MetricName::PipelineCitiesNoData, 1);
    }
}
