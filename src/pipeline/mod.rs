pub mod aggregate;
pub mod reconcile;

pub use aggregate::AggregatePipeline;
pub use reconcile::{MatchPolicy, NameSimilarityPolicy, NearestNeighborPolicy, Reconciler};
