pub mod apis;
pub mod cache;
pub mod common;
pub mod config;
pub mod domain;
pub mod pipeline;
pub mod report;
pub mod repl;
pub mod storage;

pub mod observability;

// Layered boundaries for application ports and infrastructure adapters
pub mod app;
pub mod infra;

#[cfg(test)]
pub(crate) mod test_support;
