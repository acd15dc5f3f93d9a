// Application layer - Chart engine and use cases
pub mod aggregator;
pub mod chart_builder;
pub mod chart_service;
pub mod labeling;
pub mod normalizer;
pub mod palette;
pub mod run_repository;
pub mod smoothing;
pub mod streaming_service;

#[cfg(test)]
pub mod in_memory_repository;
