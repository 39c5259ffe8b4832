// Quote retrieval with endpoint failover
pub mod market_data;

// Classifiers
pub mod ml;

// Sample admission
pub mod sampler;

// Cycle orchestrator
pub mod pipeline;

// Wiring and run loop
pub mod system;
