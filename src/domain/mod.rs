// Market data domain (samples, series, quotes)
pub mod market;

// Feature and label construction
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
