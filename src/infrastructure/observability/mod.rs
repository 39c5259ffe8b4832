//! Push-based observability for pricecast
//!
//! Outbound data only: a structured JSON line per cycle on stdout and a
//! Prometheus registry that is dumped as text on shutdown.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;
