// Market data retrieval
pub mod quote_fetcher;

pub use quote_fetcher::{EndpointFailure, FetchFailure, FetchOutcome, QuoteFetcher};
