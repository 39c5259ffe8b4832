// Market data domain
pub mod quote;
pub mod series;
