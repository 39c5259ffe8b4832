pub mod p2p;
pub mod spot;

pub use p2p::BinanceP2pQuoteSource;
pub use spot::BinanceSpotQuoteSource;
