pub mod traits;

// Upstream implementations
pub mod coingecko;
pub mod proxy;
