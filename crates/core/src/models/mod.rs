pub mod cache;
pub mod chain;
pub mod portfolio;
pub mod rebalancing;
pub mod settings;
pub mod state;
pub mod token;
pub mod transaction;
pub mod upstream;
