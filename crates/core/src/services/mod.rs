pub mod logo_service;
pub mod portfolio_service;
pub mod price_service;
pub mod rebalancing_service;
pub mod request_service;
pub mod transaction_service;
