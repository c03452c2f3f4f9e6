pub mod alphavantage;
pub mod finmind;
pub mod fmp;
pub mod market_router;
pub mod price_provider;
