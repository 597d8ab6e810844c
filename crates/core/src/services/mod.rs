pub mod aggregation_service;
pub mod category_service;
pub mod market_store;
pub mod portfolio_service;
pub mod push_worker;
pub mod simulation;
