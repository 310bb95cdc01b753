pub mod aggregation;
pub mod authorization;
pub mod refresh_store;
pub mod token_service;
