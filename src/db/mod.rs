pub mod crm_repository;
#[cfg(test)]
pub mod mock_db;
pub mod postgres_crm_repository;
pub mod postgres_refresh_token_store;
pub mod postgres_user_repository;
pub mod user_repository;
