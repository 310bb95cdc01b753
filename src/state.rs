use std::sync::Arc;

use crate::db::{crm_repository::CrmRepository, user_repository::UserRepository};
use crate::services::token_service::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn UserRepository>,
    pub crm: Arc<dyn CrmRepository>,
    pub tokens: Arc<TokenService>,
}
