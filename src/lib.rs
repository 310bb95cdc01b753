pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
#[cfg(test)]
mod test_support;
pub mod utils;

pub use state::AppState;
