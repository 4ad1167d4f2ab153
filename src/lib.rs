pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::ports::TransactionRepository;

#[derive(Clone)]
pub struct AppState {
    pub transactions: Arc<dyn TransactionRepository>,
    pub app_env: String,
}

impl AppState {
    pub fn new(transactions: Arc<dyn TransactionRepository>, app_env: impl Into<String>) -> Self {
        Self {
            transactions,
            app_env: app_env.into(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    use handlers::transactions;

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
