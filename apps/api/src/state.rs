use sqlx::SqlitePool;

use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
/// The pool is the only cross-request state; handlers check out a connection each.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}
