use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://resumes.db";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub cors_origin: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
            cors_origin: or_default("CORS_ORIGIN", DEFAULT_CORS_ORIGIN),
            port: or_default("PORT", "8000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", "10")
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}
