// src/config.rs

use std::env;
use std::time::Duration;
use dotenvy::dotenv;

/// Number of options every authored question must carry.
pub const OPTION_COUNT: usize = 4;

/// Time limit applied when a test record has none.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 30;

/// Countdown resolution.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    pub default_time_limit_minutes: u32,
    pub tick_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_time_limit_minutes = env::var("DEFAULT_TIME_LIMIT_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_TIME_LIMIT_MINUTES);

        let tick_interval_ms = env::var("TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_TICK_INTERVAL_MS);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            default_time_limit_minutes,
            tick_interval_ms,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
