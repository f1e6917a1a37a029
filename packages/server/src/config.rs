use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            dispatch: DispatchConfig::from_env(),
        })
    }
}

/// Tuning knobs for the wave dispatcher.
///
/// Defaults match the production dispatch policy: batches of 3 vendors,
/// a 30 second response window per wave, and +5 km radius expansion up to
/// a 25 km ceiling before the cycle is declared exhausted.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Vendors offered per wave
    pub batch_size: usize,
    /// How long a batch may respond before escalation
    pub response_window: Duration,
    /// Search radius a new booking starts with
    pub initial_radius_km: f64,
    /// Radius added when a wave exhausts every batch
    pub radius_increment_km: f64,
    /// Ceiling on radius expansion; beyond it the cycle is exhausted
    pub max_radius_km: f64,
    /// Age after which an in-flight dispatch counts as abandoned and is
    /// picked up by the recovery sweep
    pub stale_after: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            response_window: Duration::from_secs(30),
            initial_radius_km: 5.0,
            radius_increment_km: 5.0,
            max_radius_km: 25.0,
            stale_after: Duration::from_secs(90),
        }
    }
}

impl DispatchConfig {
    /// Load dispatch tuning from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_or("DISPATCH_BATCH_SIZE", defaults.batch_size),
            response_window: Duration::from_secs(env_or(
                "DISPATCH_RESPONSE_WINDOW_SECS",
                defaults.response_window.as_secs(),
            )),
            initial_radius_km: env_or("DISPATCH_INITIAL_RADIUS_KM", defaults.initial_radius_km),
            radius_increment_km: env_or(
                "DISPATCH_RADIUS_INCREMENT_KM",
                defaults.radius_increment_km,
            ),
            max_radius_km: env_or("DISPATCH_MAX_RADIUS_KM", defaults.max_radius_km),
            stale_after: Duration::from_secs(env_or(
                "DISPATCH_STALE_AFTER_SECS",
                defaults.stale_after.as_secs(),
            )),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.response_window, Duration::from_secs(30));
        assert_eq!(config.initial_radius_km, 5.0);
        assert_eq!(config.radius_increment_km, 5.0);
        assert_eq!(config.max_radius_km, 25.0);
    }
}
