use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;

/// Default primary (Super Car Valuations) endpoint.
pub const DEFAULT_SUPER_CAR_URL: &str =
    "https://run.mocky.io/v3/662b3eba-6d24-4d86-aea1-be4cc8f1cafd";
/// Default secondary (Premium Car Valuations) endpoint.
pub const DEFAULT_PREMIUM_CAR_URL: &str =
    "https://run.mocky.io/v3/1caf6b93-6e24-42b9-88fe-95405328c2a4";

/// Runtime configuration for the valuation service: upstream endpoints plus
/// breaker thresholds. Values come from `MOTORVAL_*` environment variables,
/// falling back to defaults field by field.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub super_car_url: String,
    pub premium_car_url: String,
    pub breaker: CircuitBreakerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            super_car_url: DEFAULT_SUPER_CAR_URL.to_owned(),
            premium_car_url: DEFAULT_PREMIUM_CAR_URL.to_owned(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            super_car_url: env_string("MOTORVAL_SUPERCAR_URL", DEFAULT_SUPER_CAR_URL),
            premium_car_url: env_string("MOTORVAL_PREMIUMCAR_URL", DEFAULT_PREMIUM_CAR_URL),
            breaker: CircuitBreakerConfig {
                call_timeout: Duration::from_millis(env_parsed(
                    "MOTORVAL_BREAKER_TIMEOUT_MS",
                    defaults.call_timeout.as_millis() as u64,
                )),
                error_threshold_pct: env_parsed(
                    "MOTORVAL_BREAKER_ERROR_PCT",
                    defaults.error_threshold_pct,
                ),
                reset_timeout: Duration::from_millis(env_parsed(
                    "MOTORVAL_BREAKER_RESET_MS",
                    defaults.reset_timeout.as_millis() as u64,
                )),
                volume_threshold: env_parsed(
                    "MOTORVAL_BREAKER_VOLUME",
                    defaults.volume_threshold,
                ),
                window_size: env_parsed("MOTORVAL_BREAKER_WINDOW", defaults.window_size),
            },
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_owned(),
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_breaker_contract() {
        let config = ServiceConfig::default();
        assert_eq!(config.breaker.call_timeout, Duration::from_millis(15_000));
        assert_eq!(config.breaker.error_threshold_pct, 50);
        assert_eq!(config.breaker.reset_timeout, Duration::from_millis(5_000));
        assert_eq!(config.breaker.volume_threshold, 5);
    }
}
