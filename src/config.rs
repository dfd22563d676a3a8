use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 900_000;
const DEFAULT_TRANSACTION_TIMEOUT_MINUTES: i64 = 45;
const DEFAULT_LOOKBACK_HOURS: i64 = 24;
const MAX_TRANSACTION_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;
const MAX_LOOKBACK_HOURS: i64 = 30 * 24;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Course management (activation code cancellation)
    pub cancel_course_url: String,

    // Marketplace order/user API
    pub magento_api_url: String,
    pub magento_access_token: Secret<String>,

    // CRM (C3 contacts)
    pub marol_api_url: String,
    pub marol_api_key: Secret<String>,

    // Contact synchronization service
    pub bifrost_api_url: String,

    // Reconciliation schedule
    pub reconcile_interval_ms: u64,
    pub transaction_timeout_minutes: i64,
    pub lookback_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Self::from_config(&config)
    }

    pub fn from_config(config: &config::Config) -> Result<Self, config::ConfigError> {
        let parsed = Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            cancel_course_url: config.get("cancel_course_url")?,

            magento_api_url: config.get("magento_api_url")?,
            magento_access_token: Secret::new(config.get("magento_access_token")?),

            marol_api_url: config.get("marol_api_url")?,
            marol_api_key: Secret::new(config.get("marol_api_key")?),

            bifrost_api_url: config.get("bifrost_api_url")?,

            reconcile_interval_ms: config
                .get("reconcile_interval_ms")
                .unwrap_or(DEFAULT_RECONCILE_INTERVAL_MS),
            transaction_timeout_minutes: config
                .get("transaction_timeout_minutes")
                .unwrap_or(DEFAULT_TRANSACTION_TIMEOUT_MINUTES),
            lookback_hours: config
                .get("lookback_hours")
                .unwrap_or(DEFAULT_LOOKBACK_HOURS),
        };

        for (key, value) in [
            ("cancel_course_url", &parsed.cancel_course_url),
            ("magento_api_url", &parsed.magento_api_url),
            ("marol_api_url", &parsed.marol_api_url),
            ("bifrost_api_url", &parsed.bifrost_api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| config::ConfigError::Message(format!("{}: invalid URL: {}", key, e)))?;
        }

        if parsed.reconcile_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "reconcile_interval_ms must be greater than zero".to_string(),
            ));
        }

        ensure_in_range(
            "transaction_timeout_minutes",
            parsed.transaction_timeout_minutes,
            MAX_TRANSACTION_TIMEOUT_MINUTES,
        )?;
        ensure_in_range("lookback_hours", parsed.lookback_hours, MAX_LOOKBACK_HOURS)?;

        Ok(parsed)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn transaction_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.transaction_timeout_minutes)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lookback_hours)
    }
}

fn ensure_in_range(key: &str, value: i64, max: i64) -> Result<(), config::ConfigError> {
    if value <= 0 || value > max {
        return Err(config::ConfigError::Message(format!(
            "{} must be between 1 and {}, got {}",
            key, max, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn builder() -> config::builder::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("database_url", "postgres://localhost/epayment")
            .unwrap()
            .set_override("port", 8080)
            .unwrap()
            .set_override("cancel_course_url", "http://courses.local/api/cancel")
            .unwrap()
            .set_override("magento_api_url", "http://magento.local/api")
            .unwrap()
            .set_override("magento_access_token", "magento-token")
            .unwrap()
            .set_override("marol_api_url", "http://marol.local")
            .unwrap()
            .set_override("marol_api_key", "marol-key")
            .unwrap()
            .set_override("bifrost_api_url", "http://bifrost.local")
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_config(&builder().build().unwrap()).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.reconcile_interval(), Duration::from_millis(900_000));
        assert_eq!(config.transaction_timeout(), chrono::Duration::minutes(45));
        assert_eq!(config.lookback(), chrono::Duration::hours(24));
        assert_eq!(config.magento_access_token.expose_secret(), "magento-token");
    }

    #[test]
    fn test_overrides_schedule() {
        let config = Config::from_config(
            &builder()
                .set_override("reconcile_interval_ms", 60_000)
                .unwrap()
                .set_override("transaction_timeout_minutes", 30)
                .unwrap()
                .build()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.reconcile_interval(), Duration::from_secs(60));
        assert_eq!(config.transaction_timeout(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_rejects_invalid_url() {
        let result = Config::from_config(
            &builder()
                .set_override("cancel_course_url", "not a url")
                .unwrap()
                .build()
                .unwrap(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        for minutes in [0, -45] {
            let result = Config::from_config(
                &builder()
                    .set_override("transaction_timeout_minutes", minutes)
                    .unwrap()
                    .build()
                    .unwrap(),
            );

            assert!(result.is_err(), "timeout of {} minutes accepted", minutes);
        }
    }

    #[test]
    fn test_rejects_oversized_timeout() {
        let result = Config::from_config(
            &builder()
                .set_override("transaction_timeout_minutes", i64::MAX)
                .unwrap()
                .build()
                .unwrap(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_lookback_bounds() {
        for (hours, accepted) in [(0, false), (-1, false), (720, true), (721, false)] {
            let result = Config::from_config(
                &builder()
                    .set_override("lookback_hours", hours)
                    .unwrap()
                    .build()
                    .unwrap(),
            );

            assert_eq!(result.is_ok(), accepted, "lookback of {} hours", hours);
        }
    }

    #[test]
    fn test_missing_required_key() {
        let config = config::Config::builder()
            .set_override("port", 8080)
            .unwrap()
            .build()
            .unwrap();

        assert!(Config::from_config(&config).is_err());
    }
}
