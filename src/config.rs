// Application configuration loaded from the environment (.env supported via dotenv)

use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Outbound payment gateway settings; absent when no gateway is configured
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub callback_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OutboxConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub batch_size: i64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 5,
            retry_base: Duration::from_secs(10),
            batch_size: 20,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub notification_webhook_url: Option<String>,
    pub gateway: Option<GatewayConfig>,
    pub payment_webhook_secret: Option<String>,
    pub invoice_service_url: Option<String>,
    pub outbox: OutboxConfig,
    pub policy_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway = match optional("PAYMENT_GATEWAY_URL") {
            Some(base_url) => Some(GatewayConfig {
                base_url,
                key_id: required("PAYMENT_GATEWAY_KEY_ID")?,
                key_secret: required("PAYMENT_GATEWAY_KEY_SECRET")?,
                callback_url: optional("PAYMENT_CALLBACK_URL"),
            }),
            None => None,
        };

        let outbox_defaults = OutboxConfig::default();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 8080)?,
            jwt_secret: required("JWT_SECRET")?,
            notification_webhook_url: optional("NOTIFICATION_WEBHOOK_URL"),
            gateway,
            payment_webhook_secret: optional("PAYMENT_WEBHOOK_SECRET"),
            invoice_service_url: optional("INVOICE_SERVICE_URL"),
            outbox: OutboxConfig {
                poll_interval: Duration::from_secs(parsed("OUTBOX_POLL_INTERVAL_SECS", 5)?),
                max_attempts: parsed("OUTBOX_MAX_ATTEMPTS", outbox_defaults.max_attempts)?,
                retry_base: Duration::from_secs(parsed("OUTBOX_RETRY_BASE_SECS", 10)?),
                batch_size: outbox_defaults.batch_size,
            },
            policy_cache_ttl: Duration::from_secs(parsed("POLICY_CACHE_TTL_SECS", 60)?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_defaults() {
        let config = OutboxConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_base, Duration::from_secs(10));
    }

    #[test]
    fn test_parsed_falls_back_to_default_when_unset() {
        let value: u16 = parsed("LABBOOK_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }

    #[test]
    fn test_missing_error_names_variable() {
        let err = required("LABBOOK_TEST_UNSET_SECRET").unwrap_err();
        assert_eq!(err.to_string(), "LABBOOK_TEST_UNSET_SECRET must be set in environment");
    }
}
