use std::env;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutSettings,
    pub reconcile: ReconcileSettings,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub secret_key: String,
    pub base_url: String,
    /// When set, webhook bodies must carry a matching HMAC signature.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub tax_rate: BigDecimal,
    pub shipping_fee: BigDecimal,
    /// Where the gateway can reach this service.
    pub public_base_url: String,
    /// Where customers land after paying.
    pub storefront_url: String,
}

impl CheckoutSettings {
    pub fn callback_url(&self, tx_ref: &str) -> String {
        format!(
            "{}/payments/verify/{}",
            self.public_base_url.trim_end_matches('/'),
            tx_ref
        )
    }

    pub fn confirmation_url(&self, order_number: &str) -> String {
        format!(
            "{}/order-confirmation/{}",
            self.storefront_url.trim_end_matches('/'),
            order_number
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    pub interval: Duration,
    pub max_attempts: i32,
    pub batch_size: i64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_attempts: 5,
            batch_size: 50,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment (after `.env` has
    /// been loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let or_default =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let reconcile_defaults = ReconcileSettings::default();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or_default("HOST", "0.0.0.0"),
            port: parse(&lookup, "PORT", 8080)?,
            gateway: GatewayConfig {
                secret_key: required("CHAPA_SECRET_KEY")?,
                base_url: or_default("CHAPA_BASE_URL", "https://api.chapa.co/v1"),
                webhook_secret: lookup("CHAPA_WEBHOOK_SECRET").filter(|v| !v.is_empty()),
            },
            checkout: CheckoutSettings {
                currency: or_default("CURRENCY", "ETB"),
                tax_rate: parse(&lookup, "TAX_RATE", BigDecimal::from_str("0.15").unwrap_or_default())?,
                shipping_fee: parse(&lookup, "SHIPPING_FEE", BigDecimal::from(0))?,
                public_base_url: or_default("PUBLIC_BASE_URL", "http://localhost:8080"),
                storefront_url: or_default("STOREFRONT_URL", "http://localhost:3000"),
            },
            reconcile: ReconcileSettings {
                interval: Duration::from_secs(parse(
                    &lookup,
                    "RECONCILE_INTERVAL_SECS",
                    reconcile_defaults.interval.as_secs(),
                )?),
                max_attempts: parse(
                    &lookup,
                    "RECONCILE_MAX_ATTEMPTS",
                    reconcile_defaults.max_attempts,
                )?,
                batch_size: reconcile_defaults.batch_size,
            },
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
