//! Environment-driven configuration.
//!
//! Required:
//! - `DATABASE_URL` - PostgreSQL connection string
//!
//! Optional:
//! - `PORT` - listen port (default 8083)
//! - `NATS_URL` - enable domain-event publication when set
//! - `MERCATO_TAX_RATE` - tax rate as a fraction (default 0.10)
//! - `MERCATO_SHIPPING_STANDARD` - standard shipping fee (default 10.00)
//! - `MERCATO_SHIPPING_EXPRESS` - express shipping fee (default 20.00)
//! - `MERCATO_FREE_SHIPPING_THRESHOLD` - subtotal for free standard shipping
//!   (default 100.00)

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::pricing::Pricing;
use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub pricing: Pricing,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => 8083,
        };

        let defaults = Pricing::default();
        let pricing = Pricing {
            tax_rate: decimal_var("MERCATO_TAX_RATE", defaults.tax_rate)?,
            standard_fee: decimal_var("MERCATO_SHIPPING_STANDARD", defaults.standard_fee)?,
            express_fee: decimal_var("MERCATO_SHIPPING_EXPRESS", defaults.express_fee)?,
            free_shipping_threshold: decimal_var(
                "MERCATO_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
        };

        Ok(Self {
            database_url,
            port,
            nats_url: std::env::var("NATS_URL").ok(),
            pricing,
        })
    }
}

fn decimal_var(name: &str, default: Decimal) -> Result<Decimal> {
    match std::env::var(name) {
        Ok(raw) => Decimal::from_str(raw.trim())
            .map_err(|_| Error::Config(format!("{name} is not a valid decimal: {raw}"))),
        Err(_) => Ok(default),
    }
}
