use std::env;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub db_max_connections: u32,
    /// Upper bound on rows accepted in a single order submission.
    pub order_max_items: usize,
    /// Second factor for the reduction-rate settlement report. `None` disables the report.
    pub settlement_password: Option<String>,
    pub business_utc_offset_hours: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("APP_PORT", 3000);
        let settlement_password = env::var("SETTLEMENT_SECRET_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty());
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours: env_parse("JWT_TTL_HOURS", 24),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            order_max_items: env_parse("ORDER_MAX_ITEMS", 1000),
            settlement_password,
            business_utc_offset_hours: env_parse("BUSINESS_UTC_OFFSET_HOURS", 9),
        })
    }

    /// Offset used for "today", deadlines and settlement date ranges.
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_utc_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn business_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.business_offset()).date_naive()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
