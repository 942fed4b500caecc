use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    /// `None` runs the ledger on the in-memory store
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Offset used to decide which calendar day a punch belongs to
    pub attendance_offset: FixedOffset,
    pub admin_webhook_url: Option<String>,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let offset_minutes: i32 = parse_or("ATTENDANCE_UTC_OFFSET_MINUTES", 0)?;
        let attendance_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            anyhow!("ATTENDANCE_UTC_OFFSET_MINUTES out of range: {offset_minutes}")
        })?;

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: non_empty("DATABASE_URL"),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            attendance_offset,
            admin_webhook_url: non_empty("ADMIN_WEBHOOK_URL"),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", tracing::Level::DEBUG)?,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}
