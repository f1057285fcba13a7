use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub public_rps: u32,
    pub admin_rps: u32,
    pub uploads_dir: String,
    pub public_base_url: Url,
    pub max_avatar_bytes: usize,
    pub maintenance_cron: String,
    pub log_format: LogFormat,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

const DEFAULT_MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_MAINTENANCE_CRON: &str = "0 */10 * * * *";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let public_base_url = get_env_or("PUBLIC_BASE_URL", "http://localhost:8080");
        let public_base_url = Url::parse(&public_base_url)
            .map_err(|e| Error::Config(format!("Invalid value for PUBLIC_BASE_URL: {}", e)))?;

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            admin_rps: get_env_parse_or("ADMIN_RPS", 100)?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
            public_base_url,
            max_avatar_bytes: get_env_parse_or("MAX_AVATAR_BYTES", DEFAULT_MAX_AVATAR_BYTES)?,
            maintenance_cron: get_env_or("MAINTENANCE_CRON", DEFAULT_MAINTENANCE_CRON),
            log_format: parse_log_format(&get_env_or("LOG_FORMAT", "text")),
            cors_origins: parse_list(&get_env_or("CORS_ORIGINS", "")),
        })
    }
}

fn parse_log_format(raw: &str) -> LogFormat {
    if raw.trim().eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_accepts_json_in_any_case() {
        assert_eq!(parse_log_format("JSON"), LogFormat::Json);
        assert_eq!(parse_log_format(" json "), LogFormat::Json);
        assert_eq!(parse_log_format("pretty"), LogFormat::Text);
    }

    #[test]
    fn origin_list_skips_blanks() {
        assert_eq!(
            parse_list("https://a.test, ,https://b.test,"),
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u32>("PUBLIC_RPS", "fast").unwrap_err();
        assert!(err.to_string().contains("PUBLIC_RPS"));
        assert_eq!(parse_value::<u32>("PUBLIC_RPS", " 25 ").unwrap(), 25);
    }
}
