use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::report::engine::LaunchMode;

/// Application configuration loaded from environment variables.
/// Only `PUBLIC_BASE_URL` is required; missing backends degrade to
/// unconfigured stand-ins instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Origin used to build download and tracking links in emails.
    pub public_base_url: String,
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub auth: Option<AuthConfig>,
    pub smtp: Option<SmtpConfig>,
    pub render: RenderConfig,
    pub default_redirect_url: String,
    pub alert_email: Option<String>,
    pub email_daily_quota: u32,
    pub scoring_table_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub chrome_path: String,
    pub mode: LaunchMode,
    pub load_timeout: Duration,
    pub total_timeout: Duration,
}

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@ccpm360.com";
const DEFAULT_REDIRECT_URL: &str = "https://www.ccpm360.com";

/// Environment markers that mean we are running in a container or a
/// serverless runtime, where Chrome needs the sandbox-less launch path.
const SERVER_ENV_MARKERS: [&str; 4] = [
    "KUBERNETES_SERVICE_HOST",
    "AWS_LAMBDA_FUNCTION_NAME",
    "VERCEL",
    "container",
];

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let public_base_url = require_http_url(
            "PUBLIC_BASE_URL",
            require_env("PUBLIC_BASE_URL")?.trim_end_matches('/'),
        )?;
        let default_redirect_url = require_http_url(
            "DEFAULT_REDIRECT_URL",
            &optional_env("DEFAULT_REDIRECT_URL")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
        )?;

        let auth = match (optional_env("AUTH_URL"), optional_env("AUTH_SERVICE_KEY")) {
            (Some(url), Some(service_key)) => Some(AuthConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
            }),
            _ => None,
        };

        let smtp = optional_env("SMTP_HOST")
            .map(|host| -> Result<SmtpConfig> {
                Ok(SmtpConfig {
                    host,
                    port: parse_env("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                    from_address: optional_env("SMTP_FROM")
                        .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
                    user: optional_env("SMTP_USER"),
                    password: optional_env("SMTP_PASSWORD"),
                })
            })
            .transpose()?;

        let mode = match optional_env("RENDER_MODE") {
            Some(raw) => raw.parse::<LaunchMode>().map_err(anyhow::Error::msg)?,
            None if SERVER_ENV_MARKERS
                .iter()
                .any(|key| std::env::var_os(key).is_some()) =>
            {
                LaunchMode::Server
            }
            None => LaunchMode::Interactive,
        };

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            public_base_url,
            database_url: optional_env("DATABASE_URL"),
            run_migrations: parse_env("RUN_MIGRATIONS", false)?,
            auth,
            smtp,
            render: RenderConfig {
                chrome_path: optional_env("CHROME_PATH").unwrap_or_else(|| "chromium".to_string()),
                mode,
                load_timeout: Duration::from_millis(parse_env("REPORT_LOAD_TIMEOUT_MS", 15_000)?),
                total_timeout: Duration::from_millis(parse_env("REPORT_TIMEOUT_MS", 30_000)?),
            },
            default_redirect_url,
            alert_email: optional_env("ALERT_EMAIL"),
            email_daily_quota: parse_env("EMAIL_DAILY_QUOTA", 100)?,
            scoring_table_path: optional_env("SCORING_TABLE_PATH").map(PathBuf::from),
        })
    }
}

/// Links built from these values end up in emails and `Location` headers, so
/// they must be absolute http(s) URLs that are also valid header values.
fn require_http_url(key: &str, raw: &str) -> Result<String> {
    match reqwest::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => bail!("{key} must be an absolute http(s) URL"),
    }
    if axum::http::HeaderValue::from_str(raw).is_err() {
        bail!("{key} must contain only visible ASCII characters");
    }
    Ok(raw.to_string())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration for handler tests: nothing external is reachable.
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "debug".to_string(),
            public_base_url: "https://assess.example.com".to_string(),
            database_url: None,
            run_migrations: false,
            auth: None,
            smtp: None,
            render: RenderConfig {
                chrome_path: "chromium".to_string(),
                mode: LaunchMode::Interactive,
                load_timeout: Duration::from_secs(5),
                total_timeout: Duration::from_secs(10),
            },
            default_redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            alert_email: Some("ops@example.com".to_string()),
            email_daily_quota: 100,
            scoring_table_path: None,
        }
    }
}
