use crate::error::{Result, ServiceError};
use forecast_engine::engine::DEFAULT_SERIES_ID;
use forecast_engine::source::FredClient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub fred: FredConfig,
    pub email: EmailConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FredConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub series_id: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL used for unsubscribe links
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub const FORECAST_FILE: &'static str = "latest_forecast.json";
    pub const SUBSCRIBERS_FILE: &'static str = "subscribers.json";

    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn forecast_path(&self) -> PathBuf {
        self.data_dir.join(Self::FORECAST_FILE)
    }

    pub fn subscribers_path(&self) -> PathBuf {
        self.data_dir.join(Self::SUBSCRIBERS_FILE)
    }
}

impl ServiceConfig {
    /// Read the configuration from process environment variables.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let host = or("HOST", "0.0.0.0");
        let port = parse_or(&var, "PORT", 5000u16)?;
        let public_url = var("PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{}", port));

        let user = var("EMAIL_USER");
        let from = var("EMAIL_FROM").or_else(|| user.clone());

        Ok(Self {
            fred: FredConfig {
                api_key: var("FRED_API_KEY"),
                base_url: or("FRED_BASE_URL", FredClient::DEFAULT_BASE_URL),
                series_id: or("SERIES_ID", DEFAULT_SERIES_ID),
                timeout_secs: parse_or(&var, "HTTP_TIMEOUT_SECS", 30u64)?,
            },
            email: EmailConfig {
                host: or("EMAIL_HOST", "smtp.gmail.com"),
                port: parse_or(&var, "EMAIL_PORT", 587u16)?,
                user,
                password: var("EMAIL_PASSWORD"),
                from,
            },
            server: ServerConfig {
                host,
                port,
                public_url: public_url.trim_end_matches('/').to_string(),
            },
            storage: StorageConfig::new(or("DATA_DIR", "data")),
        })
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// FRED client configured from this config
    pub fn fred_client(&self) -> FredClient {
        FredClient::new(self.fred.api_key.clone())
            .with_base_url(self.fred.base_url.clone())
            .with_timeout(Duration::from_secs(self.fred.timeout_secs))
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ServiceError::Configuration(format!("{} must be a number, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
