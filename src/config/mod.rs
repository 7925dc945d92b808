//! Configuration loading for the ERP bridge.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BRIDGE_`, producing a typed [`AppConfig`]. Configuration is read once at
//! startup and shared read-only afterwards.

use std::{collections::BTreeMap, env, fmt, net::SocketAddr, path::PathBuf, time::Duration};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::handshake::TokenExchangeCredentials;

const ENV_PREFIX: &str = "BRIDGE_";
const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `BRIDGE_*` environment variables.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuvemshop_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nuvemshop_client_secret: Option<String>,
    #[serde(default = "default_nuvemshop_token_url")]
    pub nuvemshop_token_url: String,
    #[serde(default = "default_token_exchange_timeout_ms")]
    pub token_exchange_timeout_ms: u64,
    #[serde(default = "default_http_user_agent")]
    pub http_user_agent: String,
    #[serde(default = "default_app_index_path")]
    pub app_index_path: PathBuf,
    #[serde(default = "default_store_home_url")]
    pub store_home_url: String,
    #[serde(default = "default_admin_url")]
    pub admin_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            crypto_key: None,
            nuvemshop_client_id: None,
            nuvemshop_client_secret: None,
            nuvemshop_token_url: default_nuvemshop_token_url(),
            token_exchange_timeout_ms: default_token_exchange_timeout_ms(),
            http_user_agent: default_http_user_agent(),
            app_index_path: default_app_index_path(),
            store_home_url: default_store_home_url(),
            admin_url: default_admin_url(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |present: bool| if present { Some(REDACTED) } else { None };
        f.debug_struct("AppConfig")
            .field("profile", &self.profile)
            .field("api_bind_addr", &self.api_bind_addr)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_ms", &self.db_acquire_timeout_ms)
            .field("crypto_key", &redact(self.crypto_key.is_some()))
            .field("nuvemshop_client_id", &self.nuvemshop_client_id)
            .field(
                "nuvemshop_client_secret",
                &redact(self.nuvemshop_client_secret.is_some()),
            )
            .field("nuvemshop_token_url", &self.nuvemshop_token_url)
            .field("token_exchange_timeout_ms", &self.token_exchange_timeout_ms)
            .field("http_user_agent", &self.http_user_agent)
            .field("app_index_path", &self.app_index_path)
            .field("store_home_url", &self.store_home_url)
            .field("admin_url", &self.admin_url)
            .finish()
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Timeout applied to the outbound token exchange request.
    pub fn token_exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.token_exchange_timeout_ms)
    }

    /// Builds the client credentials used for the installation handshake.
    pub fn credentials(&self) -> Result<TokenExchangeCredentials, ConfigError> {
        let client_id = self
            .nuvemshop_client_id
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingClientId)?;
        let client_secret = self
            .nuvemshop_client_secret
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingClientSecret)?;

        Ok(TokenExchangeCredentials {
            client_id,
            client_secret: SecretString::from(client_secret),
        })
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.crypto_key.is_some() {
            config.crypto_key = Some(REDACTED.as_bytes().to_vec());
        }
        if config.nuvemshop_client_secret.is_some() {
            config.nuvemshop_client_secret = Some(REDACTED.to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    fn is_relaxed_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.crypto_key {
            Some(ref key) if key.len() != 32 => {
                return Err(ConfigError::InvalidCryptoKeyLength { length: key.len() });
            }
            Some(_) => {}
            None => return Err(ConfigError::MissingCryptoKey),
        }

        if !self.is_relaxed_profile() {
            if self.nuvemshop_client_id.is_none() {
                return Err(ConfigError::MissingClientId);
            }
            if self.nuvemshop_client_secret.is_none() {
                return Err(ConfigError::MissingClientSecret);
            }
        }

        match Url::parse(&self.nuvemshop_token_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidTokenUrl {
                    value: self.nuvemshop_token_url.clone(),
                });
            }
        }

        if !(1..=60_000).contains(&self.token_exchange_timeout_ms) {
            return Err(ConfigError::InvalidTokenExchangeTimeout {
                value: self.token_exchange_timeout_ms,
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://bridge.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_nuvemshop_token_url() -> String {
    "https://www.tiendanube.com/apps/authorize/token".to_string()
}

fn default_token_exchange_timeout_ms() -> u64 {
    10_000
}

fn default_http_user_agent() -> String {
    format!("ERP-Bridge/{}", env!("CARGO_PKG_VERSION"))
}

fn default_app_index_path() -> PathBuf {
    PathBuf::from("index.html")
}

fn default_store_home_url() -> String {
    "https://www.nuvemshop.com.br".to_string()
}

fn default_admin_url() -> String {
    "https://admin.nuvemshop.com.br".to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("crypto key is missing; set BRIDGE_CRYPTO_KEY environment variable")]
    MissingCryptoKey,
    #[error("crypto key is invalid base64: {error}")]
    InvalidCryptoKeyBase64 { error: String },
    #[error("crypto key must decode to exactly 32 bytes, got {length} bytes")]
    InvalidCryptoKeyLength { length: usize },
    #[error("Nuvemshop client ID is missing; set BRIDGE_NUVEMSHOP_CLIENT_ID environment variable")]
    MissingClientId,
    #[error(
        "Nuvemshop client secret is missing; set BRIDGE_NUVEMSHOP_CLIENT_SECRET environment variable"
    )]
    MissingClientSecret,
    #[error("token endpoint '{value}' is not an http(s) URL")]
    InvalidTokenUrl { value: String },
    #[error("token exchange timeout must be between 1 and 60000 ms, got {value}")]
    InvalidTokenExchangeTimeout { value: u64 },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
}

/// Loads configuration using layered `.env` files and `BRIDGE_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads, merges and validates the configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let api_bind_addr = take("API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(default_log_format);
        let database_url = take("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);

        let crypto_key = match take("CRYPTO_KEY") {
            Some(key_str) => {
                use base64::{Engine as _, engine::general_purpose};
                Some(general_purpose::STANDARD.decode(key_str.trim()).map_err(|e| {
                    ConfigError::InvalidCryptoKeyBase64 {
                        error: e.to_string(),
                    }
                })?)
            }
            None => None,
        };

        let nuvemshop_client_id = take("NUVEMSHOP_CLIENT_ID").map(|v| v.trim().to_string());
        let nuvemshop_client_secret = take("NUVEMSHOP_CLIENT_SECRET").map(|v| v.trim().to_string());
        let nuvemshop_token_url =
            take("NUVEMSHOP_TOKEN_URL").unwrap_or_else(default_nuvemshop_token_url);
        // Unparseable values are kept out of range so validation reports them.
        let token_exchange_timeout_ms = take("TOKEN_EXCHANGE_TIMEOUT_MS")
            .map(|v| v.trim().parse().unwrap_or(0))
            .unwrap_or_else(default_token_exchange_timeout_ms);
        let http_user_agent = take("HTTP_USER_AGENT").unwrap_or_else(default_http_user_agent);
        let app_index_path = take("APP_INDEX_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_app_index_path);
        let store_home_url = take("STORE_HOME_URL").unwrap_or_else(default_store_home_url);
        let admin_url = take("ADMIN_URL").unwrap_or_else(default_admin_url);

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            crypto_key,
            nuvemshop_client_id,
            nuvemshop_client_secret,
            nuvemshop_token_url,
            token_exchange_timeout_ms,
            http_user_agent,
            app_index_path,
            store_home_url,
            admin_url,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
