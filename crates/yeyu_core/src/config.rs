//! Environment-driven application configuration.
//!
//! # Invariants
//! - Empty or whitespace-only values are treated as unset.
//! - Secrets are never included in `Debug` output.

use crate::logging::default_log_level;
use crate::relay::completion::{CompletionProvider, ProviderConfig};
use crate::relay::spark_ws::{SparkWsConfig, SPARK_WS_DEFAULT_URL};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "yeyu.sqlite3";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                reason,
            } => write!(f, "invalid value `{value}` for {variable}: {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<String>,
    pub log_level: String,
    pub bind_addr: SocketAddr,
    pub admin_token: Option<String>,
    pub ai_password: Option<String>,
    pub gpt: ProviderConfig,
    pub spark_http: ProviderConfig,
    pub spark_ws: SparkWsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_raw = get("YEYU_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidValue {
                variable: "YEYU_BIND_ADDR",
                value: bind_raw.clone(),
                reason: err.to_string(),
            })?;

        let mut gpt = ProviderConfig::new(CompletionProvider::Gpt, get("GPT_API_KEY"));
        if let Some(url) = get("GPT_API_URL") {
            gpt.api_url = url;
        }
        let mut spark_http =
            ProviderConfig::new(CompletionProvider::SparkHttp, get("SPARK_API_PASSWORD"));
        if let Some(url) = get("SPARK_API_URL") {
            spark_http.api_url = url;
        }

        Ok(Self {
            db_path: PathBuf::from(
                get("YEYU_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            ),
            log_dir: get("YEYU_LOG_DIR"),
            log_level: get("YEYU_LOG_LEVEL").unwrap_or_else(|| default_log_level().to_string()),
            bind_addr,
            admin_token: get("YEYU_ADMIN_TOKEN"),
            ai_password: get("AI_PWD"),
            gpt,
            spark_http,
            spark_ws: SparkWsConfig {
                host_url: get("SPARK_WS_URL").unwrap_or_else(|| SPARK_WS_DEFAULT_URL.to_string()),
                app_id: get("SPARK_APP_ID"),
                api_key: get("SPARK_API_KEY"),
                api_secret: get("SPARK_API_SECRET"),
            },
        })
    }
}

impl Debug for AppConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn set(value: &Option<String>) -> &'static str {
            if value.is_some() {
                "set"
            } else {
                "unset"
            }
        }
        f.debug_struct("AppConfig")
            .field("db_path", &self.db_path)
            .field("log_dir", &self.log_dir)
            .field("log_level", &self.log_level)
            .field("bind_addr", &self.bind_addr)
            .field("admin_token", &set(&self.admin_token))
            .field("ai_password", &set(&self.ai_password))
            .field("gpt_api_url", &self.gpt.api_url)
            .field("gpt_api_key", &set(&self.gpt.api_key))
            .field("spark_api_url", &self.spark_http.api_url)
            .field("spark_api_password", &set(&self.spark_http.api_key))
            .field("spark_ws_url", &self.spark_ws.host_url)
            .field("spark_app_id", &set(&self.spark_ws.app_id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("defaults should be valid");
        assert_eq!(config.db_path.to_str(), Some("yeyu.sqlite3"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert!(config.admin_token.is_none());
        assert!(config.gpt.api_key.is_none());
        assert_eq!(config.gpt.api_url, "https://tbai.xin/v1/chat/completions");
        assert_eq!(config.spark_ws.host_url, "wss://spark-api.xf-yun.com/v3.1/chat");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("GPT_API_KEY", "   "), ("AI_PWD", "")]).expect("valid");
        assert!(config.gpt.api_key.is_none());
        assert!(config.ai_password.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("YEYU_BIND_ADDR", "0.0.0.0:8080"),
            ("GPT_API_URL", "http://127.0.0.1:9/v1"),
            ("SPARK_API_PASSWORD", "pw"),
        ])
        .expect("valid");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.gpt.api_url, "http://127.0.0.1:9/v1");
        assert_eq!(config.spark_http.api_key.as_deref(), Some("pw"));
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let err = config_from(&[("YEYU_BIND_ADDR", "localhost")]).expect_err("should fail");
        assert!(err.to_string().contains("YEYU_BIND_ADDR"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = config_from(&[("YEYU_ADMIN_TOKEN", "hunter2")]).expect("valid");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("admin_token: \"set\""));
    }
}
