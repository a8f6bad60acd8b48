use chrono::Duration;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Backend root, e.g. `http://localhost:8000/api/`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// Where the access/refresh pair is persisted between runs.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Renew access tokens this many seconds before `exp`.
    #[serde(default = "default_expiry_margin_secs")]
    pub expiry_margin_secs: i64,
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            expiry_margin_secs: default_expiry_margin_secs(),
            login_route: default_login_route(),
        }
    }
}

impl SessionSettings {
    /// The renewal margin, or `None` when it is negative or out of range.
    pub fn expiry_margin(&self) -> Option<Duration> {
        Duration::try_seconds(self.expiry_margin_secs).filter(|margin| *margin >= Duration::zero())
    }
}

fn default_token_file() -> PathBuf {
    PathBuf::from(".pos-client").join("session.json")
}

fn default_expiry_margin_secs() -> i64 {
    crate::session::claims::SAFETY_MARGIN_SECS
}

fn default_login_route() -> String {
    "/login".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Read settings from `<dir>/base.yaml`, `<dir>/local.yaml` and `APP_*`.
///
/// Without an explicit directory, `config/` under the working directory is
/// used, or `pos-client/config/` when run from the workspace root.
pub fn get_configuration(config_dir: Option<PathBuf>) -> Result<Settings, pos_core::error::CoreError> {
    let configuration_directory = match config_dir {
        Some(dir) => dir,
        None => {
            let base_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if base_path.ends_with("pos-client") || !base_path.join("pos-client").exists() {
                base_path.join("config")
            } else {
                base_path.join("pos-client").join("config")
            }
        }
    };

    let settings: Settings = pos_core::config::load_configuration(&configuration_directory)?;

    if settings.session.expiry_margin().is_none() {
        return Err(::config::ConfigError::Message(format!(
            "session.expiry_margin_secs must be between 0 and {} seconds, got {}",
            i64::MAX / 1_000,
            settings.session.expiry_margin_secs
        ))
        .into());
    }

    Ok(settings)
}
