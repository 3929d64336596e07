use std::{fmt, time::Duration};

use anyhow::{bail, Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://gateway.db";
const DEFAULT_EAS_API_URL: &str = "https://api.expo.dev";
const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// How build status is produced. Chosen once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusMode {
    /// Mirror the build provider.
    Live,
    /// Serve a synthetic completed build for any id. Demo deployments only.
    Demo,
}

impl StatusMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusMode::Live => "live",
            StatusMode::Demo => "demo",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(StatusMode::Live),
            "demo" => Ok(StatusMode::Demo),
            other => bail!("STATUS_MODE must be 'live' or 'demo', got '{other}'"),
        }
    }
}

impl fmt::Display for StatusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct EasCredentials {
    pub token: String,
    pub project_id: String,
}

impl fmt::Debug for EasCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EasCredentials")
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub status_mode: StatusMode,

    /// `None` unless both `EXPO_TOKEN` and `EAS_PROJECT_ID` are set.
    pub eas: Option<EasCredentials>,
    pub expo_account: Option<String>,
    pub expo_project_slug: Option<String>,
    pub eas_api_url: String,
    pub expo_push_url: String,
    pub provider_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("GATEWAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let status_mode = match get("STATUS_MODE") {
            Some(raw) => StatusMode::parse(&raw)?,
            None => StatusMode::Live,
        };

        let eas = match (get("EXPO_TOKEN"), get("EAS_PROJECT_ID")) {
            (Some(token), Some(project_id)) => Some(EasCredentials { token, project_id }),
            _ => None,
        };

        let eas_api_url = get("EAS_API_URL").unwrap_or_else(|| DEFAULT_EAS_API_URL.to_string());
        let expo_push_url =
            get("EXPO_PUSH_URL").unwrap_or_else(|| DEFAULT_EXPO_PUSH_URL.to_string());

        let provider_timeout = match get("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().with_context(|| {
                format!("PROVIDER_TIMEOUT_SECS must be a number of seconds, got '{raw}'")
            })?),
            None => Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        };

        // Tiny sanity checks (fail fast, fail loud)
        for (key, value) in [("EAS_API_URL", &eas_api_url), ("EXPO_PUSH_URL", &expo_push_url)] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                bail!("{key} must start with http:// or https://");
            }
        }
        if provider_timeout.is_zero() {
            bail!("PROVIDER_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            bind_addr,
            database_url,
            status_mode,
            eas,
            expo_account: get("EXPO_ACCOUNT"),
            expo_project_slug: get("EXPO_PROJECT_SLUG"),
            eas_api_url,
            expo_push_url,
            provider_timeout,
        })
    }
}
