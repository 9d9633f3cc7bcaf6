use std::str::FromStr;

use serde::Deserialize;

use super::ConfigError;
use crate::report::DEFAULT_THRESHOLD_DAYS;

/// Runtime settings for a notafter run.
/// Every field has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Certificates expiring within this many days are reported.
    #[serde(default = "default_threshold_days")]
    pub threshold_days: u32,

    /// Per-domain budget for DNS lookup, connect and TLS handshake.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// The port probed on every domain.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The mail(1) compatible program used to deliver the report.
    #[serde(default = "default_mail_command")]
    pub mail_command: String,

    /// Name servers to resolve domains with. Empty means the system resolver.
    #[serde(default)]
    pub dns_hosts: Vec<String>,
}

fn default_threshold_days() -> u32 {
    DEFAULT_THRESHOLD_DAYS
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_port() -> u16 {
    443
}

fn default_mail_command() -> String {
    "mail".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
            timeout_seconds: default_timeout_seconds(),
            port: default_port(),
            mail_command: default_mail_command(),
            dns_hosts: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Applies `NOTAFTER_*` and `DNS_HOSTS` values found through `lookup`.
    /// `lookup` is usually `std::env::var`; taking it as a parameter keeps this testable.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("NOTAFTER_THRESHOLD_DAYS") {
            self.threshold_days = parse_env("NOTAFTER_THRESHOLD_DAYS", &v)?;
        }
        if let Some(v) = lookup("NOTAFTER_TIMEOUT_SECONDS") {
            self.timeout_seconds = parse_env("NOTAFTER_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("NOTAFTER_PORT") {
            self.port = parse_env("NOTAFTER_PORT", &v)?;
        }
        if let Some(v) = lookup("NOTAFTER_MAIL_COMMAND") {
            if v.trim().is_empty() {
                return Err(ConfigError::InvalidEnv {
                    key: "NOTAFTER_MAIL_COMMAND".to_string(),
                    value: v,
                });
            }
            self.mail_command = v;
        }
        if let Some(v) = lookup("DNS_HOSTS") {
            self.dns_hosts = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(self)
    }

    pub fn threshold(&self) -> chrono::Duration {
        chrono::Duration::days(self.threshold_days.into())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}
