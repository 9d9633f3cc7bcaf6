pub mod app_config;
pub mod settings;

use std::net::AddrParseError;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid DNS host {host:?}")]
    DnsHost {
        host: String,
        #[source]
        source: AddrParseError,
    },

    #[error("load system resolver configuration")]
    SystemResolver(#[source] ResolveError),
}
