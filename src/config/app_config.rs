use std::env;
use std::{net::IpAddr, time::Duration};

use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
};

use super::ConfigError;
use super::settings::Settings;

/// Load the settings for this run.
/// A `.env` file in the working directory is loaded first. If `NOTAFTER_CONFIG` points to a
/// YAML file its values replace the defaults, and `NOTAFTER_*` / `DNS_HOSTS` environment
/// variables override both.
pub fn load_settings() -> Result<Settings, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let settings = match env::var("NOTAFTER_CONFIG") {
        Ok(path) => {
            log::debug!("Reading config file {path}");
            Settings::from_file(&path)?
        }
        Err(_) => Settings::default(),
    };
    let settings = settings.with_env_overrides(|key| env::var(key).ok())?;

    log::info!(
        "Threshold {} days, timeout {}s, port {}, DNS hosts: {:?}",
        settings.threshold_days,
        settings.timeout_seconds,
        settings.port,
        settings.dns_hosts
    );
    Ok(settings)
}

/// Setup a TLS connector that accepts invalid certificates and hostnames.
/// We only read the presented certificate, so nothing about it is verified.
pub fn setup_tls_connector() -> Result<TokioTlsConnector, native_tls::Error> {
    let mut builder = native_tls::TlsConnector::builder();
    builder.danger_accept_invalid_certs(true);
    builder.danger_accept_invalid_hostnames(true);
    let connector = builder.build()?;
    Ok(TokioTlsConnector::from(connector))
}

/// Setup a DNS resolver using the provided DNS hosts
/// This function creates a `TokioAsyncResolver` querying the given hosts over TCP, with 2 attempts
/// and a 1 second timeout per query. Without hosts the system resolver configuration is used.
/// # Arguments
///     * `dns_hosts` - A slice of strings representing DNS host IPs (e.g., "1.1.1.1")
/// # Returns
///     A `Result` containing a `TokioAsyncResolver`, or an error if a host is not an IP address
///     or the system configuration cannot be read.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    if dns_hosts.is_empty() {
        return TokioAsyncResolver::tokio_from_system_conf().map_err(ConfigError::SystemResolver);
    }

    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_secs(1);

    let mut name_servers = NameServerConfigGroup::new();

    for host in dns_hosts {
        let ip: IpAddr = host.parse().map_err(|source| ConfigError::DnsHost {
            host: host.clone(),
            source,
        })?;
        name_servers.push(NameServerConfig {
            socket_addr: (ip, 53).into(),
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}
