use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// The outcome of probing a single domain.
/// `outcome` holds the leaf certificate's `notAfter` on success.
#[derive(Debug)]
pub struct ProbeResult {
    pub domain: String,
    pub outcome: Result<DateTime<Utc>, ProbeError>,
}

impl ProbeResult {
    pub fn new(domain: impl Into<String>, outcome: Result<DateTime<Utc>, ProbeError>) -> Self {
        Self {
            domain: domain.into(),
            outcome,
        }
    }
}

/// Why a domain's certificate expiry could not be read.
/// Per-domain failures are reported, never propagated.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("lookup {host}")]
    Resolve {
        host: String,
        #[source]
        source: ResolveError,
    },

    #[error("lookup {0}: no addresses found")]
    NoAddress(String),

    #[error("dial tcp {addr}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("tls handshake with {host}")]
    Handshake {
        host: String,
        #[source]
        source: native_tls::Error,
    },

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("no peer certificates")]
    NoPeerCertificate,

    #[error("read peer certificate")]
    PeerCertificate(#[source] native_tls::Error),

    #[error("parse leaf certificate: {0}")]
    Parse(String),

    #[error("notAfter out of range: {0}")]
    Timestamp(i64),

    #[error("probe task failed: {0}")]
    Task(String),
}
