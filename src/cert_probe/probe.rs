use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector as TokioTlsConnector;
use trust_dns_resolver::TokioAsyncResolver;
use x509_parser::parse_x509_certificate;

use super::prelude::*;

/// Reads the expiry of the certificate a server presents during the TLS handshake.
///
/// The connector is expected to skip verification (see `config::app_config::setup_tls_connector`):
/// expired or mis-chained certificates are exactly what we want to read.
/// A `Prober` holds no mutable state and can be shared between tasks.
#[derive(Clone)]
pub struct Prober {
    connector: TokioTlsConnector,
    resolver: TokioAsyncResolver,
    port: u16,
    timeout: Duration,
}

impl Prober {
    pub fn new(
        connector: TokioTlsConnector,
        resolver: TokioAsyncResolver,
        port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            resolver,
            port,
            timeout,
        }
    }

    /// Returns the `notAfter` of the leaf certificate presented by `domain`.
    ///
    /// Resolution, connect and handshake share one timeout. The connection is dropped,
    /// and thereby closed, on every path out of this function.
    pub async fn probe(&self, domain: &str) -> Result<DateTime<Utc>, ProbeError> {
        match tokio::time::timeout(self.timeout, self.leaf_not_after(domain)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::DeadlineExceeded(self.timeout)),
        }
    }

    async fn resolve(&self, host: &str) -> Result<Vec<SocketAddr>, ProbeError> {
        let addrs: Vec<SocketAddr> = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|source| ProbeError::Resolve {
                host: host.to_string(),
                source,
            })?
            .iter()
            .map(|ip| SocketAddr::new(ip, self.port))
            .collect();
        if addrs.is_empty() {
            return Err(ProbeError::NoAddress(host.to_string()));
        }
        Ok(addrs)
    }

    async fn leaf_not_after(&self, domain: &str) -> Result<DateTime<Utc>, ProbeError> {
        let addrs = self.resolve(domain).await?;
        let (stream, addr) = connect_any(domain, &addrs).await?;

        let tls_stream =
            self.connector
                .connect(domain, stream)
                .await
                .map_err(|source| ProbeError::Handshake {
                    host: domain.to_string(),
                    source,
                })?;

        // native-tls only exposes the leaf, which is all we look at anyway
        let cert = tls_stream
            .get_ref()
            .peer_certificate()
            .map_err(ProbeError::PeerCertificate)?
            .ok_or(ProbeError::NoPeerCertificate)?;
        let der = cert.to_der().map_err(ProbeError::PeerCertificate)?;

        log::debug!("{domain}: read {} byte leaf certificate from {addr}", der.len());
        not_after(&der)
    }
}

/// Connects to the first address that accepts, in resolver order.
/// Fails with the error of the last address tried.
async fn connect_any(
    host: &str,
    addrs: &[SocketAddr],
) -> Result<(TcpStream, SocketAddr), ProbeError> {
    let mut last_err = None;
    for &addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok((stream, addr)),
            Err(source) => {
                log::debug!("{host}: connect to {addr} failed: {source}");
                last_err = Some(ProbeError::Connect { addr, source });
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ProbeError::NoAddress(host.to_string())))
}

fn not_after(der: &[u8]) -> Result<DateTime<Utc>, ProbeError> {
    let (_, parsed) =
        parse_x509_certificate(der).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let not_after = parsed.validity().not_after.timestamp();
    DateTime::from_timestamp(not_after, 0).ok_or(ProbeError::Timestamp(not_after))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::app_config::{setup_resolver, setup_tls_connector};
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::hash::MessageDigest;
    use openssl::pkey::PKey;
    use openssl::rsa::Rsa;
    use openssl::x509::{X509, X509NameBuilder};
    use tokio::net::TcpListener;

    /// A self-signed certificate for an unrelated name, valid until `not_after`.
    fn self_signed_identity(not_after: i64) -> native_tls::Identity {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "expired.notafter.test").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::from_unix(not_after - 90 * 86_400).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::from_unix(not_after).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        native_tls::Identity::from_pkcs8(
            &cert.to_pem().unwrap(),
            &key.private_key_to_pem_pkcs8().unwrap(),
        )
        .unwrap()
    }

    async fn closed_port_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    fn local_prober(port: u16, timeout: Duration) -> Prober {
        let connector = setup_tls_connector().expect("TLS connector");
        let resolver = setup_resolver(&["127.0.0.1".to_string()]).expect("resolver");
        Prober::new(connector, resolver, port, timeout)
    }

    #[test]
    fn test_not_after_rejects_garbage() {
        let err = not_after(b"definitely not a certificate").unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[tokio::test]
    async fn test_reads_not_after_of_expired_self_signed_leaf() {
        let expired_at = 1_600_000_000;
        let acceptor = native_tls::TlsAcceptor::new(self_signed_identity(expired_at)).unwrap();
        let acceptor = tokio_native_tls::TlsAcceptor::from(acceptor);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                let _ = acceptor.accept(socket).await;
            }
        });

        let prober = local_prober(port, Duration::from_secs(5));
        let not_after = prober.probe("127.0.0.1").await.unwrap();
        assert_eq!(not_after, DateTime::from_timestamp(expired_at, 0).unwrap());
    }

    #[tokio::test]
    async fn test_connect_any_skips_dead_addresses() {
        let dead = closed_port_addr().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = listener.local_addr().unwrap();

        let (_stream, addr) = connect_any("multi.example", &[dead, live]).await.unwrap();
        assert_eq!(addr, live);
    }

    #[tokio::test]
    async fn test_connect_any_reports_last_failure() {
        let first = closed_port_addr().await;
        let last = closed_port_addr().await;

        let err = connect_any("down.example", &[first, last]).await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect { addr, .. } if addr == last));

        let err = connect_any("none.example", &[]).await.unwrap_err();
        assert!(matches!(err, ProbeError::NoAddress(ref host) if host == "none.example"));
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = local_prober(port, Duration::from_secs(5));
        let err = prober.probe("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect { .. }), "got {err:?}");
        assert!(err.to_string().starts_with("dial tcp 127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_probe_handshake_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // hang up on every client before any TLS bytes are exchanged
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let prober = local_prober(port, Duration::from_secs(5));
        let err = prober.probe("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Handshake { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_probe_deadline_exceeded() {
        // the kernel completes the TCP handshake, but no ServerHello ever arrives
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let timeout = Duration::from_millis(200);
        let prober = local_prober(port, timeout);
        let err = prober.probe("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::DeadlineExceeded(t) if t == timeout));
        assert_eq!(err.to_string(), "deadline exceeded after 200ms");

        drop(listener);
    }
}
