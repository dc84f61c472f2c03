use crate::error::{self, Result};
use rustls::server::AllowAnyAuthenticatedClient;
use rustls::{Certificate, PrivateKey, RootCertStore, ServerConfig};
use snafu::ResultExt;
use std::sync::Arc;

/// Builds the aggregation server's TLS configuration: the server's own cert/key, and a client
/// verifier that trusts only certificates chained to the run's CA (SPEC_FULL.md §4.3/§6 "mutual
/// auth with ECDSA client and server certs chained to the per-run CA").
pub fn server_config(ca_cert_pem: &str, server_cert_pem: &str, server_key_pem: &str) -> Result<Arc<ServerConfig>> {
    let ca_certs = parse_certs(ca_cert_pem)?;
    let mut roots = RootCertStore::empty();
    for cert in &ca_certs {
        roots
            .add(cert)
            .map_err(|_| error::Error::TlsMaterial {
                message: "unable to add CA certificate to root store".to_string(),
            })?;
    }
    let verifier = AllowAnyAuthenticatedClient::new(roots);

    let server_certs = parse_certs(server_cert_pem)?;
    let server_key = parse_key(server_key_pem)?;

    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_client_cert_verifier(Arc::new(verifier))
        .with_single_cert(server_certs, server_key)
        .context(error::TlsConfigSnafu)?;
    Ok(Arc::new(config))
}

fn parse_certs(pem: &str) -> Result<Vec<Certificate>> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());
    rustls_pemfile::certs(&mut reader)
        .map_err(|_| error::Error::TlsMaterial {
            message: "unable to parse certificate PEM".to_string(),
        })
        .map(|certs| certs.into_iter().map(Certificate).collect())
}

fn parse_key(pem: &str) -> Result<PrivateKey> {
    let mut reader = std::io::BufReader::new(pem.as_bytes());
    let keys = rustls_pemfile::pkcs8_private_keys(&mut reader).map_err(|_| error::Error::TlsMaterial {
        message: "unable to parse private key PEM".to_string(),
    })?;
    keys.into_iter()
        .next()
        .map(PrivateKey)
        .ok_or_else(|| error::Error::TlsMaterial {
            message: "no private key found in PEM".to_string(),
        })
}

/// SHA-256 fingerprint of the peer certificate presented during the TLS handshake, computed the
/// same way `launcher::cert` fingerprints the certificate it issued, so the two sides of the
/// comparison in `owner::handle_submit` never drift.
pub fn peer_fingerprint(peer_certs: &[Certificate]) -> Option<String> {
    peer_certs.first().map(|c| model::tls::fingerprint_der(&c.0))
}
