use crate::error::{self, Result};
use model::tls::fingerprint_der;
use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, PKCS_ECDSA_P256_SHA256};
use snafu::ResultExt;

/// The run's ephemeral mTLS material: one self-signed CA, reused to sign a fresh client
/// certificate per plugin (SPEC_FULL.md §4.2). Everything is ECDSA P-256, generated fresh for
/// each run and discarded when the run ends.
pub struct RunCertificateAuthority {
    ca: Certificate,
}

/// A client identity issued to a single plugin's worker sidecars (all nodes of a DaemonSet
/// plugin share one client cert; only the CA distinguishes workers by plugin, not by node).
pub struct ClientIdentity {
    pub cert_pem: String,
    pub key_pem: String,
    /// SHA-256 fingerprint of the DER-encoded certificate, recorded in the slot table and
    /// checked by the aggregation server on every submission.
    pub fingerprint: String,
}

impl RunCertificateAuthority {
    pub fn generate() -> Result<Self> {
        let mut params = CertificateParams::default();
        params.alg = &PKCS_ECDSA_P256_SHA256;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "sonobuoy-aggregator-ca");
        params.distinguished_name = dn;
        let ca = Certificate::from_params(params).context(error::GenerateCaSnafu)?;
        Ok(Self { ca })
    }

    pub fn ca_cert_pem(&self) -> Result<String> {
        self.ca.serialize_pem().context(error::GenerateCaSnafu)
    }

    /// Server certificate the aggregator's HTTPS listener presents, signed by this run's CA.
    pub fn issue_server_cert(&self, advertise_address: &str) -> Result<ClientIdentity> {
        let mut params = CertificateParams::new(vec![advertise_address.to_string()]);
        params.alg = &PKCS_ECDSA_P256_SHA256;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "sonobuoy-aggregator");
        params.distinguished_name = dn;
        let cert = Certificate::from_params(params).context(error::GenerateClientCertSnafu {
            plugin: "<aggregator>".to_string(),
        })?;
        into_identity(&cert, &self.ca, "<aggregator>")
    }

    /// Issues one client certificate for a plugin. Every worker sidecar for that plugin (every
    /// node, for a DaemonSet plugin) is injected with the same cert; the aggregation server
    /// authenticates by plugin, not by node (SPEC_FULL.md §4.3).
    pub fn issue_client_cert(&self, plugin_name: &str) -> Result<ClientIdentity> {
        let mut params = CertificateParams::new(Vec::new());
        params.alg = &PKCS_ECDSA_P256_SHA256;
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, plugin_name);
        params.distinguished_name = dn;
        let cert = Certificate::from_params(params).context(error::GenerateClientCertSnafu {
            plugin: plugin_name.to_string(),
        })?;
        into_identity(&cert, &self.ca, plugin_name)
    }
}

fn into_identity(cert: &Certificate, ca: &Certificate, plugin: &str) -> Result<ClientIdentity> {
    let cert_der = cert
        .serialize_der_with_signer(ca)
        .context(error::GenerateClientCertSnafu {
            plugin: plugin.to_string(),
        })?;
    let cert_pem = pem_encode("CERTIFICATE", &cert_der);
    let key_pem = cert.serialize_private_key_pem();
    let fingerprint = fingerprint_der(&cert_der);
    Ok(ClientIdentity {
        cert_pem,
        key_pem,
        fingerprint,
    })
}

fn pem_encode(label: &str, der: &[u8]) -> String {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(der);
    let mut body = String::new();
    for chunk in encoded.as_bytes().chunks(64) {
        body.push_str(&String::from_utf8_lossy(chunk));
        body.push('\n');
    }
    format!("-----BEGIN {label}-----\n{body}-----END {label}-----\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_client_cert_fingerprint_matches_der() {
        let ca = RunCertificateAuthority::generate().unwrap();
        let identity = ca.issue_client_cert("e2e").unwrap();
        assert!(!identity.fingerprint.is_empty());
        assert!(identity.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(identity.key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn different_plugins_get_different_fingerprints() {
        let ca = RunCertificateAuthority::generate().unwrap();
        let a = ca.issue_client_cert("plugin-a").unwrap();
        let b = ca.issue_client_cert("plugin-b").unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
    }
}
