//! TLS configuration for the persistent socket transport.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No certificate found in {0}")]
    NoCertificate(PathBuf),
    #[error("No private key found in {0}")]
    NoPrivateKey(PathBuf),
    #[error("No usable root certificate available")]
    NoRootCertificates,
    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),
}

/// PEM certificate chain and private key presented to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlsSettings {
    /// Accept any server certificate. Handshake signatures are still checked.
    pub allow_untrusted_server: bool,
    /// Extra CA added to the native roots.
    pub ca_certificate_path: Option<PathBuf>,
    pub client_identity: Option<ClientIdentity>,
}

/// Builds the connector used by [`SocketTransport`](super::SocketTransport).
pub fn build_connector(settings: &TlsSettings) -> Result<TlsConnector, TlsError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = if settings.allow_untrusted_server {
        warn!("TLS server certificate verification is disabled");
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert::new(&provider)))
    } else {
        builder.with_root_certificates(root_store(settings.ca_certificate_path.as_deref())?)
    };

    let config = match &settings.client_identity {
        Some(identity) => {
            let certs = load_certs(&identity.cert_path)?;
            let key = load_private_key(&identity.key_path)?;
            builder.with_client_auth_cert(certs, key)?
        }
        None => builder.with_no_client_auth(),
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

fn root_store(extra_ca: Option<&Path>) -> Result<RootCertStore, TlsError> {
    let mut store = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        debug!("Failed to load native certificate: {}", err);
    }
    let (added, ignored) = store.add_parsable_certificates(native.certs);
    debug!("Loaded {} native root certificates ({} ignored)", added, ignored);

    if let Some(path) = extra_ca {
        for cert in load_certs(path)? {
            store.add(cert)?;
        }
    }

    if store.is_empty() {
        return Err(TlsError::NoRootCertificates);
    }
    Ok(store)
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificate(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

/// Trusts every server certificate, for self-signed collectors.
#[derive(Debug)]
struct AcceptAnyServerCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl AcceptAnyServerCert {
    fn new(provider: &CryptoProvider) -> Self {
        Self {
            algorithms: provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_untrusted_connector_builds_without_roots() {
        let settings = TlsSettings {
            allow_untrusted_server: true,
            ..Default::default()
        };

        assert!(build_connector(&settings).is_ok());
    }

    #[test]
    fn test_missing_ca_file_is_reported() {
        let settings = TlsSettings {
            ca_certificate_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };

        assert!(matches!(build_connector(&settings), Err(TlsError::Io { .. })));
    }

    #[test]
    fn test_pem_without_certificates_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let result = load_certs(file.path());

        assert!(matches!(result, Err(TlsError::NoCertificate(_))));
    }

    #[test]
    fn test_pem_without_key_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a key").unwrap();

        let result = load_private_key(file.path());

        assert!(matches!(result, Err(TlsError::NoPrivateKey(_))));
    }
}
