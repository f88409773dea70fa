use std::sync::Arc;

use async_trait::async_trait;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{ring, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::{debug, warn};

use super::{BoxedStream, Connect};
use crate::error::ClientError;

/// TLS on top of another connector.
pub struct TlsConnector {
    inner: Arc<dyn Connect>,
    server_name: ServerName<'static>,
    connector: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    /// Wrap `inner`. With `reject_unauthorized` off, any certificate is
    /// accepted.
    pub fn new(
        inner: Arc<dyn Connect>,
        host: &str,
        reject_unauthorized: bool,
    ) -> Result<Self, ClientError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ClientError::Tls(format!("invalid server name {:?}: {}", host, e)))?;
        let config = client_config(reject_unauthorized)?;
        Ok(TlsConnector {
            inner,
            server_name,
            connector: tokio_rustls::TlsConnector::from(Arc::new(config)),
        })
    }
}

fn client_config(reject_unauthorized: bool) -> Result<rustls::ClientConfig, ClientError> {
    let provider = Arc::new(ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::Tls(e.to_string()))?;
    if reject_unauthorized {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Ok(builder.with_root_certificates(roots).with_no_client_auth())
    } else {
        warn!("TLS certificate verification disabled");
        Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert(provider)))
            .with_no_client_auth())
    }
}

#[async_trait]
impl Connect for TlsConnector {
    async fn connect(&self) -> Result<BoxedStream, ClientError> {
        let stream = self.inner.connect().await?;
        let tls = self
            .connector
            .connect(self.server_name.clone(), stream)
            .await
            .map_err(|e| ClientError::Tls(e.to_string()))?;
        debug!(server = ?self.server_name, "tls handshake complete");
        Ok(Box::new(tls))
    }
}

/// Verifier that trusts every certificate but still checks handshake
/// signatures with the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCert {
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
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TcpConnector;

    fn tcp() -> Arc<dyn Connect> {
        Arc::new(TcpConnector::new("irc.example.org", 6697))
    }

    #[test]
    fn test_builds_both_verifier_modes() {
        assert!(TlsConnector::new(tcp(), "irc.example.org", true).is_ok());
        assert!(TlsConnector::new(tcp(), "irc.example.org", false).is_ok());
        assert!(TlsConnector::new(tcp(), "192.0.2.1", true).is_ok());
    }

    #[test]
    fn test_rejects_invalid_server_name() {
        assert!(matches!(
            TlsConnector::new(tcp(), "not a host", true),
            Err(ClientError::Tls(_))
        ));
    }
}
