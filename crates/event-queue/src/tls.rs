//! Optional TLS for the durable stream backend's TCP connections.
//!
//! Mirrors the `TLS_{CA,CERT,KEY,SERVER_NAME,SKIP_VERIFY}` configuration
//! surface: absent config means plain TCP, present config builds a
//! `rustls` client config once and reuses it for every connection.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::QueueError;

/// TLS material for connecting to the durable stream backend.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub ca_path: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub server_name: Option<String>,
    pub skip_verify: bool,
}

impl TlsConfig {
    fn build_client_config(&self) -> Result<ClientConfig, QueueError> {
        let builder = ClientConfig::builder();

        if self.skip_verify {
            return Ok(builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerify))
                .with_no_client_auth());
        }

        let mut roots = RootCertStore::empty();
        if let Some(ca_path) = &self.ca_path {
            let file = std::fs::read(ca_path)
                .map_err(|e| QueueError::Transport(format!("reading CA file '{ca_path}': {e}")))?;
            for cert in rustls_pemfile::certs(&mut file.as_slice()) {
                let cert = cert
                    .map_err(|e| QueueError::Transport(format!("parsing CA file: {e}")))?;
                roots
                    .add(cert)
                    .map_err(|e| QueueError::Transport(format!("adding CA cert: {e}")))?;
            }
        } else {
            roots.extend(webpki_root_certs());
        }

        let builder = builder.with_root_certificates(roots);

        match (&self.cert_path, &self.key_path) {
            (Some(cert_path), Some(key_path)) => {
                let cert_bytes = std::fs::read(cert_path).map_err(|e| {
                    QueueError::Transport(format!("reading client cert '{cert_path}': {e}"))
                })?;
                let certs: Vec<CertificateDer<'static>> =
                    rustls_pemfile::certs(&mut cert_bytes.as_slice())
                        .collect::<Result<_, _>>()
                        .map_err(|e| QueueError::Transport(format!("parsing client cert: {e}")))?;
                let key_bytes = std::fs::read(key_path).map_err(|e| {
                    QueueError::Transport(format!("reading client key '{key_path}': {e}"))
                })?;
                let key = rustls_pemfile::private_key(&mut key_bytes.as_slice())
                    .map_err(|e| QueueError::Transport(format!("parsing client key: {e}")))?
                    .ok_or_else(|| QueueError::Transport("no private key found".into()))?;
                builder
                    .with_client_auth_cert(certs, key)
                    .map_err(|e| QueueError::Transport(format!("invalid client cert/key: {e}")))
            }
            _ => Ok(builder.with_no_client_auth()),
        }
    }

    pub(crate) async fn connect(
        &self,
        host: &str,
        tcp: TcpStream,
    ) -> Result<TlsStream<TcpStream>, QueueError> {
        let client_config = self.build_client_config()?;
        let connector = TlsConnector::from(Arc::new(client_config));
        let name = self.server_name.clone().unwrap_or_else(|| host.to_owned());
        let server_name = ServerName::try_from(name)
            .map_err(|e| QueueError::Transport(format!("invalid TLS server name: {e}")))?;
        connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| QueueError::Transport(format!("TLS handshake failed: {e}")))
    }
}

fn webpki_root_certs() -> impl Iterator<Item = CertificateDer<'static>> {
    webpki_roots::TLS_SERVER_ROOTS
        .iter()
        .map(|ta| ta.to_owned().into())
}

/// Verifier used when `skip_verify` is set. Only ever reachable through an
/// explicit, operator-set configuration flag — never the default.
#[derive(Debug)]
struct NoVerify;

impl ServerCertVerifier for NoVerify {
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
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}

/// Either a plain TCP stream or a TLS-wrapped one, behind one type so the
/// rest of the durable backend doesn't need to be generic over it.
pub(crate) enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
