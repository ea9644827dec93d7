//! The HTTP `Upgrade: websocket` handshake: header validation and the
//! `Sec-WebSocket-Accept` token computation (RFC 6455 §1.3).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};
use thiserror::Error;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const REQUIRED_VERSION: &str = "13";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("missing or invalid Upgrade header")]
    InvalidUpgrade,
    #[error("missing or invalid Connection header")]
    InvalidConnection,
    #[error("unsupported or missing Sec-WebSocket-Version")]
    UnsupportedVersion,
    #[error("missing or empty Sec-WebSocket-Key")]
    MissingKey,
}

/// The subset of request headers the handshake cares about, borrowed from
/// whatever HTTP layer the caller is using.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeRequest<'a> {
    pub upgrade: Option<&'a str>,
    pub connection: Option<&'a str>,
    pub version: Option<&'a str>,
    pub key: Option<&'a str>,
}

impl<'a> HandshakeRequest<'a> {
    /// Validates the upgrade request and, on success, returns the value for
    /// the response's `Sec-WebSocket-Accept` header.
    pub fn validate(&self) -> Result<String, HandshakeError> {
        let upgrade_ok = self
            .upgrade
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));
        if !upgrade_ok {
            return Err(HandshakeError::InvalidUpgrade);
        }

        let connection_ok = self.connection.is_some_and(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        });
        if !connection_ok {
            return Err(HandshakeError::InvalidConnection);
        }

        if self.version != Some(REQUIRED_VERSION) {
            return Err(HandshakeError::UnsupportedVersion);
        }

        let key = self.key.unwrap_or("");
        if key.is_empty() {
            return Err(HandshakeError::MissingKey);
        }

        Ok(compute_accept(key))
    }
}

/// `base64(SHA-1(key ‖ "258EAFA5-E914-47DA-95CA-C5AB0DC85B11"))`.
pub fn compute_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> HandshakeRequest<'static> {
        HandshakeRequest {
            upgrade: Some("websocket"),
            connection: Some("Upgrade"),
            version: Some("13"),
            key: Some("dGhlIHNhbXBsZSBub25jZQ=="),
        }
    }

    #[test]
    fn known_key_produces_the_rfc_example_accept_token() {
        // RFC 6455 §1.3 worked example.
        assert_eq!(
            compute_accept("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn well_formed_request_validates() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn connection_header_is_checked_as_a_comma_separated_list() {
        let mut req = valid();
        req.connection = Some("keep-alive, Upgrade");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn missing_upgrade_header_is_rejected() {
        let mut req = valid();
        req.upgrade = None;
        assert_eq!(req.validate(), Err(HandshakeError::InvalidUpgrade));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut req = valid();
        req.version = Some("8");
        assert_eq!(req.validate(), Err(HandshakeError::UnsupportedVersion));
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut req = valid();
        req.key = Some("");
        assert_eq!(req.validate(), Err(HandshakeError::MissingKey));
    }
}
