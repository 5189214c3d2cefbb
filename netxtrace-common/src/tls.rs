use bytes::Bytes;

/// Parameters negotiated by a TLS handshake.
///
/// `peer_certificates` holds the raw DER of each certificate, leaf first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConnectionState {
    pub version: String,
    pub cipher_suite: String,
    pub negotiated_protocol: String,
    pub peer_certificates: Vec<Bytes>,
}
