use chrono::{DateTime, Utc};
use netxtrace_common::{Event, EventName};
use serde::Serialize;

use super::{MaybeBinaryValue, is_zero, seconds_since};

/// One entry of the `tls_handshakes` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlsHandshake {
    pub cipher_suite: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub conn_id: i64,
    pub failure: Option<String>,
    pub negotiated_protocol: String,
    /// DER certificates, leaf first. `None` when the peer sent none.
    pub peer_certificates: Option<Vec<MaybeBinaryValue>>,
    pub t: f64,
    pub tls_version: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub transaction_id: i64,
}

pub fn new_tls_handshakes_list(begin: DateTime<Utc>, events: &[Event]) -> Vec<TlsHandshake> {
    events
        .iter()
        .filter(|event| event.name == EventName::TlsHandshakeDone)
        .map(|event| {
            let state = event.tls.clone().unwrap_or_default();
            let peer_certificates = (!state.peer_certificates.is_empty()).then(|| {
                state
                    .peer_certificates
                    .into_iter()
                    .map(MaybeBinaryValue)
                    .collect()
            });
            TlsHandshake {
                cipher_suite: state.cipher_suite,
                conn_id: event.conn_id,
                failure: event.failure.clone(),
                negotiated_protocol: state.negotiated_protocol,
                peer_certificates,
                t: seconds_since(begin, event.time),
                tls_version: state.version,
                transaction_id: event.transaction_id,
            }
        })
        .collect()
}
