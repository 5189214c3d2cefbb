use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::http::{BodySnapshot, RequestSnapshot, ResponseSnapshot};
use crate::tls::TlsConnectionState;

/// Kind of a recorded event. Unknown names pass through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    Connect,
    Read,
    Write,
    ResolveDone,
    HttpRoundTripDone,
    TlsHandshakeDone,
    Other(String),
}

impl EventName {
    pub fn as_str(&self) -> &str {
        match self {
            EventName::Connect => "connect",
            EventName::Read => "read",
            EventName::Write => "write",
            EventName::ResolveDone => "resolve_done",
            EventName::HttpRoundTripDone => "http_round_trip_done",
            EventName::TlsHandshakeDone => "tls_handshake_done",
            EventName::Other(name) => name,
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        match name {
            "connect" => EventName::Connect,
            "read" => EventName::Read,
            "write" => EventName::Write,
            "resolve_done" => EventName::ResolveDone,
            "http_round_trip_done" => EventName::HttpRoundTripDone,
            "tls_handshake_done" => EventName::TlsHandshakeDone,
            other => EventName::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed network-level occurrence.
///
/// `failure` and `operation` hold the already-normalized failure string
/// and the operation it is attributed to; both are `None` on success.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: EventName,
    pub time: DateTime<Utc>,
    pub duration: Duration,
    pub failure: Option<String>,
    pub operation: Option<String>,
    pub address: Option<String>,
    pub proto: Option<String>,
    pub num_bytes: u64,

    // Resolution
    pub hostname: Option<String>,
    pub addresses: Vec<String>,

    // HTTP
    pub http_request: Option<RequestSnapshot>,
    pub http_request_body: Option<BodySnapshot>,
    pub http_response: Option<ResponseSnapshot>,
    pub http_response_body: Option<BodySnapshot>,

    // TLS
    pub tls: Option<TlsConnectionState>,

    // Correlation
    pub conn_id: i64,
    pub dial_id: i64,
    pub transaction_id: i64,
}

impl Event {
    pub fn new(name: EventName, time: DateTime<Utc>) -> Self {
        Self {
            name,
            time,
            duration: Duration::ZERO,
            failure: None,
            operation: None,
            address: None,
            proto: None,
            num_bytes: 0,
            hostname: None,
            addresses: Vec::new(),
            http_request: None,
            http_request_body: None,
            http_response: None,
            http_response_body: None,
            tls: None,
            conn_id: 0,
            dial_id: 0,
            transaction_id: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}
