//! Data model shared by the netxtrace instrumentation layer and the
//! archival serializer.
//!
//! Nothing in here performs I/O: the probes fill these types in while
//! observing network operations and the archival module reads them back.

mod event;
mod http;
mod measurement;
mod tls;

pub use event::{Event, EventName};
pub use http::{BodySnapshot, Headers, HttpRequest, HttpResponse, RequestSnapshot, ResponseSnapshot};
pub use measurement::{DATA_FORMAT_VERSION, Measurement};
pub use tls::TlsConnectionState;

/// Failure strings that may appear in a report.
pub mod failure {
    pub const GENERIC_TIMEOUT_ERROR: &str = "generic_timeout_error";
    pub const EOF_ERROR: &str = "eof_error";
    pub const DNS_NXDOMAIN_ERROR: &str = "dns_nxdomain_error";
    pub const DNS_BOGON_ERROR: &str = "dns_bogon_error";
    pub const SSL_INVALID_HOSTNAME: &str = "ssl_invalid_hostname";
    pub const SSL_UNKNOWN_AUTHORITY: &str = "ssl_unknown_authority";
    pub const SSL_INVALID_CERTIFICATE: &str = "ssl_invalid_certificate";
    pub const CONNECTION_REFUSED: &str = "connection_refused";
    pub const CONNECTION_RESET: &str = "connection_reset";
    /// Prefix of the catch-all category. The scrubbed error text follows it.
    pub const UNKNOWN_FAILURE_PREFIX: &str = "unknown_failure: ";
}

/// Operation names attributed to failures.
pub mod operation {
    pub const CONNECT: &str = "connect";
    pub const RESOLVE: &str = "resolve";
    pub const TLS_HANDSHAKE: &str = "tls_handshake";
    pub const HTTP_ROUND_TRIP: &str = "http_round_trip";
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";

    /// Operations that keep their attribution as an error travels outward.
    pub const MAJOR: [&str; 4] = [CONNECT, RESOLVE, TLS_HANDSHAKE, HTTP_ROUND_TRIP];

    pub fn is_major(operation: &str) -> bool {
        MAJOR.contains(&operation)
    }
}

/// Runtime knobs resolved from settings, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetxConfig {
    pub max_body_snapshot_size: usize,
    pub connect_timeout_secs: u64,
    pub round_trip_timeout_secs: u64,
    pub bogon_check: bool,
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_operations() {
        assert!(operation::is_major("connect"));
        assert!(operation::is_major("resolve"));
        assert!(operation::is_major("tls_handshake"));
        assert!(operation::is_major("http_round_trip"));
        assert!(!operation::is_major("read"));
        assert!(!operation::is_major("write"));
        assert!(!operation::is_major(""));
    }
}
