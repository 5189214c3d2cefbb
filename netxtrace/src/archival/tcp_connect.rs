use chrono::{DateTime, Utc};
use netxtrace_common::{Event, EventName};
use serde::Serialize;

use super::{is_zero, seconds_since};
use crate::probes::network::split_host_port;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcpConnectStatus {
    pub failure: Option<String>,
    pub success: bool,
}

/// One entry of the `tcp_connect` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcpConnectEntry {
    #[serde(skip_serializing_if = "is_zero")]
    pub conn_id: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub dial_id: i64,
    pub ip: String,
    pub port: u16,
    pub status: TcpConnectStatus,
    pub t: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub transaction_id: i64,
}

/// One entry per `connect` event, in trace order. An address that does
/// not split into host and port yields an empty ip and port 0.
pub fn new_tcp_connect_list(begin: DateTime<Utc>, events: &[Event]) -> Vec<TcpConnectEntry> {
    events
        .iter()
        .filter(|event| event.name == EventName::Connect)
        .map(|event| {
            let (ip, port) = event
                .address
                .as_deref()
                .and_then(split_host_port)
                .map(|(host, port)| (host.to_string(), port.parse().unwrap_or(0)))
                .unwrap_or_default();
            TcpConnectEntry {
                conn_id: event.conn_id,
                dial_id: event.dial_id,
                ip,
                port,
                status: TcpConnectStatus {
                    failure: event.failure.clone(),
                    success: event.succeeded(),
                },
                t: seconds_since(begin, event.time),
                transaction_id: event.transaction_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archival::tests::at;
    use netxtrace_common::failure;

    #[test]
    fn test_only_connect_events() {
        let begin = Utc::now();
        let mut ok = at(begin, 100, EventName::Connect);
        ok.address = Some("93.184.216.34:443".into());
        ok.dial_id = 3;
        let mut refused = at(begin, 250, EventName::Connect);
        refused.address = Some("[2001:db8::1]:80".into());
        refused.failure = Some(failure::CONNECTION_REFUSED.into());
        let read = at(begin, 300, EventName::Read);

        let list = new_tcp_connect_list(begin, &[ok, read, refused]);
        assert_eq!(list.len(), 2);

        assert_eq!(list[0].ip, "93.184.216.34");
        assert_eq!(list[0].port, 443);
        assert!(list[0].status.success);
        assert_eq!(list[0].t, 0.1);
        assert_eq!(list[1].ip, "2001:db8::1");
        assert_eq!(list[1].port, 80);
        assert!(!list[1].status.success);
        assert_eq!(list[1].status.failure.as_deref(), Some("connection_refused"));
    }

    #[test]
    fn test_json_shape() {
        let begin = Utc::now();
        let mut event = at(begin, 0, EventName::Connect);
        event.address = Some("10.0.0.1:80".into());
        event.dial_id = 2;

        let list = new_tcp_connect_list(begin, &[event]);
        assert_eq!(
            serde_json::to_string(&list[0]).unwrap(),
            r#"{"dial_id":2,"ip":"10.0.0.1","port":80,"status":{"failure":null,"success":true},"t":0.0}"#
        );
    }

    #[test]
    fn test_unparsable_address() {
        let begin = Utc::now();
        let mut event = at(begin, 0, EventName::Connect);
        event.address = Some("not an address".into());
        let list = new_tcp_connect_list(begin, &[event, at(begin, 1, EventName::Connect)]);
        for entry in list {
            assert_eq!(entry.ip, "");
            assert_eq!(entry.port, 0);
        }
    }
}
