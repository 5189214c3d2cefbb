//! Conversion of a finished trace into the archival data format.
//!
//! Every list is rebuilt from the events on each call; the events are
//! never modified. Times are seconds since `begin`, clamped at zero.

mod binary;
mod dns;
mod extensions;
mod network_events;
mod requests;
mod tcp_connect;
mod tls;

use chrono::{DateTime, Utc};
use netxtrace_common::Event;
use serde::{Serialize, Serializer};

pub use binary::{BinaryValueError, HttpHeader, MaybeBinaryValue};
pub use dns::{DnsAnswerEntry, DnsQueryEntry, new_dns_queries_list};
pub use extensions::{
    EXT_DNS, EXT_HTTP, EXT_NETEVENTS, EXT_TCP_CONNECT, EXT_TLS_HANDSHAKE, Extension,
};
pub use network_events::{NetworkEvent, new_network_events_list};
pub use requests::{HttpRequestEntry, HttpResponseEntry, HttpTor, RequestEntry, new_request_list};
pub use tcp_connect::{TcpConnectEntry, TcpConnectStatus, new_tcp_connect_list};
pub use tls::{TlsHandshake, new_tls_handshakes_list};

/// All archival lists derived from one trace. Empty lists serialize as
/// `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchivalBundle {
    #[serde(serialize_with = "null_if_empty")]
    pub network_events: Vec<NetworkEvent>,
    #[serde(serialize_with = "null_if_empty")]
    pub queries: Vec<DnsQueryEntry>,
    #[serde(serialize_with = "null_if_empty")]
    pub requests: Vec<RequestEntry>,
    #[serde(serialize_with = "null_if_empty")]
    pub tcp_connect: Vec<TcpConnectEntry>,
    #[serde(serialize_with = "null_if_empty")]
    pub tls_handshakes: Vec<TlsHandshake>,
}

pub fn serialize(events: &[Event], begin: DateTime<Utc>) -> ArchivalBundle {
    ArchivalBundle {
        network_events: new_network_events_list(begin, events),
        queries: new_dns_queries_list(begin, events),
        requests: new_request_list(begin, events),
        tcp_connect: new_tcp_connect_list(begin, events),
        tls_handshakes: new_tls_handshakes_list(begin, events),
    }
}

/// Seconds elapsed from `begin` to `time`, never negative.
fn seconds_since(begin: DateTime<Utc>, time: DateTime<Utc>) -> f64 {
    (time - begin)
        .to_std()
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0)
}

fn is_zero(id: &i64) -> bool {
    *id == 0
}

#[allow(clippy::ptr_arg)]
fn null_if_empty<T: Serialize, S: Serializer>(items: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error> {
    if items.is_empty() {
        serializer.serialize_none()
    } else {
        items.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use netxtrace_common::{EventName, HttpRequest, HttpResponse, TlsConnectionState};
    use serde_json::{Value, json};

    pub(crate) fn at(begin: DateTime<Utc>, millis: i64, name: EventName) -> Event {
        Event::new(name, begin + chrono::Duration::milliseconds(millis))
    }

    #[test]
    fn test_seconds_since() {
        let begin = Utc::now();
        let later = begin + chrono::Duration::milliseconds(1500);
        assert_eq!(seconds_since(begin, later), 1.5);
        assert_eq!(seconds_since(later, begin), 0.0);
    }

    #[test]
    fn test_empty_trace() {
        let bundle = serialize(&[], Utc::now());
        assert_eq!(
            serde_json::to_value(&bundle).unwrap(),
            json!({
                "network_events": null,
                "queries": null,
                "requests": null,
                "tcp_connect": null,
                "tls_handshakes": null,
            })
        );
    }

    #[test]
    fn test_serialize_full_trace() {
        let begin = Utc::now();

        let mut resolve = at(begin, 10, EventName::ResolveDone);
        resolve.hostname = Some("example.com".into());
        resolve.proto = Some("system".into());
        resolve.addresses = vec!["93.184.216.34".into()];

        let mut connect = at(begin, 20, EventName::Connect);
        connect.address = Some("93.184.216.34:443".into());
        connect.proto = Some("tcp".into());
        connect.conn_id = 50000;

        let mut handshake = at(begin, 30, EventName::TlsHandshakeDone);
        handshake.conn_id = 50000;
        handshake.tls = Some(TlsConnectionState {
            version: "TLSv1.3".into(),
            ..Default::default()
        });

        let mut round_trip = at(begin, 40, EventName::HttpRoundTripDone);
        round_trip.transaction_id = 1;
        round_trip.http_request = Some(HttpRequest::get("https://example.com/").snapshot());
        round_trip.http_response = Some(
            HttpResponse {
                status_code: 200,
                headers: Default::default(),
                body: Bytes::new(),
            }
            .snapshot(),
        );

        let events = vec![resolve, connect, handshake, round_trip];
        let first = serialize(&events, begin);
        let second = serialize(&events, begin);
        assert_eq!(first, second);

        assert_eq!(first.queries.len(), 1);
        assert_eq!(first.tcp_connect.len(), 1);
        assert_eq!(first.tls_handshakes.len(), 1);
        assert_eq!(first.requests.len(), 1);
        assert_eq!(first.network_events.len(), 4);

        let json = serde_json::to_value(&first).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec!["network_events", "queries", "requests", "tcp_connect", "tls_handshakes"]
        );
        assert_eq!(json["tcp_connect"][0]["t"], Value::from(0.02));
    }
}
