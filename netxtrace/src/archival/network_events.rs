use chrono::{DateTime, Utc};
use netxtrace_common::{Event, EventName};
use serde::Serialize;

use super::{is_zero, seconds_since};

/// One entry of the `network_events` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEvent {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub conn_id: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub dial_id: i64,
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "is_zero_bytes")]
    pub num_bytes: u64,
    pub operation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub proto: String,
    pub t: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub transaction_id: i64,
}

fn is_zero_bytes(n: &u64) -> bool {
    *n == 0
}

/// One entry per event, in trace order. Only `connect` carries the
/// address; only `connect`, `read` and `write` carry the protocol; only
/// `read` and `write` carry a byte count.
pub fn new_network_events_list(begin: DateTime<Utc>, events: &[Event]) -> Vec<NetworkEvent> {
    events
        .iter()
        .map(|event| {
            let mut entry = NetworkEvent {
                address: String::new(),
                conn_id: event.conn_id,
                dial_id: event.dial_id,
                failure: event.failure.clone(),
                num_bytes: 0,
                operation: event.name.to_string(),
                proto: String::new(),
                t: seconds_since(begin, event.time),
                transaction_id: event.transaction_id,
            };
            match event.name {
                EventName::Connect => {
                    entry.address = event.address.clone().unwrap_or_default();
                    entry.proto = event.proto.clone().unwrap_or_default();
                }
                EventName::Read | EventName::Write => {
                    entry.num_bytes = event.num_bytes;
                    entry.proto = event.proto.clone().unwrap_or_default();
                }
                _ => {}
            }
            entry
        })
        .collect()
}
