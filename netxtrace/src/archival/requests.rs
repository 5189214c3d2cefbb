use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use netxtrace_common::{Event, EventName, Headers};
use serde::Serialize;

use super::{HttpHeader, MaybeBinaryValue, is_zero, seconds_since};

/// Tor information. This probe never goes through Tor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpTor {
    pub exit_ip: Option<String>,
    pub exit_name: Option<String>,
    pub is_tor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpRequestEntry {
    pub body: MaybeBinaryValue,
    pub body_is_truncated: bool,
    pub headers_list: Option<Vec<HttpHeader>>,
    pub headers: Option<BTreeMap<String, MaybeBinaryValue>>,
    pub method: String,
    pub tor: HttpTor,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpResponseEntry {
    pub body: MaybeBinaryValue,
    pub body_is_truncated: bool,
    pub code: i64,
    pub headers_list: Option<Vec<HttpHeader>>,
    pub headers: Option<BTreeMap<String, MaybeBinaryValue>>,
}

/// One entry of the `requests` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEntry {
    pub failure: Option<String>,
    pub request: HttpRequestEntry,
    pub response: HttpResponseEntry,
    pub t: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub transaction_id: i64,
}

/// Builds both header views in one pass: the list keeps every value in
/// order, the map keeps the last value seen for each key.
fn header_views(
    headers: &Headers,
) -> (
    Option<Vec<HttpHeader>>,
    Option<BTreeMap<String, MaybeBinaryValue>>,
) {
    let mut list = Vec::with_capacity(headers.len());
    let mut map = BTreeMap::new();
    for (key, value) in headers.iter() {
        let value = MaybeBinaryValue(value.clone());
        map.insert(key.to_string(), value.clone());
        list.push(HttpHeader {
            key: key.to_string(),
            value,
        });
    }
    let list = (!list.is_empty()).then_some(list);
    (list, Some(map))
}

/// One entry per `http_round_trip_done` event, most recent first.
pub fn new_request_list(begin: DateTime<Utc>, events: &[Event]) -> Vec<RequestEntry> {
    events
        .iter()
        .rev()
        .filter(|event| event.name == EventName::HttpRoundTripDone)
        .map(|event| {
            let mut request = HttpRequestEntry::default();
            if let Some(snapshot) = &event.http_request {
                (request.headers_list, request.headers) = header_views(&snapshot.headers);
                request.method = snapshot.method.clone();
                request.url = snapshot.url.clone();
            }
            if let Some(body) = &event.http_request_body {
                request.body = MaybeBinaryValue(body.data.clone());
                request.body_is_truncated = body.truncated;
            }

            let mut response = HttpResponseEntry::default();
            if let Some(snapshot) = &event.http_response {
                (response.headers_list, response.headers) = header_views(&snapshot.headers);
                response.code = i64::from(snapshot.status_code);
            }
            if let Some(body) = &event.http_response_body {
                response.body = MaybeBinaryValue(body.data.clone());
                response.body_is_truncated = body.truncated;
            }

            RequestEntry {
                failure: event.failure.clone(),
                request,
                response,
                t: seconds_since(begin, event.time),
                transaction_id: event.transaction_id,
            }
        })
        .collect()
}
