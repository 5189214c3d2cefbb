use chrono::{DateTime, Utc};
use netxtrace_common::{Event, EventName};
use serde::Serialize;

use super::{is_zero, seconds_since};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsAnswerEntry {
    pub answer_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ipv4: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ipv6: String,
    pub ttl: Option<u32>,
}

/// One entry of the `queries` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsQueryEntry {
    pub answers: Vec<DnsAnswerEntry>,
    #[serde(skip_serializing_if = "is_zero")]
    pub dial_id: i64,
    pub engine: String,
    pub failure: Option<String>,
    pub hostname: String,
    pub query_type: String,
    pub resolver_hostname: Option<String>,
    pub resolver_port: Option<String>,
    pub resolver_address: String,
    pub t: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub transaction_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryType {
    A,
    Aaaa,
}

impl QueryType {
    const ALL: [QueryType; 2] = [QueryType::A, QueryType::Aaaa];

    fn as_str(self) -> &'static str {
        match self {
            QueryType::A => "A",
            QueryType::Aaaa => "AAAA",
        }
    }

    // Any `:` means IPv6. Strings are not validated as addresses.
    fn matches(self, address: &str) -> bool {
        match self {
            QueryType::A => !address.contains(':'),
            QueryType::Aaaa => address.contains(':'),
        }
    }

    fn answer(self, address: &str) -> DnsAnswerEntry {
        let (ipv4, ipv6) = match self {
            QueryType::A => (address.to_string(), String::new()),
            QueryType::Aaaa => (String::new(), address.to_string()),
        };
        DnsAnswerEntry {
            answer_type: self.as_str().to_string(),
            hostname: String::new(),
            ipv4,
            ipv6,
            ttl: None,
        }
    }
}

/// For every `resolve_done` event, one `A` entry and one `AAAA` entry,
/// each emitted only when at least one address is of its type.
///
/// A failed lookup has no addresses and therefore yields no entry.
pub fn new_dns_queries_list(begin: DateTime<Utc>, events: &[Event]) -> Vec<DnsQueryEntry> {
    let mut out = Vec::new();
    for event in events.iter().filter(|e| e.name == EventName::ResolveDone) {
        for qtype in QueryType::ALL {
            let answers: Vec<DnsAnswerEntry> = event
                .addresses
                .iter()
                .filter(|addr| qtype.matches(addr))
                .map(|addr| qtype.answer(addr))
                .collect();
            if answers.is_empty() {
                continue;
            }
            out.push(DnsQueryEntry {
                answers,
                dial_id: event.dial_id,
                engine: event.proto.clone().unwrap_or_default(),
                failure: event.failure.clone(),
                hostname: event.hostname.clone().unwrap_or_default(),
                query_type: qtype.as_str().to_string(),
                resolver_hostname: None,
                resolver_port: None,
                resolver_address: event.address.clone().unwrap_or_default(),
                t: seconds_since(begin, event.time),
                transaction_id: event.transaction_id,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archival::tests::at;
    use serde_json::json;

    fn resolve(begin: DateTime<Utc>, addresses: &[&str]) -> Event {
        let mut event = at(begin, 1250, EventName::ResolveDone);
        event.hostname = Some("example.com".into());
        event.proto = Some("system".into());
        event.address = Some(String::new());
        event.addresses = addresses.iter().map(|a| a.to_string()).collect();
        event
    }

    #[test]
    fn test_a_and_aaaa_entries() {
        let begin = Utc::now();
        let event = resolve(begin, &["93.184.216.34", "2606:2800:220:1:248:1893:25c8:1946"]);

        let list = new_dns_queries_list(begin, &[event]);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].query_type, "A");
        assert_eq!(list[0].answers.len(), 1);
        assert_eq!(list[0].answers[0].ipv4, "93.184.216.34");
        assert_eq!(list[1].query_type, "AAAA");
        assert_eq!(list[1].answers[0].ipv6, "2606:2800:220:1:248:1893:25c8:1946");
        assert_eq!(list[0].t, list[1].t);
        assert_eq!(list[0].t, 1.25);
    }

    #[test]
    fn test_only_a_entry() {
        let begin = Utc::now();
        let event = resolve(begin, &["1.1.1.1", "1.0.0.1"]);
        let list = new_dns_queries_list(begin, &[event]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].answers.len(), 2);
    }

    #[test]
    fn test_failed_lookup_yields_nothing() {
        let begin = Utc::now();
        let mut event = resolve(begin, &[]);
        event.failure = Some("dns_nxdomain_error".into());
        assert!(new_dns_queries_list(begin, &[event]).is_empty());
    }

    #[test]
    fn test_classification_is_by_colon_only() {
        let begin = Utc::now();
        let event = resolve(begin, &["not-an-ip", "weird:value"]);
        let list = new_dns_queries_list(begin, &[event]);
        assert_eq!(list[0].answers[0].ipv4, "not-an-ip");
        assert_eq!(list[1].answers[0].ipv6, "weird:value");
    }

    #[test]
    fn test_json_shape() {
        let begin = Utc::now();
        let mut event = resolve(begin, &["93.184.216.34"]);
        event.dial_id = 4;
        let list = new_dns_queries_list(begin, &[event]);
        assert_eq!(
            serde_json::to_value(&list[0]).unwrap(),
            json!({
                "answers": [{"answer_type": "A", "ipv4": "93.184.216.34", "ttl": null}],
                "dial_id": 4,
                "engine": "system",
                "failure": null,
                "hostname": "example.com",
                "query_type": "A",
                "resolver_hostname": null,
                "resolver_port": null,
                "resolver_address": "",
                "t": 1.25,
            })
        );
    }
}
