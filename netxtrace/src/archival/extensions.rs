use std::collections::BTreeMap;

use netxtrace_common::Measurement;

/// A data format extension and the version this crate emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub name: &'static str,
    pub version: i64,
}

/// `dnst`: the `queries` list.
pub const EXT_DNS: Extension = Extension::new("dnst", 0);
/// `netevents`: the `network_events` list.
pub const EXT_NETEVENTS: Extension = Extension::new("netevents", 0);
/// `httpt`: the `requests` list.
pub const EXT_HTTP: Extension = Extension::new("httpt", 0);
/// `tcpconnect`: the `tcp_connect` list.
pub const EXT_TCP_CONNECT: Extension = Extension::new("tcpconnect", 0);
/// `tlshandshake`: the `tls_handshakes` list.
pub const EXT_TLS_HANDSHAKE: Extension = Extension::new("tlshandshake", 0);

impl Extension {
    pub const fn new(name: &'static str, version: i64) -> Self {
        Self { name, version }
    }

    /// Declares this extension on `measurement`, replacing any version
    /// registered earlier under the same name.
    pub fn add_to(&self, measurement: &mut Measurement) {
        measurement
            .extensions
            .get_or_insert_with(BTreeMap::new)
            .insert(self.name.to_string(), self.version);
    }
}
