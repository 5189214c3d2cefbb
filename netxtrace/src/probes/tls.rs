//! TLS handshake probe.

use anyhow::Result;
use netxtrace_common::{EventName, operation};

use crate::context::{Context, CorrelationIds, compute_conn_id};
use crate::errors::maybe_wrap;
use crate::probes::{NetConn, PendingEvent, TlsConn, TlsDialer, until_deadline};
use crate::trace::Trace;

/// Records a `tls_handshake_done` event per TLS dial, including the
/// negotiated parameters and the peer certificate chain.
pub struct SavingTlsDialer<T> {
    inner: T,
    trace: Trace,
}

impl<T: TlsDialer> SavingTlsDialer<T> {
    pub fn new(inner: T, trace: Trace) -> Self {
        Self { inner, trace }
    }
}

impl<T: TlsDialer> TlsDialer for SavingTlsDialer<T> {
    type Conn = T::Conn;

    async fn dial_tls(&self, ctx: Context, network: &str, address: &str) -> Result<T::Conn> {
        let mut pending = PendingEvent::start(
            &self.trace,
            EventName::TlsHandshakeDone,
            operation::TLS_HANDSHAKE,
            &ctx,
        );
        pending.describe(|event| {
            event.address = Some(address.to_string());
            event.proto = Some(network.to_string());
        });

        let result = until_deadline(&ctx, self.inner.dial_tls(ctx, network, address)).await;
        let (conn_id, state) = match &result {
            Ok(conn) => (
                compute_conn_id(network, conn.local_addr()),
                Some(conn.connection_state()),
            ),
            Err(_) => (0, None),
        };
        let ids = CorrelationIds {
            conn_id,
            ..CorrelationIds::from(&ctx)
        };
        let (result, normalized) = maybe_wrap(result, operation::TLS_HANDSHAKE, ids);
        pending.describe(|event| event.tls = state);
        pending.finish(normalized, ids);
        result
    }
}
