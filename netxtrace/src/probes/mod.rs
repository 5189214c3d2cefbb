//! Instrumentation wrappers around the network capabilities a measurement
//! uses.
//!
//! Every capability is a small trait with one operation. A saving wrapper
//! owns one inner implementation of the same trait, performs the inner
//! operation, normalizes its outcome and appends one [`Event`] to the
//! shared [`Trace`](crate::trace::Trace). Errors still reach the caller:
//! they come back inside an [`ErrWrapper`](crate::errors::ErrWrapper) whose
//! message is the raw one.

use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Result;
use netxtrace_common::{Event, EventName, HttpRequest, HttpResponse, TlsConnectionState};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::context::{Context, CorrelationIds};
use crate::errors::{Canceled, NormalizedError, normalize_error};
use crate::trace::Trace;

pub mod http;
pub mod network;
pub mod tls;

/// Name resolution: hostname to a list of address strings.
pub trait Resolver: Send + Sync {
    fn lookup_host(
        &self,
        ctx: Context,
        hostname: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Engine name reported in the archival `engine` field.
    fn network(&self) -> &str;

    /// Resolver endpoint; empty for the system resolver.
    fn address(&self) -> &str;
}

/// A connected byte stream.
pub trait NetConn: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    fn local_addr(&self) -> Option<SocketAddr>;
}

impl NetConn for tokio::net::TcpStream {
    fn local_addr(&self) -> Option<SocketAddr> {
        tokio::net::TcpStream::local_addr(self).ok()
    }
}

/// Byte-stream dialing: `network` is `tcp`, `udp`, ...; `address` is
/// `host:port`.
pub trait Dialer: Send + Sync {
    type Conn: NetConn;

    fn dial(
        &self,
        ctx: Context,
        network: &str,
        address: &str,
    ) -> impl Future<Output = Result<Self::Conn>> + Send;
}

/// A connection that completed a TLS handshake.
pub trait TlsConn: NetConn {
    fn connection_state(&self) -> TlsConnectionState;
}

/// Dials `address` and performs the TLS handshake on top.
pub trait TlsDialer: Send + Sync {
    type Conn: TlsConn;

    fn dial_tls(
        &self,
        ctx: Context,
        network: &str,
        address: &str,
    ) -> impl Future<Output = Result<Self::Conn>> + Send;
}

/// One HTTP request/response exchange. The response body is fully read.
pub trait HttpTransport: Send + Sync {
    fn round_trip(
        &self,
        ctx: Context,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Awaits `operation`, giving up with [`Canceled`] once the deadline of
/// `ctx` passes.
async fn until_deadline<T>(ctx: &Context, operation: impl Future<Output = Result<T>>) -> Result<T> {
    match ctx.deadline() {
        Some(deadline) => match tokio::time::timeout_at(deadline, operation).await {
            Ok(result) => result,
            Err(_) => Err(Canceled.into()),
        },
        None => operation.await,
    }
}

/// The event a saving wrapper appends for one operation.
///
/// If it is dropped before [`PendingEvent::finish`], because the caller
/// abandoned the wrapper's future, the event is appended anyway, failed
/// with [`Canceled`].
struct PendingEvent {
    trace: Trace,
    started: Instant,
    candidate: &'static str,
    ids: CorrelationIds,
    event: Option<Event>,
}

impl PendingEvent {
    fn start(trace: &Trace, name: EventName, candidate: &'static str, ctx: &Context) -> Self {
        Self {
            trace: trace.clone(),
            started: Instant::now(),
            candidate,
            ids: CorrelationIds::from(ctx),
            event: Some(Event::new(name, trace.now())),
        }
    }

    /// Sets the fields known before the operation completes.
    fn describe(&mut self, fill: impl FnOnce(&mut Event)) {
        if let Some(event) = self.event.as_mut() {
            fill(event);
        }
    }

    fn finish(mut self, normalized: NormalizedError, ids: CorrelationIds) {
        if let Some(event) = self.event.take() {
            self.append(event, normalized, ids);
        }
    }

    fn append(&self, mut event: Event, normalized: NormalizedError, ids: CorrelationIds) {
        event.time = self.trace.now();
        event.duration = self.started.elapsed();
        record_outcome(&mut event, normalized, ids);
        self.trace.append(event);
    }
}

impl Drop for PendingEvent {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            let canceled = &Canceled as &(dyn StdError + 'static);
            let normalized = normalize_error(Some(canceled), self.candidate);
            self.append(event, normalized, self.ids);
        }
    }
}

/// Copies the normalized outcome and the correlation ids into `event`.
fn record_outcome(event: &mut Event, normalized: NormalizedError, ids: CorrelationIds) {
    if normalized.failure.is_some() {
        event.failure = normalized.failure;
        event.operation = Some(normalized.operation);
    }
    event.conn_id = ids.conn_id;
    event.dial_id = ids.dial_id;
    event.transaction_id = ids.transaction_id;
}
