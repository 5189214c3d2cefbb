//! Dialing probes.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use log::debug;
use netxtrace_common::{EventName, operation};
use tokio::net::TcpStream;

use super::{SavingConn, join_host_port, split_host_port};
use crate::context::{Context, CorrelationIds, IdGenerator, compute_conn_id};
use crate::errors::{NoSuchHostError, maybe_wrap};
use crate::probes::{Dialer, NetConn, PendingEvent, Resolver, until_deadline};
use crate::trace::Trace;

/// Records a `connect` event per dial and hands back connections that
/// record their reads and writes.
pub struct SavingDialer<D> {
    inner: D,
    trace: Trace,
}

impl<D: Dialer> SavingDialer<D> {
    pub fn new(inner: D, trace: Trace) -> Self {
        Self { inner, trace }
    }
}

impl<D: Dialer> Dialer for SavingDialer<D> {
    type Conn = SavingConn<D::Conn>;

    async fn dial(&self, ctx: Context, network: &str, address: &str) -> Result<Self::Conn> {
        let mut pending =
            PendingEvent::start(&self.trace, EventName::Connect, operation::CONNECT, &ctx);
        pending.describe(|event| {
            event.address = Some(address.to_string());
            event.proto = Some(network.to_string());
        });

        let result = until_deadline(&ctx, self.inner.dial(ctx, network, address)).await;
        let conn_id = match &result {
            Ok(conn) => compute_conn_id(network, conn.local_addr()),
            Err(_) => 0,
        };
        let ids = CorrelationIds {
            conn_id,
            ..CorrelationIds::from(&ctx)
        };
        let (result, normalized) = maybe_wrap(result, operation::CONNECT, ids);
        pending.finish(normalized, ids);

        result.map(|conn| SavingConn::new(conn, network, ids, self.trace.clone()))
    }
}

/// Plain TCP through tokio, bounded by a connect timeout.
#[derive(Debug, Clone, Copy)]
pub struct SystemDialer {
    connect_timeout: Duration,
}

impl SystemDialer {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Dialer for SystemDialer {
    type Conn = TcpStream;

    async fn dial(&self, _ctx: Context, network: &str, address: &str) -> Result<TcpStream> {
        if !matches!(network, "tcp" | "tcp4" | "tcp6") {
            bail!("dial {network} {address}: unsupported network");
        }
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(address)).await??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Resolves the host part of the address and dials every resolved
/// address in order until one succeeds.
///
/// Each dial gets a fresh dial id, shared by the lookup and every
/// connect attempt it causes.
pub struct DnsDialer<R, D> {
    resolver: R,
    dialer: D,
    ids: Arc<IdGenerator>,
}

impl<R: Resolver, D: Dialer> DnsDialer<R, D> {
    pub fn new(resolver: R, dialer: D, ids: Arc<IdGenerator>) -> Self {
        Self {
            resolver,
            dialer,
            ids,
        }
    }
}

impl<R: Resolver, D: Dialer> Dialer for DnsDialer<R, D> {
    type Conn = D::Conn;

    async fn dial(&self, ctx: Context, network: &str, address: &str) -> Result<D::Conn> {
        let ctx = ctx.with_dial_id(self.ids.next());
        let Some((host, port)) = split_host_port(address) else {
            bail!("address {address}: missing port in address");
        };

        let addresses = if host.parse::<IpAddr>().is_ok() {
            vec![host.to_string()]
        } else {
            self.resolver.lookup_host(ctx, host).await?
        };

        let mut first_err = None;
        for addr in &addresses {
            let target = join_host_port(addr, port);
            match self.dialer.dial(ctx, network, &target).await {
                Ok(conn) => return Ok(conn),
                Err(err) => {
                    debug!("dial {target} failed: {err}");
                    first_err.get_or_insert(err);
                }
            }
        }
        Err(first_err.unwrap_or_else(|| {
            NoSuchHostError {
                hostname: host.to_string(),
            }
            .into()
        }))
    }
}
