//! Name resolution probes.

use anyhow::Result;
use netxtrace_common::{EventName, operation};

use crate::bogon::is_bogon;
use crate::context::{Context, CorrelationIds};
use crate::errors::{DnsBogonError, NoSuchHostError, maybe_wrap};
use crate::probes::{PendingEvent, Resolver, until_deadline};
use crate::trace::Trace;

/// Records a `resolve_done` event for every lookup.
pub struct SavingResolver<R> {
    inner: R,
    trace: Trace,
}

impl<R: Resolver> SavingResolver<R> {
    pub fn new(inner: R, trace: Trace) -> Self {
        Self { inner, trace }
    }
}

impl<R: Resolver> Resolver for SavingResolver<R> {
    async fn lookup_host(&self, ctx: Context, hostname: &str) -> Result<Vec<String>> {
        let mut pending =
            PendingEvent::start(&self.trace, EventName::ResolveDone, operation::RESOLVE, &ctx);
        pending.describe(|event| {
            event.hostname = Some(hostname.to_string());
            event.address = Some(self.inner.address().to_string());
            event.proto = Some(self.inner.network().to_string());
        });

        let result = until_deadline(&ctx, self.inner.lookup_host(ctx, hostname)).await;
        let ids = CorrelationIds::from(&ctx);
        let (result, normalized) = maybe_wrap(result, operation::RESOLVE, ids);
        if let Ok(addresses) = &result {
            pending.describe(|event| event.addresses = addresses.clone());
        }
        pending.finish(normalized, ids);
        result
    }

    fn network(&self) -> &str {
        self.inner.network()
    }

    fn address(&self) -> &str {
        self.inner.address()
    }
}

/// Fails lookups whose answer contains a bogon address.
pub struct BogonResolver<R> {
    inner: R,
}

impl<R: Resolver> BogonResolver<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Resolver> Resolver for BogonResolver<R> {
    async fn lookup_host(&self, ctx: Context, hostname: &str) -> Result<Vec<String>> {
        let addresses = self.inner.lookup_host(ctx, hostname).await?;
        if addresses.iter().any(|addr| is_bogon(addr)) {
            return Err(DnsBogonError.into());
        }
        Ok(addresses)
    }

    fn network(&self) -> &str {
        self.inner.network()
    }

    fn address(&self) -> &str {
        self.inner.address()
    }
}

/// The operating system resolver, through tokio's `getaddrinfo` pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    async fn lookup_host(&self, _ctx: Context, hostname: &str) -> Result<Vec<String>> {
        let resolved = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|err| lookup_error(hostname, err))?;

        let mut addresses: Vec<String> = Vec::new();
        for addr in resolved {
            let ip = addr.ip().to_string();
            if !addresses.contains(&ip) {
                addresses.push(ip);
            }
        }
        if addresses.is_empty() {
            return Err(NoSuchHostError {
                hostname: hostname.to_string(),
            }
            .into());
        }
        Ok(addresses)
    }

    fn network(&self) -> &str {
        "system"
    }

    fn address(&self) -> &str {
        ""
    }
}

// getaddrinfo reports NXDOMAIN as EAI_NONAME, which std renders as
// "Name or service not known" (glibc) or "... not known" (BSD libc).
fn lookup_error(hostname: &str, err: std::io::Error) -> anyhow::Error {
    if err.to_string().contains("not known") {
        NoSuchHostError {
            hostname: hostname.to_string(),
        }
        .into()
    } else {
        anyhow::Error::new(err).context(format!("lookup {hostname}"))
    }
}
