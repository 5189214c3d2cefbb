//! Correlation identifiers threaded through every instrumented call.
//!
//! A [`Context`] is an immutable value: setting an id returns a new
//! context and leaves the original untouched. Ids that were never set
//! read as zero, which the archival format omits.
//!
//! A context may also carry the caller's deadline. Wrappers stop waiting
//! for the wrapped operation once it passes and record it as canceled.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Context {
    dial_id: i64,
    transaction_id: i64,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dial_id(self, dial_id: i64) -> Self {
        Self { dial_id, ..self }
    }

    pub fn dial_id(&self) -> i64 {
        self.dial_id
    }

    pub fn with_transaction_id(self, transaction_id: i64) -> Self {
        Self {
            transaction_id,
            ..self
        }
    }

    pub fn transaction_id(&self) -> i64 {
        self.transaction_id
    }

    /// Keeps the earlier of `deadline` and any deadline already set, so a
    /// derived context never outlives its parent.
    pub fn with_deadline(self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Ids attached to one recorded event and to the error it produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationIds {
    pub conn_id: i64,
    pub dial_id: i64,
    pub transaction_id: i64,
}

impl From<&Context> for CorrelationIds {
    fn from(ctx: &Context) -> Self {
        Self {
            conn_id: 0,
            dial_id: ctx.dial_id(),
            transaction_id: ctx.transaction_id(),
        }
    }
}

/// Hands out 1, 2, 3, ... for the lifetime of one measurement.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Connection id derived from the local endpoint: the local port for
/// TCP, its negation for UDP, and -1 when it cannot be determined.
pub fn compute_conn_id(network: &str, local_addr: Option<SocketAddr>) -> i64 {
    let Some(addr) = local_addr else {
        return -1;
    };
    let port = i64::from(addr.port());
    match network {
        "tcp" | "tcp4" | "tcp6" => port,
        "udp" | "udp4" | "udp6" => -port,
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_ids_read_as_zero() {
        let ctx = Context::new();
        assert_eq!(ctx.dial_id(), 0);
        assert_eq!(ctx.transaction_id(), 0);
    }

    #[test]
    fn test_setting_returns_new_context() {
        let base = Context::new().with_transaction_id(7);
        let derived = base.with_dial_id(3);

        assert_eq!(base.dial_id(), 0);
        assert_eq!(base.transaction_id(), 7);
        assert_eq!(derived.dial_id(), 3);
        assert_eq!(derived.transaction_id(), 7);
    }

    #[test]
    fn test_deadline_only_shrinks() {
        let now = Instant::now();
        let early = now + std::time::Duration::from_secs(1);
        let late = now + std::time::Duration::from_secs(5);

        assert_eq!(Context::new().deadline(), None);
        let ctx = Context::new().with_deadline(late).with_deadline(early);
        assert_eq!(ctx.deadline(), Some(early));
        assert_eq!(ctx.with_deadline(late).deadline(), Some(early));
        assert_eq!(ctx.with_dial_id(2).deadline(), Some(early));
    }

    #[test]
    fn test_ids_from_context() {
        let ctx = Context::new().with_dial_id(4).with_transaction_id(9);
        let ids = CorrelationIds::from(&ctx);
        assert_eq!(
            ids,
            CorrelationIds {
                conn_id: 0,
                dial_id: 4,
                transaction_id: 9
            }
        );
    }

    #[test]
    fn test_id_generator_is_sequential() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next(), 1);
        assert_eq!(ids.next(), 2);
        assert_eq!(ids.next(), 3);
    }

    #[test]
    fn test_compute_conn_id() {
        let addr: SocketAddr = "10.0.0.1:54321".parse().unwrap();
        assert_eq!(compute_conn_id("tcp", Some(addr)), 54321);
        assert_eq!(compute_conn_id("udp", Some(addr)), -54321);
        assert_eq!(compute_conn_id("unix", Some(addr)), -1);
        assert_eq!(compute_conn_id("tcp", None), -1);
    }
}
