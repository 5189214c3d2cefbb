//! Failure normalization.
//!
//! Every error observed by a probe is mapped to a stable failure string
//! and to the operation the failure is attributed to. The raw error is
//! kept: probes hand it back to their caller inside an [`ErrWrapper`],
//! whose `Display` is that of the raw error and whose `source()` is the
//! raw error itself, so `anyhow::Error::chain` and `downcast_ref` on the
//! chain still reach it.

mod classify;
mod scrub;

use std::error::Error as StdError;
use std::fmt;

use crate::context::CorrelationIds;

pub use classify::{NormalizedError, normalize, normalize_error};
pub use scrub::{SCRUBBED, scrub};

/// An error that has already been normalized by a probe.
///
/// Normalizing it again reuses `failure` verbatim, and outer probes keep
/// `operation` when it names a major operation.
#[derive(Debug)]
pub struct ErrWrapper {
    pub failure: String,
    pub operation: String,
    pub conn_id: i64,
    pub dial_id: i64,
    pub transaction_id: i64,
    wrapped: anyhow::Error,
}

impl ErrWrapper {
    pub fn new(wrapped: anyhow::Error, normalized: NormalizedError, ids: CorrelationIds) -> Self {
        Self {
            failure: normalized.failure.unwrap_or_default(),
            operation: normalized.operation,
            conn_id: ids.conn_id,
            dial_id: ids.dial_id,
            transaction_id: ids.transaction_id,
            wrapped,
        }
    }

    /// The error exactly as produced by the wrapped operation.
    pub fn raw(&self) -> &anyhow::Error {
        &self.wrapped
    }

    pub fn into_raw(self) -> anyhow::Error {
        self.wrapped
    }
}

impl fmt::Display for ErrWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.wrapped, f)
    }
}

impl StdError for ErrWrapper {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.wrapped)
    }
}

/// Normalizes the outcome of `operation`. On failure the error comes back
/// inside an [`ErrWrapper`] carrying `ids`.
pub fn maybe_wrap<T>(
    result: anyhow::Result<T>,
    operation: &str,
    ids: CorrelationIds,
) -> (anyhow::Result<T>, NormalizedError) {
    match result {
        Ok(value) => (Ok(value), normalize(None, operation)),
        Err(err) => {
            let normalized = normalize(Some(&err), operation);
            let wrapped = ErrWrapper::new(err, normalized.clone(), ids);
            (Err(anyhow::Error::new(wrapped)), normalized)
        }
    }
}

/// Marker for a resolution that returned a bogon address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dns_bogon_error")]
pub struct DnsBogonError;

/// The resolver reported that the name does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lookup {hostname}: no such host")]
pub struct NoSuchHostError {
    pub hostname: String,
}

/// The caller gave up on the operation before it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation canceled")]
pub struct Canceled;

/// Certificate validation failures reported by a TLS dialer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("x509: certificate is not valid for {hostname}")]
    InvalidHostname { hostname: String },
    #[error("x509: certificate signed by unknown authority")]
    UnknownAuthority,
    #[error("x509: certificate is not valid: {0}")]
    InvalidCertificate(String),
}
