use std::error::Error as StdError;
use std::io;

use netxtrace_common::{failure, operation};
use tokio::time::error::Elapsed;

use super::{Canceled, CertificateError, DnsBogonError, ErrWrapper, scrub};

/// Failure string (`None` on success) and the operation it is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub failure: Option<String>,
    pub operation: String,
}

type Classifier = fn(&(dyn StdError + 'static)) -> Option<&'static str>;

// Checked in order; each one against every link of the source chain.
const CLASSIFIERS: [Classifier; 7] = [
    timeout,
    end_of_stream,
    no_such_host,
    bogon,
    certificate,
    connection,
    tls_handshake_timeout,
];

const NO_SUCH_HOST: &str = "no such host";
const TLS_HANDSHAKE_TIMEOUT: &str = "TLS handshake timeout";

pub fn normalize(err: Option<&anyhow::Error>, candidate: &str) -> NormalizedError {
    normalize_error(err.map(|e| &**e as &(dyn StdError + 'static)), candidate)
}

pub fn normalize_error(err: Option<&(dyn StdError + 'static)>, candidate: &str) -> NormalizedError {
    match err {
        None => NormalizedError {
            failure: None,
            operation: candidate.to_string(),
        },
        Some(err) => NormalizedError {
            failure: Some(to_failure_string(err)),
            operation: to_operation_string(err, candidate),
        },
    }
}

fn causes<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

// Connection wrappers hand errors back inside an `io::Error`, whose
// `source()` skips its payload and goes straight to the raw error.
fn find_wrapper<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a ErrWrapper> {
    causes(err).find_map(|e| {
        e.downcast_ref::<ErrWrapper>().or_else(|| {
            e.downcast_ref::<io::Error>()
                .and_then(|io| io.get_ref())
                .and_then(|inner| inner.downcast_ref::<ErrWrapper>())
        })
    })
}

fn to_failure_string(err: &(dyn StdError + 'static)) -> String {
    if let Some(wrapper) = find_wrapper(err) {
        return wrapper.failure.clone();
    }
    for classify in CLASSIFIERS {
        if let Some(failure) = causes(err).find_map(classify) {
            return failure.to_string();
        }
    }
    let message = causes(err)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ");
    format!("{}{}", failure::UNKNOWN_FAILURE_PREFIX, scrub(&message))
}

fn to_operation_string(err: &(dyn StdError + 'static), candidate: &str) -> String {
    match find_wrapper(err) {
        Some(wrapper) if operation::is_major(&wrapper.operation) => wrapper.operation.clone(),
        _ => candidate.to_string(),
    }
}

fn timeout(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let timed_out = err.is::<Elapsed>()
        || err.is::<Canceled>()
        || err
            .downcast_ref::<io::Error>()
            .is_some_and(|e| e.kind() == io::ErrorKind::TimedOut);
    timed_out.then_some(failure::GENERIC_TIMEOUT_ERROR)
}

fn end_of_stream(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    err.downcast_ref::<io::Error>()
        .filter(|e| e.kind() == io::ErrorKind::UnexpectedEof)
        .map(|_| failure::EOF_ERROR)
}

fn no_such_host(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    err.to_string()
        .ends_with(NO_SUCH_HOST)
        .then_some(failure::DNS_NXDOMAIN_ERROR)
}

fn bogon(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    err.is::<DnsBogonError>().then_some(failure::DNS_BOGON_ERROR)
}

fn certificate(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    err.downcast_ref::<CertificateError>().map(|e| match e {
        CertificateError::InvalidHostname { .. } => failure::SSL_INVALID_HOSTNAME,
        CertificateError::UnknownAuthority => failure::SSL_UNKNOWN_AUTHORITY,
        CertificateError::InvalidCertificate(_) => failure::SSL_INVALID_CERTIFICATE,
    })
}

fn connection(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    let err = err.downcast_ref::<io::Error>()?;
    match (err.raw_os_error(), err.kind()) {
        (Some(libc::ECONNREFUSED), _) | (_, io::ErrorKind::ConnectionRefused) => {
            Some(failure::CONNECTION_REFUSED)
        }
        (Some(libc::ECONNRESET), _) | (_, io::ErrorKind::ConnectionReset) => {
            Some(failure::CONNECTION_RESET)
        }
        _ => None,
    }
}

fn tls_handshake_timeout(err: &(dyn StdError + 'static)) -> Option<&'static str> {
    err.to_string()
        .contains(TLS_HANDSHAKE_TIMEOUT)
        .then_some(failure::GENERIC_TIMEOUT_ERROR)
}
