//! Connection wrapper recording one `read`/`write` event per completed
//! I/O call.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use netxtrace_common::{Event, EventName, operation};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::context::CorrelationIds;
use crate::errors::{ErrWrapper, normalize_error};
use crate::probes::{NetConn, record_outcome};
use crate::trace::Trace;

pub struct SavingConn<C> {
    inner: C,
    network: String,
    ids: CorrelationIds,
    trace: Trace,
}

impl<C> fmt::Debug for SavingConn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavingConn")
            .field("network", &self.network)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl<C: NetConn> SavingConn<C> {
    pub fn new(inner: C, network: &str, ids: CorrelationIds, trace: Trace) -> Self {
        Self {
            inner,
            network: network.to_string(),
            ids,
            trace,
        }
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Records the outcome of one I/O call. Errors come back wrapped so that
    /// outer wrappers reuse the failure recorded here. The kind is kept on the
    /// returned error; the raw error, OS code included, is its `source()`.
    fn save(
        &self,
        name: EventName,
        started: Instant,
        num_bytes: usize,
        eof: bool,
        result: io::Result<()>,
    ) -> io::Result<()> {
        let candidate = match name {
            EventName::Read => operation::READ,
            _ => operation::WRITE,
        };
        let unexpected_eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        let observed: Option<&(dyn StdError + 'static)> = match &result {
            Err(err) => Some(err as &(dyn StdError + 'static)),
            Ok(()) if eof => Some(&unexpected_eof as &(dyn StdError + 'static)),
            Ok(()) => None,
        };
        let normalized = normalize_error(observed, candidate);

        let mut event = Event::new(name, self.trace.now());
        event.duration = started.elapsed();
        event.num_bytes = num_bytes as u64;
        event.proto = Some(self.network.clone());
        let wrapped = match result {
            Err(err) if normalized.failure.is_some() => {
                let kind = err.kind();
                let wrapper = ErrWrapper::new(err.into(), normalized.clone(), self.ids);
                Err(io::Error::new(kind, wrapper))
            }
            other => other,
        };
        record_outcome(&mut event, normalized, self.ids);
        self.trace.append(event);
        wrapped
    }
}

impl<C: NetConn> AsyncRead for SavingConn<C> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let started = Instant::now();
        let wanted = buf.remaining();
        let before = buf.filled().len();
        let result = match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        let num_bytes = buf.filled().len() - before;
        let eof = result.is_ok() && num_bytes == 0 && wanted > 0;
        Poll::Ready(self.save(EventName::Read, started, num_bytes, eof, result))
    }
}

impl<C: NetConn> AsyncWrite for SavingConn<C> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let started = Instant::now();
        let result = match Pin::new(&mut self.inner).poll_write(cx, data) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        let (num_bytes, outcome) = match result {
            Ok(n) => (n, Ok(())),
            Err(err) => (0, Err(err)),
        };
        let saved = self.save(EventName::Write, started, num_bytes, false, outcome);
        Poll::Ready(saved.map(|()| num_bytes))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl<C: NetConn> NetConn for SavingConn<C> {
    fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr()
    }
}
