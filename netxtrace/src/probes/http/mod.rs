//! HTTP round-trip probe and the HTTP/1.1 transport it usually wraps.

pub mod transport;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use netxtrace_common::{BodySnapshot, EventName, HttpRequest, HttpResponse, operation};

use crate::context::{Context, CorrelationIds, IdGenerator};
use crate::errors::maybe_wrap;
use crate::probes::{HttpTransport, PendingEvent, until_deadline};
use crate::trace::Trace;

pub use transport::{Http11Transport, HttpTarget};

/// Records an `http_round_trip_done` event per round trip.
///
/// Every round trip is a new transaction: it gets a fresh transaction id,
/// which the inner transport sees in its context. Request and response
/// bodies are snapshotted up to `max_body_size` bytes.
pub struct SavingTransport<T> {
    inner: T,
    trace: Trace,
    ids: Arc<IdGenerator>,
    max_body_size: usize,
}

impl<T: HttpTransport> SavingTransport<T> {
    pub fn new(inner: T, trace: Trace, ids: Arc<IdGenerator>, max_body_size: usize) -> Self {
        Self {
            inner,
            trace,
            ids,
            max_body_size,
        }
    }
}

impl<T: HttpTransport> HttpTransport for SavingTransport<T> {
    async fn round_trip(&self, ctx: Context, request: &HttpRequest) -> Result<HttpResponse> {
        let ctx = ctx.with_transaction_id(self.ids.next());
        let mut pending = PendingEvent::start(
            &self.trace,
            EventName::HttpRoundTripDone,
            operation::HTTP_ROUND_TRIP,
            &ctx,
        );
        pending.describe(|event| {
            event.http_request = Some(request.snapshot());
            event.http_request_body =
                Some(BodySnapshot::capture(&request.body, self.max_body_size));
        });

        let result = until_deadline(&ctx, self.inner.round_trip(ctx, request)).await;
        let ids = CorrelationIds::from(&ctx);
        let (result, normalized) = maybe_wrap(result, operation::HTTP_ROUND_TRIP, ids);
        if let Ok(response) = &result {
            pending.describe(|event| {
                event.http_response = Some(response.snapshot());
                event.http_response_body =
                    Some(BodySnapshot::capture(&response.body, self.max_body_size));
            });
        }
        pending.finish(normalized, ids);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use bytes::Bytes;
    use netxtrace_common::Headers;

    struct MockTransport {
        body: &'static [u8],
        fail: bool,
    }

    impl HttpTransport for MockTransport {
        async fn round_trip(&self, ctx: Context, _request: &HttpRequest) -> Result<HttpResponse> {
            assert_ne!(ctx.transaction_id(), 0);
            if self.fail {
                return Err(anyhow!("read tcp 10.0.0.2:5555->10.0.0.1:80: broken"));
            }
            Ok(HttpResponse {
                status_code: 200,
                headers: [("Content-Type", "text/plain")].into_iter().collect::<Headers>(),
                body: Bytes::from_static(self.body),
            })
        }
    }

    struct HangingTransport;

    impl HttpTransport for HangingTransport {
        async fn round_trip(&self, _ctx: Context, _request: &HttpRequest) -> Result<HttpResponse> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_round_trip_is_recorded_with_snapshots() {
        let trace = Trace::new();
        let ids = Arc::new(IdGenerator::new());
        let transport = SavingTransport::new(
            MockTransport {
                body: b"0123456789",
                fail: false,
            },
            trace.clone(),
            ids,
            4,
        );

        let response = transport
            .round_trip(Context::new(), &HttpRequest::get("http://example.com/"))
            .await
            .unwrap();
        assert_eq!(response.body.len(), 10);

        let event = &trace.events()[0];
        assert_eq!(event.name, EventName::HttpRoundTripDone);
        assert_eq!(event.transaction_id, 1);
        assert_eq!(event.http_request.as_ref().unwrap().method, "GET");
        assert_eq!(event.http_response.as_ref().unwrap().status_code, 200);
        let body = event.http_response_body.as_ref().unwrap();
        assert_eq!(body.data.as_ref(), b"0123");
        assert!(body.truncated);
    }

    #[tokio::test]
    async fn test_failed_round_trip() {
        let trace = Trace::new();
        let transport = SavingTransport::new(
            MockTransport {
                body: b"",
                fail: true,
            },
            trace.clone(),
            Arc::new(IdGenerator::new()),
            1024,
        );

        let request = HttpRequest::get("http://example.com/");
        let err = transport.round_trip(Context::new(), &request).await.unwrap_err();
        assert_eq!(err.to_string(), "read tcp 10.0.0.2:5555->10.0.0.1:80: broken");
        transport.round_trip(Context::new(), &request).await.unwrap_err();

        let events = trace.events();
        assert_eq!(events[0].transaction_id, 1);
        assert_eq!(events[1].transaction_id, 2);
        assert_eq!(
            events[0].failure.as_deref(),
            Some("unknown_failure: read tcp [scrubbed]->[scrubbed]: broken")
        );
        assert_eq!(events[0].operation.as_deref(), Some("http_round_trip"));
        assert!(events[0].http_request.is_some());
        assert!(events[0].http_response.is_none());
    }

    #[tokio::test]
    async fn test_deadline_cancels_round_trip() {
        let trace = Trace::new();
        let transport =
            SavingTransport::new(HangingTransport, trace.clone(), Arc::new(IdGenerator::new()), 4);
        let ctx = Context::new().with_timeout(std::time::Duration::from_millis(20));

        let err = transport
            .round_trip(ctx, &HttpRequest::get("http://example.com/"))
            .await
            .unwrap_err();
        assert_eq!(
            crate::errors::normalize(Some(&err), operation::HTTP_ROUND_TRIP)
                .failure
                .as_deref(),
            Some("generic_timeout_error")
        );

        let events = trace.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].failure.as_deref(), Some("generic_timeout_error"));
        assert_eq!(events[0].operation.as_deref(), Some("http_round_trip"));
        assert_eq!(events[0].transaction_id, 1);
        assert!(events[0].http_request.is_some());
        assert!(events[0].http_response.is_none());
    }

    #[tokio::test]
    async fn test_abandoned_round_trip_is_recorded() {
        let trace = Trace::new();
        let transport =
            SavingTransport::new(HangingTransport, trace.clone(), Arc::new(IdGenerator::new()), 4);

        let outer = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            transport.round_trip(Context::new(), &HttpRequest::get("http://example.com/")),
        )
        .await;
        assert!(outer.is_err());

        let events = trace.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, EventName::HttpRoundTripDone);
        assert_eq!(events[0].failure.as_deref(), Some("generic_timeout_error"));
        assert_eq!(events[0].operation.as_deref(), Some("http_round_trip"));
        assert_eq!(events[0].transaction_id, 1);
    }
}
