pub mod archival;
pub mod bogon;
pub mod context;
pub mod errors;
pub mod probes;
pub mod settings;
pub mod telemetry;
pub mod trace;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use chrono::Utc;
use log::{info, warn};
use netxtrace_common::{HttpRequest, Measurement, NetxConfig, operation};
use serde::Serialize;

use crate::archival::{ArchivalBundle, EXT_DNS, EXT_HTTP, EXT_NETEVENTS, EXT_TCP_CONNECT};
use crate::context::{Context, IdGenerator};
use crate::probes::http::{Http11Transport, SavingTransport};
use crate::probes::network::{
    BogonResolver, DnsDialer, SavingDialer, SavingResolver, SystemDialer, SystemResolver,
};
use crate::probes::{HttpTransport, Resolver};
use crate::trace::Trace;

const TEST_NAME: &str = "netxtrace";

/// Keys of a finished URL measurement: the archival lists plus the
/// normalized failure of the whole GET.
#[derive(Debug, Clone, Serialize)]
pub struct TestKeys {
    #[serde(flatten)]
    pub archival: ArchivalBundle,
    pub failure: Option<String>,
}

/// Wires the instrumented stack for one measurement at a time.
pub struct NetxEngine {
    pub config: NetxConfig,
}

impl NetxEngine {
    pub fn new(config: NetxConfig) -> Self {
        Self { config }
    }

    /// Performs one instrumented GET of `url` and returns the resulting
    /// measurement. A failed GET is a successful measurement with
    /// `failure` set; only serialization problems are returned as errors.
    pub async fn measure_url(&self, url: &str) -> Result<Measurement> {
        let begin = Utc::now();
        let started = Instant::now();
        let trace = Trace::new();

        info!("Measuring {}", url);
        let failure = if self.config.bogon_check {
            let resolver = SavingResolver::new(BogonResolver::new(SystemResolver), trace.clone());
            self.fetch(resolver, &trace, url).await
        } else {
            let resolver = SavingResolver::new(SystemResolver, trace.clone());
            self.fetch(resolver, &trace, url).await
        };
        match &failure {
            Some(failure) => warn!("GET {} failed: {}", url, failure),
            None => info!("GET {} succeeded", url),
        }

        let events = trace.events();
        info!("Recorded {} events", events.len());
        let test_keys = TestKeys {
            archival: archival::serialize(&events, begin),
            failure,
        };

        let mut measurement =
            Measurement::new(TEST_NAME, env!("CARGO_PKG_VERSION"), Some(url.to_string()), begin);
        measurement.test_runtime = started.elapsed().as_secs_f64();
        measurement.test_keys =
            serde_json::to_value(&test_keys).context("Failed to serialize test keys")?;
        for ext in [EXT_DNS, EXT_NETEVENTS, EXT_HTTP, EXT_TCP_CONNECT] {
            ext.add_to(&mut measurement);
        }
        Ok(measurement)
    }

    /// GETs `url` through the instrumented stack and returns the
    /// normalized failure, if any.
    async fn fetch<R: Resolver>(&self, resolver: R, trace: &Trace, url: &str) -> Option<String> {
        let dial_ids = Arc::new(IdGenerator::new());
        let transaction_ids = Arc::new(IdGenerator::new());
        let dialer = DnsDialer::new(
            resolver,
            SavingDialer::new(
                SystemDialer::new(Duration::from_secs(self.config.connect_timeout_secs)),
                trace.clone(),
            ),
            dial_ids,
        );
        let transport = SavingTransport::new(
            Http11Transport::new(
                dialer,
                Duration::from_secs(self.config.round_trip_timeout_secs),
            ),
            trace.clone(),
            transaction_ids,
            self.config.max_body_snapshot_size,
        );

        let mut request = HttpRequest::get(url);
        request
            .headers
            .append("User-Agent", self.config.user_agent.clone());

        match transport.round_trip(Context::new(), &request).await {
            Ok(_) => None,
            Err(err) => errors::normalize(Some(&err), operation::HTTP_ROUND_TRIP).failure,
        }
    }
}
