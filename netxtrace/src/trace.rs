//! Append-only log of the events observed during one measurement.
//!
//! A [`Trace`] is cheap to clone; every clone appends to the same log.
//! Appends from concurrent probes are serialized by a mutex whose
//! critical section is a timestamp check and a `Vec::push`.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::debug;
use netxtrace_common::Event;

#[derive(Clone)]
pub struct Trace {
    inner: Arc<TraceInner>,
}

struct TraceInner {
    origin: Instant,
    origin_wall: DateTime<Utc>,
    events: Mutex<Vec<Event>>,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TraceInner {
                origin: Instant::now(),
                origin_wall: Utc::now(),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Wall-clock time that never goes backwards within this trace.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = self.inner.origin.elapsed();
        self.inner.origin_wall
            + chrono::Duration::from_std(elapsed).unwrap_or(chrono::Duration::zero())
    }

    /// Appends `event`. Its time is raised to the time of the last
    /// recorded event if it would otherwise go backwards.
    pub fn append(&self, mut event: Event) {
        debug!(
            "event {} failure={:?} conn={} dial={} tx={}",
            event.name, event.failure, event.conn_id, event.dial_id, event.transaction_id
        );
        crate::telemetry::record_event(&event);
        let mut events = self.inner.events.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = events.last()
            && event.time < last.time
        {
            event.time = last.time;
        }
        events.push(event);
    }

    /// Copy of the events recorded so far, in append order.
    pub fn events(&self) -> Vec<Event> {
        self.inner
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
