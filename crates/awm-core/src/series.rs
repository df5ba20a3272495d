//! One watcher's history, sorted by start time, with a forward-only cursor.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;

use crate::event::{Event, RawEvent};

/// Events of a single bucket, ascending by timestamp.
///
/// Lookups are expected to arrive in non-decreasing time order. The cursor
/// remembers the last match so a full sweep costs O(n) overall; a query that
/// goes backwards restarts the scan from the first event.
#[derive(Debug, Clone)]
pub struct TimeIndexedSeries<D> {
    bucket_id: String,
    events: Vec<Event<D>>,
    cursor: usize,
    skipped: usize,
}

impl<D> TimeIndexedSeries<D> {
    /// Builds a series from already-typed events, sorting them by start time.
    pub fn new(bucket_id: impl Into<String>, mut events: Vec<Event<D>>) -> Self {
        events.sort_by_key(|event| event.timestamp);
        Self {
            bucket_id: bucket_id.into(),
            events,
            cursor: 0,
            skipped: 0,
        }
    }

    /// Decodes raw store events into the role payload `D`.
    ///
    /// Events whose payload does not decode are dropped and counted in
    /// [`skipped`](Self::skipped).
    pub fn decode(bucket_id: impl Into<String>, raw: Vec<RawEvent>) -> Self
    where
        D: DeserializeOwned,
    {
        let bucket_id = bucket_id.into();
        let total = raw.len();
        let mut events = Vec::with_capacity(total);
        for event in raw {
            let id = event.id;
            match event.decode::<D>() {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(bucket = %bucket_id, event_id = ?id, error = %err, "skipping undecodable event");
                }
            }
        }
        let skipped = total - events.len();
        let mut series = Self::new(bucket_id, events);
        series.skipped = skipped;
        series
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of source events dropped while decoding.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn events(&self) -> &[Event<D>] {
        &self.events
    }

    /// Start of the earliest event.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|event| event.timestamp)
    }

    /// Range from the first start to the end of the last event.
    ///
    /// Only the last event's extent counts; an earlier, longer event does not
    /// widen the span.
    pub fn total_span(&self) -> Duration {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.end() - first.timestamp,
            _ => Duration::zero(),
        }
    }

    /// Returns the latest event starting at or before `ts`.
    ///
    /// With `use_duration`, an event whose extent ended before `ts` counts as
    /// expired and nothing is returned. Without it, the most recent event is
    /// returned however stale it is. A `ts` before the first event resolves
    /// to the first event, which has not expired yet.
    pub fn lookup(&mut self, ts: DateTime<Utc>, use_duration: bool) -> Option<&Event<D>> {
        if self.events.is_empty() {
            return None;
        }

        if self.cursor >= self.events.len() || self.events[self.cursor].timestamp > ts {
            self.cursor = 0;
        }
        while self
            .events
            .get(self.cursor + 1)
            .is_some_and(|next| next.timestamp <= ts)
        {
            self.cursor += 1;
        }

        let event = &self.events[self.cursor];
        if use_duration && ts > event.end() {
            return None;
        }
        Some(event)
    }
}
