//! Folding per-second activities into intervals.
//!
//! # Algorithm Summary
//!
//! 1. Start at the earliest first event across the window, AFK and web series
//! 2. For each whole second, look up the covering event of each series
//! 3. Derive an [`Activity`] (or idle) for the second
//! 4. Extend the open interval while the activity repeats; close it on change
//!
//! An interval covers `[start, close)`, where `close` is the first second that
//! sampled something else. Intervals that close at their own start are dropped.

use std::time::{Duration as WallDuration, Instant};

use chrono::{DateTime, Duration, Utc};

use crate::activity::{Activity, Sample};
use crate::event::{AfkData, WebData, WindowData};
use crate::normalize::Normalizer;
use crate::series::TimeIndexedSeries;

/// How often progress is logged during a sweep.
const PROGRESS_INTERVAL: WallDuration = WallDuration::from_secs(5);

/// A run of identical activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescedInterval {
    pub activity: Activity,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl CoalescedInterval {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

/// Merges consecutive identical samples into intervals.
#[derive(Debug, Default)]
pub struct Coalescer {
    current: Option<CoalescedInterval>,
    dropped: usize,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the activity sampled at `ts`.
    ///
    /// Returns the interval closed by this sample, if any. `ts` must not go
    /// backwards.
    pub fn step(
        &mut self,
        ts: DateTime<Utc>,
        candidate: Option<Activity>,
    ) -> Option<CoalescedInterval> {
        let mut closed = None;
        if let Some(current) = self.current.as_mut() {
            current.duration = ts - current.start;
            if candidate.as_ref() == Some(&current.activity) {
                return None;
            }
            closed = self.close();
        }

        if let Some(activity) = candidate {
            self.current = Some(CoalescedInterval {
                activity,
                start: ts,
                duration: Duration::zero(),
            });
        }
        closed
    }

    /// Closes the open interval at `end`.
    pub fn finish(&mut self, end: DateTime<Utc>) -> Option<CoalescedInterval> {
        let current = self.current.as_mut()?;
        current.duration = end - current.start;
        self.close()
    }

    /// The interval still being extended.
    pub const fn current(&self) -> Option<&CoalescedInterval> {
        self.current.as_ref()
    }

    /// Intervals discarded for having no elapsed time.
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    fn close(&mut self) -> Option<CoalescedInterval> {
        let interval = self.current.take()?;
        if interval.duration > Duration::zero() {
            return Some(interval);
        }
        self.dropped += 1;
        tracing::debug!(
            app = %interval.activity.app,
            start = %interval.start,
            "dropping zero-length interval"
        );
        None
    }
}

/// The three watcher histories of one host.
#[derive(Debug, Clone)]
pub struct Streams {
    pub window: TimeIndexedSeries<WindowData>,
    pub afk: TimeIndexedSeries<AfkData>,
    pub web: TimeIndexedSeries<WebData>,
}

impl Streams {
    /// First second to sample and the number of seconds to sample.
    ///
    /// Starts at the earliest event of any series and runs for the longest
    /// single-series span, truncated to whole seconds. `None` when every
    /// series is empty.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, i64)> {
        let start = [
            self.window.first_timestamp(),
            self.afk.first_timestamp(),
            self.web.first_timestamp(),
        ]
        .into_iter()
        .flatten()
        .min()?;
        let span = [
            self.window.total_span(),
            self.afk.total_span(),
            self.web.total_span(),
        ]
        .into_iter()
        .max()
        .unwrap_or_else(Duration::zero);
        Some((start, span.num_seconds()))
    }
}

/// Counters describing a finished sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub seconds: i64,
    pub emitted: usize,
    pub dropped_zero_length: usize,
    /// An interval was still open at the end and flushing was disabled.
    pub left_open: bool,
}

/// Second-by-second pass over [`Streams`], yielding closed intervals.
#[derive(Debug)]
pub struct Sweep {
    streams: Streams,
    normalizer: Normalizer,
    coalescer: Coalescer,
    start: Option<DateTime<Utc>>,
    seconds: i64,
    offset: i64,
    flush_at_end: bool,
    finished: bool,
    emitted: usize,
    left_open: bool,
    last_progress: Instant,
}

impl Sweep {
    pub fn new(streams: Streams, normalizer: Normalizer) -> Self {
        let (start, seconds) = streams
            .bounds()
            .map_or((None, 0), |(start, seconds)| (Some(start), seconds));
        Self {
            streams,
            normalizer,
            coalescer: Coalescer::new(),
            start,
            seconds,
            offset: 0,
            flush_at_end: true,
            finished: false,
            emitted: 0,
            left_open: false,
            last_progress: Instant::now(),
        }
    }

    /// Whether the interval open when the sweep runs out is emitted.
    #[must_use]
    pub fn flush_at_end(mut self, flush: bool) -> Self {
        self.flush_at_end = flush;
        self
    }

    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    pub const fn stats(&self) -> SweepStats {
        SweepStats {
            seconds: self.seconds,
            emitted: self.emitted,
            dropped_zero_length: self.coalescer.dropped(),
            left_open: self.left_open,
        }
    }

    fn report_progress(&mut self) {
        if self.last_progress.elapsed() < PROGRESS_INTERVAL {
            return;
        }
        self.last_progress = Instant::now();
        let percent = self.offset * 100 / self.seconds.max(1);
        tracing::info!(percent, emitted = self.emitted, "processing data");
    }

    fn finish(&mut self, start: DateTime<Utc>) -> Option<CoalescedInterval> {
        self.finished = true;
        if self.flush_at_end {
            return self.coalescer.finish(start + Duration::seconds(self.seconds));
        }
        if let Some(open) = self.coalescer.current() {
            tracing::warn!(
                app = %open.activity.app,
                start = %open.start,
                "final interval left open, not flushing"
            );
            self.left_open = true;
        }
        None
    }
}

impl Iterator for Sweep {
    type Item = CoalescedInterval;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.start?;
        while self.offset < self.seconds {
            let ts = start + Duration::seconds(self.offset);
            self.offset += 1;
            self.report_progress();

            let sample = Sample {
                afk: self.streams.afk.lookup(ts, true),
                web: self.streams.web.lookup(ts, false),
                window: self.streams.window.lookup(ts, true),
            };
            let candidate = sample.activity(&self.normalizer);
            if let Some(closed) = self.coalescer.step(ts, candidate) {
                self.emitted += 1;
                return Some(closed);
            }
        }

        if self.finished {
            return None;
        }
        let closed = self.finish(start)?;
        self.emitted += 1;
        Some(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    use crate::event::{AfkStatus, Event};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn window(start: i64, len: i64, app: &str, title: &str) -> Event<WindowData> {
        Event::new(t(start), Duration::seconds(len), WindowData {
            app: app.to_string(),
            title: title.to_string(),
        })
    }

    fn afk(start: i64, len: i64, status: AfkStatus) -> Event<AfkData> {
        Event::new(t(start), Duration::seconds(len), AfkData { status })
    }

    fn web(start: i64, url: &str, title: &str, audible: bool) -> Event<WebData> {
        Event::new(t(start), Duration::zero(), WebData {
            url: url.to_string(),
            title: title.to_string(),
            incognito: false,
            audible,
        })
    }

    fn streams(
        window: Vec<Event<WindowData>>,
        afk: Vec<Event<AfkData>>,
        web: Vec<Event<WebData>>,
    ) -> Streams {
        Streams {
            window: TimeIndexedSeries::new("aw-watcher-window_h", window),
            afk: TimeIndexedSeries::new("aw-watcher-afk_h", afk),
            web: TimeIndexedSeries::new("aw-watcher-web-chrome_h", web),
        }
    }

    fn render(intervals: &[CoalescedInterval]) -> String {
        intervals
            .iter()
            .map(|interval| {
                format!(
                    "+{}s {}s {} | {}",
                    (interval.start - t(0)).num_seconds(),
                    interval.duration.num_seconds(),
                    interval.activity.app,
                    interval.activity.title
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn identical_seconds_coalesce_into_one_interval() {
        let mut coalescer = Coalescer::new();
        let code = Activity::new("Code", "a");
        for offset in 0..5 {
            assert!(coalescer.step(t(offset), Some(code.clone())).is_none());
        }
        let closed = coalescer.step(t(5), None).unwrap();
        assert_eq!(closed.activity, code);
        assert_eq!(closed.start, t(0));
        assert_eq!(closed.duration, Duration::seconds(5));
        assert!(coalescer.current().is_none());
    }

    #[test]
    fn change_closes_and_opens_in_one_step() {
        let mut coalescer = Coalescer::new();
        coalescer.step(t(0), Some(Activity::new("Code", "a")));
        let closed = coalescer
            .step(t(3), Some(Activity::new("Code", "b")))
            .unwrap();
        assert_eq!(closed.activity.title, "a");
        assert_eq!(closed.end(), t(3));
        assert_eq!(coalescer.current().unwrap().start, t(3));
    }

    #[test]
    fn same_second_flicker_is_dropped() {
        let mut coalescer = Coalescer::new();
        coalescer.step(t(0), Some(Activity::new("Code", "a")));
        assert!(
            coalescer
                .step(t(0), Some(Activity::new("Slack", "b")))
                .is_none()
        );
        assert!(coalescer.step(t(0), None).is_none());
        assert_eq!(coalescer.dropped(), 2);
    }

    #[test]
    fn idle_never_opens_an_interval() {
        let mut coalescer = Coalescer::new();
        for offset in 0..3 {
            assert!(coalescer.step(t(offset), None).is_none());
        }
        assert!(coalescer.current().is_none());
        assert!(coalescer.finish(t(3)).is_none());
        assert_eq!(coalescer.dropped(), 0);
    }

    #[test]
    fn bounds_use_earliest_start_and_longest_span() {
        let streams = streams(
            vec![window(4, 2, "Code", "a")],
            vec![afk(2, 7, AfkStatus::NotAfk)],
            Vec::new(),
        );
        assert_eq!(streams.bounds(), Some((t(2), 7)));
    }

    #[test]
    fn bounds_of_empty_streams() {
        let streams = streams(Vec::new(), Vec::new(), Vec::new());
        assert_eq!(streams.bounds(), None);
        let mut sweep = Sweep::new(streams, Normalizer::default());
        assert!(sweep.next().is_none());
        assert_eq!(sweep.stats(), SweepStats::default());
    }

    #[test]
    fn ten_second_session_emits_single_interval() {
        let streams = streams(
            vec![window(0, 10, "Code", "a")],
            vec![afk(0, 10, AfkStatus::NotAfk)],
            Vec::new(),
        );
        let mut sweep = Sweep::new(streams, Normalizer::default());
        let intervals: Vec<_> = sweep.by_ref().collect();

        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].activity, Activity::new("Code", "a"));
        assert_eq!(intervals[0].start, t(0));
        assert_eq!(intervals[0].duration, Duration::seconds(10));
        assert_eq!(
            sweep.stats(),
            SweepStats {
                seconds: 10,
                emitted: 1,
                dropped_zero_length: 0,
                left_open: false,
            }
        );
    }

    #[test]
    fn disabling_flush_leaves_final_interval_open() {
        let streams = streams(
            vec![window(0, 10, "Code", "a")],
            vec![afk(0, 10, AfkStatus::NotAfk)],
            Vec::new(),
        );
        let mut sweep = Sweep::new(streams, Normalizer::default()).flush_at_end(false);
        assert!(sweep.next().is_none());
        assert!(sweep.next().is_none());
        assert!(sweep.stats().left_open);
        assert_eq!(sweep.stats().emitted, 0);
    }

    #[test]
    fn afk_region_is_not_emitted() {
        let streams = streams(
            vec![window(0, 12, "Code", "a")],
            vec![
                afk(0, 4, AfkStatus::NotAfk),
                afk(4, 4, AfkStatus::Afk),
                afk(8, 4, AfkStatus::NotAfk),
            ],
            Vec::new(),
        );
        let intervals: Vec<_> = Sweep::new(streams, Normalizer::default()).collect();
        assert_snapshot!(render(&intervals), @r"
        +0s 4s Code | a
        +8s 4s Code | a
        ");
    }

    #[test]
    fn window_gap_is_idle() {
        let streams = streams(
            vec![window(0, 3, "Code", "a"), window(6, 3, "Code", "a")],
            vec![afk(0, 9, AfkStatus::NotAfk)],
            Vec::new(),
        );
        let intervals: Vec<_> = Sweep::new(streams, Normalizer::default()).collect();
        assert_snapshot!(render(&intervals), @r"
        +0s 4s Code | a
        +6s 3s Code | a
        ");
    }

    #[test]
    fn late_window_series_covers_leading_seconds() {
        let streams = streams(
            vec![window(3, 5, "Code", "a")],
            vec![afk(0, 10, AfkStatus::NotAfk)],
            Vec::new(),
        );
        let intervals: Vec<_> = Sweep::new(streams, Normalizer::default()).collect();
        assert_snapshot!(render(&intervals), @"+0s 9s Code | a");
    }

    #[test]
    fn late_web_series_applies_from_sweep_start() {
        let streams = streams(
            vec![window(0, 6, "Google-chrome", "Chrome")],
            vec![afk(0, 6, AfkStatus::Afk)],
            vec![web(4, "https://radio.example.com/", "Live", true)],
        );
        let intervals: Vec<_> = Sweep::new(streams, Normalizer::default()).collect();
        assert_snapshot!(render(&intervals), @"+0s 6s radio.example.com | Live");
    }

    #[test]
    fn browser_tabs_split_chrome_time() {
        let streams = streams(
            vec![window(0, 10, "Google-chrome", "Chrome")],
            vec![afk(0, 10, AfkStatus::Afk)],
            vec![
                web(0, "https://docs.example.com/a", "Doc", true),
                web(5, "https://mail.example.com/", "(1) Inbox", false),
            ],
        );
        let intervals: Vec<_> = Sweep::new(streams, Normalizer::default()).collect();
        assert_snapshot!(render(&intervals), @"+0s 5s docs.example.com | Doc");
    }
}
