//! Core domain logic for ActivityWatch migrations.
//!
//! This crate contains the pure, I/O-free parts of a migration:
//! - Events: typed payloads for the window, AFK and browser watchers
//! - Series: per-bucket event history with cursor-accelerated lookup
//! - Normalization: per-app title cleanup and app aliases
//! - Coalescing: the per-second sweep that merges the three watchers into
//!   non-overlapping activity intervals

mod activity;
pub mod bucket;
mod coalesce;
pub mod event;
pub mod normalize;
mod series;

pub use activity::{Activity, BROWSER_APP, PRIVATE_TITLE, Sample, url_host};
pub use bucket::{BucketName, UnknownRole, WatcherRole};
pub use coalesce::{CoalescedInterval, Coalescer, Streams, Sweep, SweepStats};
pub use event::{AfkData, AfkStatus, Event, RawEvent, WebData, WindowData};
pub use normalize::{Normalizer, TitleRule};
pub use series::TimeIndexedSeries;
