//! Migrate command: rebuild the destination timeline from the source watchers.

use std::io::Write;

use anyhow::Result;
use awm_client::{DestinationStore, MemoryStore, SourceStore};
use awm_core::{
    AfkData, AfkStatus, CoalescedInterval, Event, Sweep, SweepStats, WatcherRole, WindowData,
};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Config, MigrateError, loader};

/// Roles written to the destination.
const DESTINATION_ROLES: [WatcherRole; 2] = [WatcherRole::Window, WatcherRole::Afk];

/// Outcome of a migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateReport {
    pub source_hostname: String,
    pub window_bucket: String,
    pub afk_bucket: String,
    pub start: Option<DateTime<Utc>>,
    pub stats: SweepStats,
    pub dry_run: bool,
}

/// Deletes and recreates every destination bucket with its original type.
///
/// The window and AFK buckets of `destination_hostname` are created if they
/// did not exist. Everything previously stored on the destination is lost.
pub async fn prepare<D: DestinationStore>(
    destination: &D,
    destination_hostname: &str,
) -> Result<(), MigrateError> {
    let buckets = destination
        .list_buckets()
        .await
        .map_err(|source| MigrateError::DestinationUnavailable { source })?;

    for (bucket_id, bucket) in &buckets {
        tracing::info!(bucket = %bucket_id, "resetting destination bucket");
        destination
            .delete_bucket(bucket_id)
            .await
            .map_err(|source| write_failed(bucket_id, source))?;
        destination
            .create_bucket(bucket_id, &bucket.bucket_type)
            .await
            .map_err(|source| write_failed(bucket_id, source))?;
    }

    for role in DESTINATION_ROLES {
        let bucket_id = role.bucket_id(destination_hostname);
        if buckets.contains_key(&bucket_id) {
            continue;
        }
        tracing::info!(bucket = %bucket_id, "creating destination bucket");
        destination
            .create_bucket(&bucket_id, role.bucket_type())
            .await
            .map_err(|source| write_failed(&bucket_id, source))?;
    }
    Ok(())
}

/// Loads the source, resets the destination and writes the merged timeline.
///
/// Loading happens first, so a missing watcher aborts before anything on the
/// destination is touched. A failed write aborts mid-run and leaves the
/// destination partially written.
pub async fn run<S: SourceStore, D: DestinationStore>(
    source: &S,
    destination: &D,
    config: &Config,
) -> Result<MigrateReport, MigrateError> {
    let streams = loader::load(source, &config.hostname).await?;
    prepare(destination, &config.destination_hostname).await?;

    let window_bucket = WatcherRole::Window.bucket_id(&config.destination_hostname);
    let afk_bucket = WatcherRole::Afk.bucket_id(&config.destination_hostname);

    let mut sweep = Sweep::new(streams, config.normalizer()).flush_at_end(config.flush_at_end);
    tracing::info!(
        start = ?sweep.start(),
        seconds = sweep.seconds(),
        "sweeping timeline"
    );
    let start = sweep.start();
    for interval in sweep.by_ref() {
        emit(destination, &window_bucket, &afk_bucket, &interval).await?;
    }

    let stats = sweep.stats();
    tracing::info!(
        seconds = stats.seconds,
        emitted = stats.emitted,
        dropped_zero_length = stats.dropped_zero_length,
        "sweep finished"
    );

    Ok(MigrateReport {
        source_hostname: config.hostname.clone(),
        window_bucket,
        afk_bucket,
        start,
        stats,
        dry_run: false,
    })
}

/// Runs the migration against an in-memory destination.
pub async fn dry_run<S: SourceStore>(
    source: &S,
    config: &Config,
) -> Result<MigrateReport, MigrateError> {
    let scratch = MemoryStore::new();
    let mut report = run(source, &scratch, config).await?;
    report.dry_run = true;
    Ok(report)
}

/// Writes one interval as a window event and a matching `not-afk` status.
async fn emit<D: DestinationStore>(
    destination: &D,
    window_bucket: &str,
    afk_bucket: &str,
    interval: &CoalescedInterval,
) -> Result<(), MigrateError> {
    let window = Event::new(interval.start, interval.duration, WindowData {
        app: interval.activity.app.clone(),
        title: interval.activity.title.clone(),
    });
    let status = Event::new(interval.start, interval.duration, AfkData {
        status: AfkStatus::NotAfk,
    });

    destination
        .insert_event(window_bucket, &window)
        .await
        .map_err(|source| write_failed(window_bucket, source))?;
    destination
        .insert_event(afk_bucket, &status)
        .await
        .map_err(|source| write_failed(afk_bucket, source))
}

fn write_failed(bucket: &str, source: awm_client::ClientError) -> MigrateError {
    MigrateError::DestinationWriteFailed {
        bucket: bucket.to_string(),
        source,
    }
}

/// Prints a human-readable summary of a migration.
pub fn write_report<W: Write>(writer: &mut W, report: &MigrateReport) -> Result<()> {
    if report.dry_run {
        writeln!(writer, "Dry run for host {}", report.source_hostname)?;
    } else {
        writeln!(writer, "Migrated host {}", report.source_hostname)?;
    }

    let Some(start) = report.start else {
        writeln!(writer, "No source events.")?;
        return Ok(());
    };
    writeln!(
        writer,
        "Range: {} (+{}s)",
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.stats.seconds
    )?;
    writeln!(writer, "Intervals: {}", report.stats.emitted)?;
    writeln!(
        writer,
        "Zero-length intervals dropped: {}",
        report.stats.dropped_zero_length
    )?;
    if report.stats.left_open {
        writeln!(writer, "Final interval left open (flush_at_end = false)")?;
    }
    if !report.dry_run {
        writeln!(writer, "Buckets: {}, {}", report.window_bucket, report.afk_bucket)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    fn report(dry_run: bool) -> MigrateReport {
        MigrateReport {
            source_hostname: "desk".to_string(),
            window_bucket: "aw-watcher-window_laptop".to_string(),
            afk_bucket: "aw-watcher-afk_laptop".to_string(),
            start: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            stats: SweepStats {
                seconds: 3600,
                emitted: 42,
                dropped_zero_length: 3,
                left_open: false,
            },
            dry_run,
        }
    }

    fn render(report: &MigrateReport) -> String {
        let mut output = Vec::new();
        write_report(&mut output, report).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn report_lists_range_and_buckets() {
        assert_snapshot!(render(&report(false)).trim_end(), @r"
        Migrated host desk
        Range: 2024-05-01T08:00:00Z (+3600s)
        Intervals: 42
        Zero-length intervals dropped: 3
        Buckets: aw-watcher-window_laptop, aw-watcher-afk_laptop
        ");
    }

    #[test]
    fn dry_run_report_omits_buckets() {
        let output = render(&report(true));
        assert!(output.starts_with("Dry run for host desk\n"));
        assert!(!output.contains("Buckets:"));
    }

    #[test]
    fn empty_source_report() {
        let mut report = report(false);
        report.start = None;
        assert_eq!(render(&report), "Migrated host desk\nNo source events.\n");
    }

    #[tokio::test]
    async fn prepare_resets_and_creates_role_buckets() {
        let old_event = serde_json::from_value(serde_json::json!([
            {"timestamp": "2024-05-01T08:00:00Z", "duration": 1.0, "data": {"label": "x"}}
        ]))
        .unwrap();
        let destination =
            MemoryStore::new().with_bucket("aw-stopwatch", "general.stopwatch", old_event);

        prepare(&destination, "laptop").await.unwrap();

        assert_eq!(
            destination.bucket_ids(),
            vec![
                "aw-stopwatch".to_string(),
                "aw-watcher-afk_laptop".to_string(),
                "aw-watcher-window_laptop".to_string(),
            ]
        );
        assert!(destination.events("aw-stopwatch").is_empty());
        let buckets = destination.list_buckets().await.unwrap();
        assert_eq!(buckets["aw-stopwatch"].bucket_type, "general.stopwatch");
        assert_eq!(buckets["aw-watcher-afk_laptop"].bucket_type, "afkstatus");
    }
}
