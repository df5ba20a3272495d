//! Migration failures.

use awm_client::ClientError;
use awm_core::WatcherRole;
use thiserror::Error;

/// Fatal conditions that abort a migration.
///
/// None of these are retried; re-running the whole migration is safe because
/// the destination is reset before any event is written.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// Reading buckets or events from the source failed.
    #[error("source store unavailable while reading {target}")]
    SourceUnavailable {
        target: String,
        #[source]
        source: ClientError,
    },
    /// A required watcher has no bucket for the host.
    #[error("no {role} bucket found for host {hostname}")]
    MissingRole { role: WatcherRole, hostname: String },
    /// Listing destination buckets failed.
    #[error("destination store unavailable")]
    DestinationUnavailable {
        #[source]
        source: ClientError,
    },
    /// Deleting, creating or writing a destination bucket failed.
    #[error("failed to write bucket {bucket} on destination store")]
    DestinationWriteFailed {
        bucket: String,
        #[source]
        source: ClientError,
    },
}
