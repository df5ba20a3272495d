//! Buckets command: show which source buckets a migration would read.

use std::io::Write;

use anyhow::{Context, Result};
use awm_client::SourceStore;
use awm_core::WatcherRole;

use crate::loader;

/// Lists source buckets and the role each one resolves to for `hostname`.
pub async fn run<W: Write, S: SourceStore>(
    writer: &mut W,
    store: &S,
    hostname: &str,
) -> Result<()> {
    let buckets = store
        .list_buckets()
        .await
        .context("failed to list source buckets")?;
    let roles = loader::resolve_roles(&buckets, hostname);

    writeln!(writer, "Source buckets (host {hostname}):")?;
    if buckets.is_empty() {
        writeln!(writer, "No buckets.")?;
        return Ok(());
    }
    for (bucket_id, bucket) in &buckets {
        let role = roles
            .iter()
            .find(|(_, id)| *id == bucket_id)
            .map_or_else(|| "-".to_string(), |(role, _)| role.to_string());
        writeln!(writer, "- {bucket_id} [{}] -> {role}", bucket.bucket_type)?;
    }

    let missing: Vec<String> = WatcherRole::REQUIRED
        .iter()
        .filter(|role| !roles.contains_key(*role))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        writeln!(writer, "Missing roles: {}", missing.join(", "))?;
    }
    Ok(())
}
