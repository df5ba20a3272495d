//! Loading the three watcher series of one host from the source store.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use awm_client::{BucketInfo, SourceStore};
use awm_core::{BucketName, Streams, TimeIndexedSeries, WatcherRole};
use serde::de::DeserializeOwned;

use crate::MigrateError;

/// Maps each watcher role to the source bucket feeding it on `hostname`.
///
/// Buckets of other hosts, other watchers and non-watcher buckets are
/// ignored. When several buckets resolve to one role, the first by id wins.
pub fn resolve_roles(
    buckets: &BTreeMap<String, BucketInfo>,
    hostname: &str,
) -> BTreeMap<WatcherRole, String> {
    let mut roles = BTreeMap::new();
    for bucket_id in buckets.keys() {
        let Some(name) = BucketName::parse(bucket_id) else {
            continue;
        };
        if name.hostname != hostname {
            continue;
        }
        let Some(role) = name.role() else {
            tracing::debug!(bucket = %bucket_id, "ignoring bucket of unused watcher");
            continue;
        };
        match roles.entry(role) {
            Entry::Vacant(entry) => {
                entry.insert(bucket_id.clone());
            }
            Entry::Occupied(entry) => {
                tracing::warn!(
                    %role,
                    kept = %entry.get(),
                    ignored = %bucket_id,
                    "several buckets for one role"
                );
            }
        }
    }
    roles
}

/// Loads the window, AFK and web series of `hostname`.
///
/// All three roles must resolve before any events are fetched.
pub async fn load<S: SourceStore>(store: &S, hostname: &str) -> Result<Streams, MigrateError> {
    let buckets = store
        .list_buckets()
        .await
        .map_err(|source| MigrateError::SourceUnavailable {
            target: "bucket list".to_string(),
            source,
        })?;
    let mut roles = resolve_roles(&buckets, hostname);

    let mut take = |role| {
        roles.remove(&role).ok_or_else(|| MigrateError::MissingRole {
            role,
            hostname: hostname.to_string(),
        })
    };
    let window_bucket = take(WatcherRole::Window)?;
    let afk_bucket = take(WatcherRole::Afk)?;
    let web_bucket = take(WatcherRole::Web)?;

    Ok(Streams {
        window: load_series(store, window_bucket).await?,
        afk: load_series(store, afk_bucket).await?,
        web: load_series(store, web_bucket).await?,
    })
}

async fn load_series<S: SourceStore, D: DeserializeOwned>(
    store: &S,
    bucket_id: String,
) -> Result<TimeIndexedSeries<D>, MigrateError> {
    tracing::info!(bucket = %bucket_id, "loading bucket");
    let raw = match store.get_events(&bucket_id).await {
        Ok(raw) => raw,
        Err(source) => {
            return Err(MigrateError::SourceUnavailable {
                target: bucket_id,
                source,
            });
        }
    };
    let series = TimeIndexedSeries::decode(bucket_id, raw);
    tracing::info!(
        bucket = %series.bucket_id(),
        events = series.len(),
        skipped = series.skipped(),
        "loaded bucket"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    use awm_client::MemoryStore;

    fn listing(ids: &[&str]) -> BTreeMap<String, BucketInfo> {
        ids.iter()
            .map(|id| {
                (
                    (*id).to_string(),
                    BucketInfo {
                        id: (*id).to_string(),
                        bucket_type: "test".to_string(),
                        client: None,
                        hostname: None,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn resolve_roles_filters_host_and_maps_chrome() {
        let buckets = listing(&[
            "aw-watcher-window_desk",
            "aw-watcher-afk_desk",
            "aw-watcher-web-chrome_desk",
            "aw-watcher-window_laptop",
            "aw-watcher-input_desk",
            "aw-stopwatch",
        ]);
        let roles = resolve_roles(&buckets, "desk");

        assert_eq!(roles.len(), 3);
        assert_eq!(roles[&WatcherRole::Window], "aw-watcher-window_desk");
        assert_eq!(roles[&WatcherRole::Afk], "aw-watcher-afk_desk");
        assert_eq!(roles[&WatcherRole::Web], "aw-watcher-web-chrome_desk");
    }

    #[test]
    fn resolve_roles_keeps_first_duplicate() {
        let buckets = listing(&["aw-watcher-web-chrome_desk", "aw-watcher-web_desk"]);
        let roles = resolve_roles(&buckets, "desk");
        assert_eq!(roles[&WatcherRole::Web], "aw-watcher-web-chrome_desk");
    }

    #[tokio::test]
    async fn load_fails_on_missing_role() {
        let store = MemoryStore::new()
            .with_bucket("aw-watcher-window_desk", "currentwindow", Vec::new())
            .with_bucket("aw-watcher-afk_desk", "afkstatus", Vec::new());

        let err = load(&store, "desk").await.unwrap_err();
        assert!(matches!(
            err,
            MigrateError::MissingRole {
                role: WatcherRole::Web,
                ..
            }
        ));
        assert_eq!(err.to_string(), "no web bucket found for host desk");
    }

    #[tokio::test]
    async fn load_decodes_each_role() {
        let window = serde_json::from_value(serde_json::json!([
            {"timestamp": "2024-05-01T08:00:05Z", "duration": 5.0, "data": {"app": "Code", "title": "b"}},
            {"timestamp": "2024-05-01T08:00:00Z", "duration": 5.0, "data": {"app": "Code", "title": "a"}}
        ]))
        .unwrap();
        let afk = serde_json::from_value(serde_json::json!([
            {"timestamp": "2024-05-01T08:00:00Z", "duration": 10.0, "data": {"status": "not-afk"}}
        ]))
        .unwrap();
        let store = MemoryStore::new()
            .with_bucket("aw-watcher-window_desk", "currentwindow", window)
            .with_bucket("aw-watcher-afk_desk", "afkstatus", afk)
            .with_bucket("aw-watcher-web-chrome_desk", "web.tab.current", Vec::new());

        let streams = load(&store, "desk").await.unwrap();
        assert_eq!(streams.window.len(), 2);
        assert_eq!(streams.window.events()[0].data.title, "a");
        assert_eq!(streams.afk.len(), 1);
        assert!(streams.web.is_empty());
    }
}
