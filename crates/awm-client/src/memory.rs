//! In-process store, used as a scratch destination for dry runs.

use std::cell::RefCell;
use std::collections::BTreeMap;

use awm_core::{Event, RawEvent};
use serde::Serialize;

use crate::{BucketInfo, ClientError, DestinationStore, SourceStore};

#[derive(Debug, Clone)]
struct MemoryBucket {
    info: BucketInfo,
    events: Vec<RawEvent>,
}

/// A store held entirely in memory.
///
/// Not `Sync`; it is meant for a single in-flight migration.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RefCell<BTreeMap<String, MemoryBucket>>,
    next_id: RefCell<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket holding `events`.
    #[must_use]
    pub fn with_bucket(self, bucket_id: &str, bucket_type: &str, events: Vec<RawEvent>) -> Self {
        self.buckets.borrow_mut().insert(
            bucket_id.to_string(),
            MemoryBucket {
                info: bucket_info(bucket_id, bucket_type),
                events,
            },
        );
        self
    }

    pub fn bucket_ids(&self) -> Vec<String> {
        self.buckets.borrow().keys().cloned().collect()
    }

    /// Events of a bucket in insertion order; empty if the bucket is missing.
    pub fn events(&self, bucket_id: &str) -> Vec<RawEvent> {
        self.buckets
            .borrow()
            .get(bucket_id)
            .map(|bucket| bucket.events.clone())
            .unwrap_or_default()
    }
}

fn bucket_info(bucket_id: &str, bucket_type: &str) -> BucketInfo {
    BucketInfo {
        id: bucket_id.to_string(),
        bucket_type: bucket_type.to_string(),
        client: None,
        hostname: None,
    }
}

fn no_such_bucket(bucket_id: &str) -> ClientError {
    ClientError::Api {
        status: 404,
        message: format!("There's no bucket named {bucket_id}"),
    }
}

impl SourceStore for MemoryStore {
    async fn list_buckets(&self) -> Result<BTreeMap<String, BucketInfo>, ClientError> {
        Ok(self
            .buckets
            .borrow()
            .iter()
            .map(|(id, bucket)| (id.clone(), bucket.info.clone()))
            .collect())
    }

    async fn get_events(&self, bucket_id: &str) -> Result<Vec<RawEvent>, ClientError> {
        self.buckets
            .borrow()
            .get(bucket_id)
            .map(|bucket| bucket.events.clone())
            .ok_or_else(|| no_such_bucket(bucket_id))
    }
}

impl DestinationStore for MemoryStore {
    async fn delete_bucket(&self, bucket_id: &str) -> Result<(), ClientError> {
        self.buckets
            .borrow_mut()
            .remove(bucket_id)
            .map(|_| ())
            .ok_or_else(|| no_such_bucket(bucket_id))
    }

    async fn create_bucket(&self, bucket_id: &str, bucket_type: &str) -> Result<(), ClientError> {
        self.buckets
            .borrow_mut()
            .entry(bucket_id.to_string())
            .or_insert_with(|| MemoryBucket {
                info: bucket_info(bucket_id, bucket_type),
                events: Vec::new(),
            });
        Ok(())
    }

    async fn insert_event<D: Serialize>(
        &self,
        bucket_id: &str,
        event: &Event<D>,
    ) -> Result<(), ClientError> {
        let mut raw: RawEvent = serde_json::to_value(event)
            .and_then(serde_json::from_value)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;

        let mut buckets = self.buckets.borrow_mut();
        let bucket = buckets
            .get_mut(bucket_id)
            .ok_or_else(|| no_such_bucket(bucket_id))?;
        let mut next_id = self.next_id.borrow_mut();
        *next_id += 1;
        raw.id = Some(*next_id);
        bucket.events.push(raw);
        Ok(())
    }
}
