//! ActivityWatch events, typed by the watcher role that produced them.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An occurrence with a start time and an extent.
///
/// The payload type depends on the watcher role. Events read from a store are
/// [`RawEvent`]s and get decoded into a role payload at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<D = serde_json::Value> {
    /// Store-assigned identifier. Never sent on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// When the event started.
    pub timestamp: DateTime<Utc>,
    /// How long the event lasted. Serialized as fractional seconds; negative
    /// values read from a store are clamped to zero.
    #[serde(with = "duration_secs", default = "Duration::zero")]
    pub duration: Duration,
    /// Role-specific payload.
    pub data: D,
}

/// An event with an undecoded JSON payload, as it travels over the wire.
pub type RawEvent = Event<serde_json::Value>;

impl<D> Event<D> {
    /// Creates an event without a store identifier.
    pub const fn new(timestamp: DateTime<Utc>, duration: Duration, data: D) -> Self {
        Self {
            id: None,
            timestamp,
            duration,
            data,
        }
    }

    /// The instant the event's extent ends.
    pub fn end(&self) -> DateTime<Utc> {
        self.timestamp + self.duration
    }
}

impl RawEvent {
    /// Decodes the JSON payload into a role payload.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Event<T>, serde_json::Error> {
        let data = serde_json::from_value(self.data)?;
        Ok(Event {
            id: self.id,
            timestamp: self.timestamp,
            duration: self.duration,
            data,
        })
    }
}

/// Payload of a window watcher event: the foreground application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowData {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub title: String,
}

/// Idle status as sampled by the AFK watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AfkStatus {
    Afk,
    NotAfk,
}

/// Payload of an AFK watcher event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfkData {
    pub status: AfkStatus,
}

/// Payload of a browser tab event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default)]
    pub audible: bool,
}

mod duration_secs {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const MICROS_PER_SEC: f64 = 1_000_000.0;

    #[expect(
        clippy::cast_precision_loss,
        reason = "event durations are far below 2^53 microseconds"
    )]
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = duration.num_microseconds().map_or_else(
            || duration.num_seconds() as f64,
            |micros| micros as f64 / MICROS_PER_SEC,
        );
        serializer.serialize_f64(secs)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "saturating float to int conversion is acceptable for durations"
    )]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(D::Error::custom(format!("invalid duration: {secs}")));
        }
        if secs < 0.0 {
            tracing::debug!(duration = secs, "clamping negative event duration to zero");
            return Ok(Duration::zero());
        }
        Ok(Duration::microseconds((secs * MICROS_PER_SEC).round() as i64))
    }
}
