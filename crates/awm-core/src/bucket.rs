//! Bucket naming: `aw-watcher-<role>_<hostname>`.

use std::fmt;
use std::str::FromStr;

/// Prefix shared by every watcher bucket.
pub const WATCHER_PREFIX: &str = "aw-watcher-";

/// Watcher roles consumed by a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WatcherRole {
    Window,
    Afk,
    Web,
}

impl WatcherRole {
    /// All roles that must be present on the source.
    pub const REQUIRED: [Self; 3] = [Self::Window, Self::Afk, Self::Web];

    /// Role segment used in bucket ids.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Afk => "afk",
            Self::Web => "web",
        }
    }

    /// Bucket type used when creating a destination bucket for this role.
    #[must_use]
    pub const fn bucket_type(self) -> &'static str {
        match self {
            Self::Window => "currentwindow",
            Self::Afk => "afkstatus",
            Self::Web => "web.tab.current",
        }
    }

    /// Bucket id for this role on the given host.
    #[must_use]
    pub fn bucket_id(self, hostname: &str) -> String {
        format!("{WATCHER_PREFIX}{}_{hostname}", self.as_str())
    }
}

impl fmt::Display for WatcherRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatcherRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "window" => Ok(Self::Window),
            "afk" => Ok(Self::Afk),
            "web" | "web-chrome" => Ok(Self::Web),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Error for role segments that no migration consumes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown watcher role: {0}")]
pub struct UnknownRole(String);

/// A watcher bucket id split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketName<'a> {
    /// Role segment as written, e.g. `web-chrome`.
    pub watcher: &'a str,
    pub hostname: &'a str,
}

impl<'a> BucketName<'a> {
    /// Splits `aw-watcher-<watcher>_<hostname>`.
    ///
    /// The split happens at the first `_`, so hostnames may contain
    /// underscores. Returns `None` for ids outside the watcher convention.
    pub fn parse(bucket_id: &'a str) -> Option<Self> {
        let rest = bucket_id.strip_prefix(WATCHER_PREFIX)?;
        let (watcher, hostname) = rest.split_once('_')?;
        if watcher.is_empty() || hostname.is_empty() {
            return None;
        }
        Some(Self { watcher, hostname })
    }

    /// The role this bucket feeds, if any.
    pub fn role(&self) -> Option<WatcherRole> {
        self.watcher.parse().ok()
    }
}
