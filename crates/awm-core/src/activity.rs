//! Deriving the activity for one sampled second.

use std::sync::LazyLock;

use regex::Regex;

use crate::event::{AfkData, AfkStatus, Event, WebData, WindowData};
use crate::normalize::Normalizer;

/// Window watcher app name reported for Chrome.
pub const BROWSER_APP: &str = "Google-chrome";

/// Title substituted for incognito tabs.
pub const PRIVATE_TITLE: &str = "PRIVATE";

static URL_HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://([^/]+)").unwrap());

/// A canonical `(app, title)` pair. Idle seconds have no activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Activity {
    pub app: String,
    pub title: String,
}

impl Activity {
    pub fn new(app: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            title: title.into(),
        }
    }
}

/// The events of each watcher that cover one sampled second.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sample<'a> {
    pub window: Option<&'a Event<WindowData>>,
    pub afk: Option<&'a Event<AfkData>>,
    pub web: Option<&'a Event<WebData>>,
}

impl Sample<'_> {
    /// Whether the user counts as away.
    ///
    /// An audible browser tab overrides an `afk` status sample.
    pub fn is_afk(&self) -> bool {
        let afk = self
            .afk
            .is_some_and(|event| event.data.status == AfkStatus::Afk);
        let audible = self.web.is_some_and(|event| event.data.audible);
        afk && !audible
    }

    /// Resolves the sample into an activity, or `None` when idle.
    pub fn activity(&self, normalizer: &Normalizer) -> Option<Activity> {
        if self.is_afk() {
            return None;
        }
        let window = self.window?;
        let mut app = window.data.app.clone();
        let mut title = window.data.title.clone();

        if let Some(web) = self.web.filter(|_| app == BROWSER_APP) {
            if web.data.incognito {
                title = PRIVATE_TITLE.to_string();
            } else {
                title.clone_from(&web.data.title);
                if let Some(host) = url_host(&web.data.url) {
                    app = host.to_string();
                }
            }
        }

        let (app, title) = normalizer.apply(app, title);
        Some(Activity { app, title })
    }
}

/// Host part of an `http(s)` URL.
pub fn url_host(url: &str) -> Option<&str> {
    URL_HOST_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|host| host.as_str())
}
