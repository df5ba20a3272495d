//! App and title normalization applied before activities are compared.

use std::sync::LazyLock;

use regex::Regex;

/// Strips a leading pattern from titles of selected apps.
#[derive(Debug, Clone)]
pub struct TitleRule {
    apps: Vec<String>,
    prefix: Regex,
}

impl TitleRule {
    /// Builds a rule removing a leading match of `pattern` for any of `apps`.
    pub fn strip_prefix(apps: &[&str], pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            apps: apps.iter().map(|app| (*app).to_string()).collect(),
            prefix: Regex::new(&format!("^(?:{pattern})"))?,
        })
    }

    fn applies_to(&self, app: &str) -> bool {
        self.apps.iter().any(|candidate| candidate == app)
    }

    fn apply<'a>(&self, title: &'a str) -> &'a str {
        self.prefix
            .find(title)
            .map_or(title, |found| &title[found.end()..])
    }
}

static BUILTIN_TITLE_RULES: LazyLock<Vec<TitleRule>> = LazyLock::new(|| {
    vec![
        // Task timers prefix the title with "HH:MM ".
        TitleRule::strip_prefix(&["kanbanflow.com"], r"\d+:\d+\s+").unwrap(),
        // Unsaved-file marker.
        TitleRule::strip_prefix(&["Code"], "● ").unwrap(),
        // Unread counters.
        TitleRule::strip_prefix(&["www.messenger.com", "www.facebook.com"], r"\(\d+\)\s+")
            .unwrap(),
        TitleRule::strip_prefix(&["app.slack.com"], r"\*\s+").unwrap(),
    ]
});

const BUILTIN_ALIASES: [(&str, &str); 2] = [
    ("localhost:5600", "ActivityWatch"),
    ("localhost:5666", "ActivityWatch"),
];

/// Ordered title rules followed by ordered app aliases.
///
/// Every matching title rule runs, in table order. Aliases are applied one
/// after another, so a later alias sees the result of an earlier one.
#[derive(Debug, Clone)]
pub struct Normalizer {
    title_rules: Vec<TitleRule>,
    aliases: Vec<(String, String)>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            title_rules: BUILTIN_TITLE_RULES.clone(),
            aliases: BUILTIN_ALIASES
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        }
    }
}

impl Normalizer {
    /// A normalizer with no rules at all.
    pub const fn empty() -> Self {
        Self {
            title_rules: Vec::new(),
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_title_rule(mut self, rule: TitleRule) -> Self {
        self.title_rules.push(rule);
        self
    }

    #[must_use]
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.push((from.into(), to.into()));
        self
    }

    /// Cleans the title for `app`, then resolves the app's alias.
    ///
    /// Titles are cleaned under the pre-alias app name.
    pub fn apply(&self, app: String, title: String) -> (String, String) {
        let mut cleaned = title.as_str();
        for rule in &self.title_rules {
            if rule.applies_to(&app) {
                cleaned = rule.apply(cleaned);
            }
        }
        let stripped = title.len() - cleaned.len();
        let title = if stripped == 0 {
            title
        } else {
            title[stripped..].to_string()
        };

        let mut app = app;
        for (from, to) in &self.aliases {
            if app == *from {
                app.clone_from(to);
            }
        }
        (app, title)
    }
}
