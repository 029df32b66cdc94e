//! Content safety collaborator.
//!
//! User-chosen names (display name, channel name) pass through a safety
//! check before a session commits them. The check is fail-open: an
//! implementation that cannot reach its backend must answer `true`.

use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use trx_core::config::SafetyConfig;

/// Trait for anything that can judge user-supplied text.
pub trait ContentSafety: Send + Sync {
    /// `true` = safe to use. Must resolve to `true` when the check cannot
    /// be performed.
    fn check<'a>(&'a self, text: &'a str) -> BoxFuture<'a, bool>;
}

/// Accepts everything. The behavior when no moderation backend is configured.
pub struct AllowAll;

impl ContentSafety for AllowAll {
    fn check<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, bool> {
        future::ready(true).boxed()
    }
}

/// Rejects text containing any configured term, case-insensitively.
/// Blank text is rejected.
pub struct Blocklist {
    terms: Vec<String>,
}

impl Blocklist {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    fn verdict(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let lowered = text.to_lowercase();
        match self.terms.iter().find(|t| lowered.contains(t.as_str())) {
            Some(term) => {
                tracing::debug!(term = %term, "text matched blocked term");
                false
            }
            None => true,
        }
    }
}

impl ContentSafety for Blocklist {
    fn check<'a>(&'a self, text: &'a str) -> BoxFuture<'a, bool> {
        future::ready(self.verdict(text)).boxed()
    }
}

/// Build the checker described by the config.
pub fn from_config(config: &SafetyConfig) -> Arc<dyn ContentSafety> {
    if config.enabled {
        Arc::new(Blocklist::new(&config.blocked_terms))
    } else {
        Arc::new(AllowAll)
    }
}
