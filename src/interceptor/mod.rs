//! Allow/redirect decisions for page loads.
//!
//! [`evaluate`] is a pure function of the URL, the focus state and a cache
//! snapshot; the background actor makes sure the snapshot is fresh before
//! calling it and carries out the redirect.

pub mod tabs;

use anyhow::{Context, Result};
use url::Url;

use crate::{
    blocking::CacheSnapshot,
    db::BlockedSite,
    domain,
    focus::FocusSessionState,
};

pub use tabs::TabTracker;

pub const BLOCK_PAGE_PATH: &str = "src/block/index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Browser-internal, extension or non-http(s) page.
    NotInterceptable,
    /// No focus session running (idle or paused).
    FocusInactive,
    NotBlocked,
    TemporarilyUnblocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow(AllowReason),
    Redirect {
        block_url: String,
        rule: BlockedSite,
    },
}

impl Verdict {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Verdict::Redirect { .. })
    }
}

/// The extension's block screen, addressed relative to the extension origin.
#[derive(Debug, Clone)]
pub struct BlockPage {
    base: Url,
}

impl BlockPage {
    pub fn new(extension_origin: &str, path: &str) -> Result<Self> {
        let origin = Url::parse(extension_origin)
            .with_context(|| format!("invalid extension origin '{extension_origin}'"))?;
        let base = origin
            .join(path)
            .with_context(|| format!("invalid block page path '{path}'"))?;
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// `<block page>?url=<original>&name=<name>`
    pub fn url_for(&self, original_url: &str, name: &str) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("url", original_url)
            .append_pair("name", name);
        url.to_string()
    }
}

/// Only plain web pages are ever blocked.
pub fn is_interceptable(url: &str) -> bool {
    let lowered = url.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

/// Display name shown on the block screen for a matched rule.
pub fn display_name(rule: &BlockedSite) -> String {
    match rule.name.trim() {
        "" => domain::site_name(&rule.url),
        name => name.to_string(),
    }
}

pub fn evaluate(
    url: &str,
    focus: &FocusSessionState,
    snapshot: &CacheSnapshot,
    now_ms: i64,
    block_page: &BlockPage,
) -> Verdict {
    if !is_interceptable(url) {
        return Verdict::Allow(AllowReason::NotInterceptable);
    }
    if !focus.is_running() {
        return Verdict::Allow(AllowReason::FocusInactive);
    }

    let host = domain::normalize(url);
    let Some(rule) = snapshot.blocking_rule(&host) else {
        return Verdict::Allow(AllowReason::NotBlocked);
    };

    if snapshot.active_unblock(&host, now_ms).is_some() {
        return Verdict::Allow(AllowReason::TemporarilyUnblocked);
    }

    Verdict::Redirect {
        block_url: block_page.url_for(url, &display_name(rule)),
        rule: rule.clone(),
    }
}
