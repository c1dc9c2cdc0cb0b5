use std::collections::BTreeMap;

use crate::browser::TabId;

/// Last known URL of every open tab, fed by tab events from the extension.
/// Used for the retroactive re-scan and for reusing an open dashboard tab.
#[derive(Debug, Default)]
pub struct TabTracker {
    tabs: BTreeMap<TabId, String>,
}

impl TabTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tab_id: TabId, url: &str) {
        self.tabs.insert(tab_id, url.to_string());
    }

    pub fn forget(&mut self, tab_id: TabId) {
        self.tabs.remove(&tab_id);
    }

    pub fn url(&self, tab_id: TabId) -> Option<&str> {
        self.tabs.get(&tab_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TabId, &str)> {
        self.tabs.iter().map(|(id, url)| (*id, url.as_str()))
    }

    /// Lowest-numbered tab whose URL starts with `prefix`.
    pub fn find_with_prefix(&self, prefix: &str) -> Option<TabId> {
        self.iter()
            .find(|(_, url)| url.starts_with(prefix))
            .map(|(id, _)| id)
    }
}
