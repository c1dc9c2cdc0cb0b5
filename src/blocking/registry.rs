use anyhow::{bail, Result};
use log::info;
use uuid::Uuid;

use crate::{
    db::{BlockedSite, Database},
    domain,
};

/// Durable list of blocked domains.
///
/// Callers are expected to force-refresh the [`super::BlockCache`] after every
/// mutation; the background actor does this before replying.
#[derive(Clone)]
pub struct BlockRegistry {
    db: Database,
}

impl BlockRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<BlockedSite>> {
        self.db.load_blocked_sites().await
    }

    /// Append a site. The url is reduced to its canonical domain and must not
    /// already be in the list.
    pub async fn add(
        &self,
        url: &str,
        name: &str,
        favicon: Option<String>,
    ) -> Result<BlockedSite> {
        let canonical = domain::canonical(url);
        if canonical.is_empty() {
            bail!("'{url}' is not a valid site");
        }

        let mut sites = self.db.load_blocked_sites().await?;
        if sites
            .iter()
            .any(|site| domain::canonical(&site.url) == canonical)
        {
            bail!("{canonical} is already blocked");
        }

        let name = match name.trim() {
            "" => domain::site_name(&canonical),
            trimmed => trimmed.to_string(),
        };

        let site = BlockedSite {
            id: Uuid::now_v7().to_string(),
            url: canonical,
            name,
            favicon,
        };
        sites.push(site.clone());
        self.db.save_blocked_sites(&sites).await?;

        info!("Blocked {} ({})", site.url, site.id);
        Ok(site)
    }

    /// Remove by id. Returns whether anything was removed.
    pub async fn remove(&self, site_id: &str) -> Result<bool> {
        let mut sites = self.db.load_blocked_sites().await?;
        let original_len = sites.len();
        sites.retain(|site| site.id != site_id);

        if sites.len() == original_len {
            return Ok(false);
        }

        self.db.save_blocked_sites(&sites).await?;
        info!("Unblocked site {site_id}");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BlockRegistry {
        BlockRegistry::new(Database::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn add_normalizes_and_keeps_insertion_order() {
        let registry = registry();
        let reddit = registry
            .add("https://www.Reddit.com/r/rust", "Reddit", None)
            .await
            .unwrap();
        let youtube = registry
            .add("youtube.com", "", Some("https://youtube.com/favicon.ico".into()))
            .await
            .unwrap();

        assert_eq!(reddit.url, "reddit.com");
        assert_eq!(youtube.name, "Youtube");

        let sites = registry.list().await.unwrap();
        assert_eq!(sites, vec![reddit, youtube]);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let registry = registry();
        let a = registry.add("a.com", "A", None).await.unwrap();
        let b = registry.add("b.com", "B", None).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn duplicate_domain_is_rejected() {
        let registry = registry();
        registry.add("example.com", "Example", None).await.unwrap();

        let err = registry
            .add("http://www.example.com/other", "Again", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already blocked"));
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let registry = registry();
        assert!(registry.add("https://", "Nothing", None).await.is_err());
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_by_id() {
        let registry = registry();
        let a = registry.add("a.com", "A", None).await.unwrap();
        let b = registry.add("b.com", "B", None).await.unwrap();

        assert!(registry.remove(&a.id).await.unwrap());
        assert!(!registry.remove(&a.id).await.unwrap());
        assert_eq!(registry.list().await.unwrap(), vec![b]);
    }
}
