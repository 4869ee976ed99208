use crate::error::{Result, ZapError};
use crate::rules::model::{Rule, RuleId};
use crate::rules::store::KeyValueStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Storage key of the global edit-mode flag
pub const EDIT_MODE_KEY: &str = "editMode";

/// Hostname partition of a page URL
pub fn hostname_of(page_url: &str) -> Result<String> {
    let parsed = Url::parse(page_url).map_err(|e| ZapError::InvalidUrl(format!("{}: {}", page_url, e)))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(ZapError::InvalidUrl(format!("{}: no hostname", page_url))),
    }
}

/// Storage key of one hostname partition
pub fn storage_key(hostname: &str) -> String {
    format!("rules_{}", hostname)
}

/// Hostname-partitioned, insertion-ordered rule collection
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Append a rule to the partition
    async fn add(&self, hostname: &str, rule: Rule) -> Result<()>;

    /// Rules of the partition in creation order
    async fn try_list(&self, hostname: &str) -> Result<Vec<Rule>>;

    /// Delete the rule with `id`, returning it when it existed
    async fn remove_by_id(&self, hostname: &str, id: &RuleId) -> Result<Option<Rule>>;

    /// Drop the whole partition
    async fn clear(&self, hostname: &str) -> Result<()>;

    /// Like [`try_list`](Self::try_list), degrading to an empty list on failure
    async fn list(&self, hostname: &str) -> Vec<Rule> {
        match self.try_list(hostname).await {
            Ok(rules) => rules,
            Err(e) => {
                log::error!("Error while retrieving rules for {}: {}", hostname, e);
                Vec::new()
            }
        }
    }
}

/// Global settings shared by every page
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Current edit-mode flag; `false` when unset or unreadable
    async fn edit_mode(&self) -> bool;

    async fn set_edit_mode(&self, enabled: bool) -> Result<()>;
}

/// [`RuleRepository`] over any [`KeyValueStore`], one key per hostname
#[derive(Debug)]
pub struct StoredRuleRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for StoredRuleRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> StoredRuleRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write `editMode: false` when the flag has never been stored
    pub async fn initialize_defaults(&self) -> Result<()> {
        if self.store.get(EDIT_MODE_KEY).await?.is_none() {
            log::debug!("Initializing {} to false", EDIT_MODE_KEY);
            self.store.set(EDIT_MODE_KEY, Value::Bool(false)).await?;
        }
        Ok(())
    }

    /// Stored records of a partition, decoded or not
    async fn read_records(&self, hostname: &str) -> Result<Vec<Value>> {
        match self.store.get(&storage_key(hostname)).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(ZapError::Storage(format!(
                "rules of {} are not a list: {}",
                hostname, other
            ))),
        }
    }

    async fn write_records(&self, hostname: &str, records: Vec<Value>) -> Result<()> {
        self.store
            .set(&storage_key(hostname), Value::Array(records))
            .await
    }
}

/// One record as a rule; records that do not decode are skipped, never dropped
fn decode_record(hostname: &str, record: &Value) -> Option<Rule> {
    match serde_json::from_value(record.clone()) {
        Ok(rule) => Some(rule),
        Err(e) => {
            log::warn!("Skipping unreadable rule for {}: {}", hostname, e);
            None
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> RuleRepository for StoredRuleRepository<S> {
    async fn add(&self, hostname: &str, rule: Rule) -> Result<()> {
        let mut records = self.read_records(hostname).await?;
        records.push(serde_json::to_value(&rule)?);
        self.write_records(hostname, records).await?;
        log::info!("Rule saved for {}: {} {} ({})", hostname, rule.action.name(), rule.selector, rule.id);
        Ok(())
    }

    async fn try_list(&self, hostname: &str) -> Result<Vec<Rule>> {
        let records = self.read_records(hostname).await?;
        Ok(records
            .iter()
            .filter_map(|record| decode_record(hostname, record))
            .collect())
    }

    async fn remove_by_id(&self, hostname: &str, id: &RuleId) -> Result<Option<Rule>> {
        let mut records = self.read_records(hostname).await?;
        let found = records.iter().enumerate().find_map(|(position, record)| {
            serde_json::from_value::<Rule>(record.clone())
                .ok()
                .filter(|rule| &rule.id == id)
                .map(|rule| (position, rule))
        });
        let Some((position, removed)) = found else {
            log::debug!("No rule {} for {}", id, hostname);
            return Ok(None);
        };
        records.remove(position);
        self.write_records(hostname, records).await?;
        log::info!("Rule {} deleted for {}", id, hostname);
        Ok(Some(removed))
    }

    async fn clear(&self, hostname: &str) -> Result<()> {
        self.store.remove(&storage_key(hostname)).await?;
        log::info!("All rules cleared for {}", hostname);
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValueStore> SettingsRepository for StoredRuleRepository<S> {
    async fn edit_mode(&self) -> bool {
        match self.store.get(EDIT_MODE_KEY).await {
            Ok(Some(Value::Bool(enabled))) => enabled,
            Ok(_) => false,
            Err(e) => {
                log::error!("Error getting edit mode: {}", e);
                false
            }
        }
    }

    async fn set_edit_mode(&self, enabled: bool) -> Result<()> {
        self.store.set(EDIT_MODE_KEY, Value::Bool(enabled)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::RuleDraft;
    use crate::rules::store::MemoryStore;
    use serde_json::json;

    fn create_test_repository() -> StoredRuleRepository<MemoryStore> {
        StoredRuleRepository::new(MemoryStore::new())
    }

    #[test]
    fn test_hostname_of() {
        assert_eq!(hostname_of("https://www.example.com/a/b?q=1").unwrap(), "www.example.com");
        assert_eq!(hostname_of("http://localhost:8080/").unwrap(), "localhost");
        assert!(matches!(hostname_of("not a url"), Err(ZapError::InvalidUrl(_))));
        assert!(matches!(hostname_of("file:///tmp/page.html"), Err(ZapError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_add_and_list_in_order() {
        let repo = create_test_repository();
        let first = RuleDraft::remove("#a").stamp("https://example.com/x");
        let second = RuleDraft::remove("#b").stamp("https://example.com/y");

        repo.add("example.com", first.clone()).await.unwrap();
        repo.add("example.com", second.clone()).await.unwrap();

        assert_eq!(repo.list("example.com").await, vec![first, second]);
        assert!(repo.list("other.org").await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_id_returns_removed_rule() {
        let repo = create_test_repository();
        let rule = RuleDraft::remove("#a").stamp("https://example.com/");
        let keep = RuleDraft::remove("#b").stamp("https://example.com/");
        repo.add("example.com", rule.clone()).await.unwrap();
        repo.add("example.com", keep.clone()).await.unwrap();

        let removed = repo.remove_by_id("example.com", &rule.id).await.unwrap();
        assert_eq!(removed, Some(rule.clone()));
        assert_eq!(repo.remove_by_id("example.com", &rule.id).await.unwrap(), None);
        assert_eq!(repo.list("example.com").await, vec![keep]);
    }

    #[tokio::test]
    async fn test_clear_partition() {
        let repo = create_test_repository();
        repo.add("example.com", RuleDraft::remove("#a").stamp("https://example.com/"))
            .await
            .unwrap();
        repo.add("other.org", RuleDraft::remove("#b").stamp("https://other.org/"))
            .await
            .unwrap();

        repo.clear("example.com").await.unwrap();

        assert!(repo.list("example.com").await.is_empty());
        assert_eq!(repo.list("other.org").await.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_partition_degrades_to_empty_list() {
        let repo = create_test_repository();
        repo.store().set("rules_example.com", json!("garbage")).await.unwrap();

        assert!(repo.try_list("example.com").await.is_err());
        assert!(repo.list("example.com").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_record_does_not_hide_the_rest() {
        let repo = create_test_repository();
        let good = RuleDraft::remove("#a").stamp("https://example.com/");
        let unknown = json!({"id": "x1", "selector": "#b", "action": "explode", "created": "2024-01-01T00:00:00Z"});
        repo.store()
            .set("rules_example.com", json!([good, unknown]))
            .await
            .unwrap();

        assert_eq!(repo.try_list("example.com").await.unwrap(), vec![good.clone()]);

        let added = RuleDraft::remove("#c").stamp("https://example.com/");
        repo.add("example.com", added.clone()).await.unwrap();
        assert_eq!(repo.list("example.com").await, vec![good.clone(), added.clone()]);

        repo.remove_by_id("example.com", &good.id).await.unwrap();
        let stored = repo.store().get("rules_example.com").await.unwrap().unwrap();
        assert_eq!(stored, json!([unknown, added]));
    }

    #[tokio::test]
    async fn test_edit_mode_defaults() {
        let repo = create_test_repository();
        assert!(!repo.edit_mode().await);

        repo.initialize_defaults().await.unwrap();
        assert_eq!(repo.store().get(EDIT_MODE_KEY).await.unwrap(), Some(json!(false)));

        repo.set_edit_mode(true).await.unwrap();
        repo.initialize_defaults().await.unwrap();
        assert!(repo.edit_mode().await);
    }
}
