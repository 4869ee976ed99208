//! Rule records and their hostname-partitioned persistence

pub mod model;
pub mod repository;
pub mod store;

pub use model::{Rule, RuleAction, RuleDraft, RuleId};
pub use repository::{
    EDIT_MODE_KEY, RuleRepository, SettingsRepository, StoredRuleRepository, hostname_of,
    storage_key,
};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
