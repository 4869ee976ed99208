//! # zapit
//!
//! Persistent, reversible page edits keyed by hostname.
//!
//! A user picks an element on a page and removes it, restyles it or rewrites
//! its text. The edit is stored as a [`Rule`] bound to a synthesized CSS
//! selector, and re-applied on every later visit to the same site.
//!
//! ## Features
//!
//! - **Selector Codec**: Synthesize re-playable selectors for arbitrary elements and
//!   validate/escape hand-written or utility-class selectors before querying
//! - **Snapshot Store**: Capture pre-mutation state once per element so every edit is exactly reversible
//! - **Rule Repository**: Hostname-partitioned rule storage over a pluggable key-value store
//! - **Rule Engine**: Idempotent bulk application and single-rule revert
//! - **Orchestration**: Coordinator, page agents and bounded-retry delivery of rule sets
//!
//! ## Usage
//!
//! ```rust
//! use zapit::{EngineOptions, Page, RuleDraft, RuleEngine};
//!
//! let mut page = Page::parse(
//!     "https://example.com/news",
//!     r#"<body><div id="ad-123" class="ad-banner">Buy!</div></body>"#,
//! );
//! let engine = RuleEngine::new(EngineOptions::new().inject_stylesheet(false));
//!
//! let rule = RuleDraft::remove("#ad-123").stamp(page.url());
//! let report = engine.apply_all(&mut page, std::slice::from_ref(&rule));
//! assert_eq!(report.elements_touched, 1);
//!
//! engine.revert_one(&mut page, &rule)?;
//! assert!(!page.to_html().contains("zapit-removed"));
//! # Ok::<(), zapit::ZapError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: Live document model (arena DOM, inline styles)
//! - [`selector`]: Selector parsing, matching, escaping and synthesis
//! - [`snapshot`]: Per-document snapshot side-table
//! - [`rules`]: Rule records, key-value stores and the rule repository
//! - [`engine`]: Rule application engine
//! - [`messaging`], [`coordinator`], [`orchestrator`], [`agent`], [`transport`]: Moving rules between storage and pages
//! - [`error`]: Error types and result aliases

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod dom;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod orchestrator;
pub mod rules;
pub mod selector;
pub mod snapshot;
pub mod transport;

pub use agent::{CoordinatorLink, EditSession, PageAgent};
pub use config::{EngineOptions, RetryPolicy};
pub use coordinator::Coordinator;
pub use dom::{Document, ElementNode, InlineStyle, NodeId, StyleProperty};
pub use engine::{ApplyReport, Page, RuleEngine, SkippedRule};
pub use error::{Result, ZapError};
pub use messaging::{PageMessage, Request, Response, Sender, TabId};
pub use orchestrator::{DeliveryError, DeliveryOutcome, Orchestrator, PageTransport};
pub use rules::{
    JsonFileStore, KeyValueStore, MemoryStore, Rule, RuleAction, RuleDraft, RuleId,
    RuleRepository, SettingsRepository, StoredRuleRepository,
};
pub use selector::{escape_selector, synthesize};
pub use snapshot::{SnapshotKind, SnapshotStore};
pub use transport::{LocalLink, LocalTransport};
