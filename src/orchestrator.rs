//! Decides when rules are pushed into pages.
//!
//! Pages may not have their agent attached yet when a trigger fires; delivery
//! is best-effort with a bounded [`RetryPolicy`] and an observable
//! [`DeliveryOutcome`] instead of an error path.

use crate::config::RetryPolicy;
use crate::error::Result;
use crate::messaging::{PageMessage, Response, TabId};
use crate::rules::{RuleId, RuleRepository, SettingsRepository, hostname_of};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Why a message could not be handed to a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// No agent listens in the tab (yet); retried
    #[error("Receiving end does not exist in {0}")]
    NotReady(TabId),

    /// Any other transport failure; not retried
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Channel from the coordinator into page agents
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn send(&self, tab: TabId, message: PageMessage) -> std::result::Result<Response, DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The agent accepted the message
    Delivered { attempts: u32 },
    /// The agent never became ready
    Exhausted { attempts: u32 },
    /// The agent answered with an error, or the transport failed hard
    Rejected { reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Pushes rule sets into tabs on page load and on rule changes
pub struct Orchestrator {
    rules: Arc<dyn RuleRepository>,
    transport: Arc<dyn PageTransport>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(rules: Arc<dyn RuleRepository>, transport: Arc<dyn PageTransport>) -> Self {
        Self {
            rules,
            transport,
            policy: RetryPolicy::default(),
        }
    }

    /// Builder method: set the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// A tab finished loading `url`: push its site's rules, if any
    pub async fn on_page_load_complete(&self, tab: TabId, url: &str) -> Option<DeliveryOutcome> {
        let hostname = match hostname_of(url) {
            Ok(hostname) => hostname,
            Err(e) => {
                log::debug!("Not applying rules to {}: {}", tab, e);
                return None;
            }
        };
        let rules = self.rules.list(&hostname).await;
        if rules.is_empty() {
            return None;
        }
        log::debug!("Applying {} rule(s) for {} to {}", rules.len(), hostname, tab);
        Some(self.deliver(tab, PageMessage::ApplyRules { rules }).await)
    }

    /// The rule set of the tab's site changed: push the current set
    pub async fn on_rules_changed(&self, tab: TabId, url: &str) -> Result<DeliveryOutcome> {
        let hostname = hostname_of(url)?;
        let rules = self.rules.list(&hostname).await;
        Ok(self.deliver(tab, PageMessage::ApplyRules { rules }).await)
    }

    /// Delete a rule and undo it in the tab. Returns `None` when no rule
    /// with that id existed.
    pub async fn delete_rule(&self, tab: TabId, url: &str, id: &RuleId) -> Result<Option<DeliveryOutcome>> {
        let hostname = hostname_of(url)?;
        let Some(rule) = self.rules.remove_by_id(&hostname, id).await? else {
            return Ok(None);
        };
        Ok(Some(self.deliver(tab, PageMessage::RemoveRuleFromDom { rule }).await))
    }

    /// Delete every rule of the tab's site and return the page to its baseline
    pub async fn clear_site(&self, tab: TabId, url: &str) -> Result<DeliveryOutcome> {
        let hostname = hostname_of(url)?;
        self.rules.clear(&hostname).await?;
        Ok(self.deliver(tab, PageMessage::ApplyRules { rules: Vec::new() }).await)
    }

    /// Store the edit-mode flag and tell the tab
    pub async fn toggle_edit_mode(
        &self,
        settings: &dyn SettingsRepository,
        tab: TabId,
        enabled: bool,
    ) -> Result<DeliveryOutcome> {
        settings.set_edit_mode(enabled).await?;
        Ok(self.deliver(tab, PageMessage::ToggleEditMode { enabled }).await)
    }

    /// Send `message` following the retry policy
    pub async fn deliver(&self, tab: TabId, message: PageMessage) -> DeliveryOutcome {
        if !self.policy.initial_delay.is_zero() {
            tokio::time::sleep(self.policy.initial_delay).await;
        }

        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            match self.transport.send(tab, message.clone()).await {
                Ok(Response::Error { error }) => {
                    log::warn!("{} rejected '{}': {}", tab, message.action(), error);
                    return DeliveryOutcome::Rejected { reason: error };
                }
                Ok(_) => return DeliveryOutcome::Delivered { attempts: attempt },
                Err(DeliveryError::NotReady(_)) => {
                    log::debug!("Content script not ready yet in {} (attempt {}/{})", tab, attempt, attempts);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.interval).await;
                    }
                }
                Err(DeliveryError::Failed(reason)) => {
                    log::warn!("Failed to send '{}' to {}: {}", message.action(), tab, reason);
                    return DeliveryOutcome::Rejected { reason };
                }
            }
        }

        log::warn!("Gave up sending '{}' to {} after {} attempt(s)", message.action(), tab, attempts);
        DeliveryOutcome::Exhausted { attempts }
    }
}
