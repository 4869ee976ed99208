//! In-process wiring of page agents and the coordinator.

use crate::agent::{CoordinatorLink, PageAgent};
use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::messaging::{PageMessage, Request, Response, Sender, TabId};
use crate::orchestrator::{DeliveryError, PageTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// [`CoordinatorLink`] calling a coordinator directly as one tab
pub struct LocalLink {
    coordinator: Coordinator,
    sender: Sender,
}

impl LocalLink {
    pub fn new(coordinator: Coordinator, sender: Sender) -> Self {
        Self {
            coordinator,
            sender,
        }
    }
}

#[async_trait]
impl CoordinatorLink for LocalLink {
    async fn request(&self, request: Request) -> Result<Response> {
        Ok(self.coordinator.handle(request, &self.sender).await)
    }
}

/// [`PageTransport`] delivering to agents registered in this process.
/// Tabs without an attached agent report [`DeliveryError::NotReady`].
#[derive(Default)]
pub struct LocalTransport {
    agents: RwLock<HashMap<TabId, Arc<Mutex<PageAgent>>>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link for an agent about to run in `tab` on `url`
    pub fn link(coordinator: &Coordinator, tab: TabId, url: &str) -> Arc<dyn CoordinatorLink> {
        Arc::new(LocalLink::new(coordinator.clone(), Sender::tab(tab, url)))
    }

    /// Register the agent of `tab`, replacing any previous one
    pub async fn attach(&self, tab: TabId, agent: PageAgent) -> Arc<Mutex<PageAgent>> {
        let agent = Arc::new(Mutex::new(agent));
        self.agents.write().await.insert(tab, agent.clone());
        log::debug!("Agent attached to {}", tab);
        agent
    }

    pub async fn detach(&self, tab: TabId) -> Option<Arc<Mutex<PageAgent>>> {
        self.agents.write().await.remove(&tab)
    }

    pub async fn agent(&self, tab: TabId) -> Option<Arc<Mutex<PageAgent>>> {
        self.agents.read().await.get(&tab).cloned()
    }
}

#[async_trait]
impl PageTransport for LocalTransport {
    async fn send(&self, tab: TabId, message: PageMessage) -> std::result::Result<Response, DeliveryError> {
        let Some(agent) = self.agent(tab).await else {
            return Err(DeliveryError::NotReady(tab));
        };
        let mut agent = agent.lock().await;
        Ok(agent.handle_message(message).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineOptions, RetryPolicy};
    use crate::engine::{Page, RuleEngine};
    use crate::orchestrator::{DeliveryOutcome, Orchestrator};
    use crate::rules::{MemoryStore, RuleDraft, StoredRuleRepository};

    const URL: &str = "https://example.com/";

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tab_is_not_ready() {
        let transport = LocalTransport::new();
        let result = transport.send(TabId(9), PageMessage::ReapplyRules).await;
        assert_eq!(result.unwrap_err(), DeliveryError::NotReady(TabId(9)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_save_and_reload() {
        let coordinator = Coordinator::new(StoredRuleRepository::new(MemoryStore::new()));
        let transport = Arc::new(LocalTransport::new());
        let orchestrator = Orchestrator::new(coordinator.rules().clone(), transport.clone())
            .with_policy(RetryPolicy::immediate());
        let html = r#"<body><div id="ad-123" class="ad-banner">Ad</div></body>"#;
        let engine = RuleEngine::new(EngineOptions::new().inject_stylesheet(false));

        // first visit: the user removes the ad
        let agent = PageAgent::new(
            Page::parse(URL, html),
            engine.clone(),
            LocalTransport::link(&coordinator, TabId(1), URL),
        );
        let agent = transport.attach(TabId(1), agent).await;
        let ad = agent.lock().await.page().document().get_element_by_id("ad-123").unwrap();
        let draft = agent.lock().await.remove_element(ad).await.unwrap();
        assert_eq!(draft, RuleDraft::remove("#ad-123"));

        // reload: a fresh agent gets the rule pushed on load
        transport.detach(TabId(1)).await;
        let fresh = PageAgent::new(
            Page::parse(URL, html),
            engine,
            LocalTransport::link(&coordinator, TabId(1), URL),
        );
        let fresh = transport.attach(TabId(1), fresh).await;
        let outcome = orchestrator.on_page_load_complete(TabId(1), URL).await;

        assert_eq!(outcome, Some(DeliveryOutcome::Delivered { attempts: 1 }));
        let fresh = fresh.lock().await;
        assert!(fresh.page().to_html().contains(r#"class="ad-banner zapit-removed""#));
    }
}
