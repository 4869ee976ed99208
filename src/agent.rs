//! The page-side counterpart of the coordinator.
//!
//! A [`PageAgent`] owns one loaded [`Page`], applies the rules pushed to it and
//! turns picking-UI actions into saved rules. Edit mode is an explicit
//! [`EditSession`] that exists only while the mode is on.

use crate::dom::{Document, ElementNode, NodeId, StyleProperty};
use crate::engine::{ApplyReport, Page, RuleEngine};
use crate::error::{Result, ZapError};
use crate::messaging::{PageMessage, Request, Response};
use crate::rules::{Rule, RuleDraft};
use crate::selector::synthesize_with_prefix;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// Request channel from a page agent to the coordinator
#[async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn request(&self, request: Request) -> Result<Response>;
}

/// Element selection state that lives exactly as long as edit mode.
///
/// Starting a session marks `<body>` and adds the selection overlay; ending
/// it removes both along with any highlight, so nothing is left dangling.
#[derive(Debug)]
pub struct EditSession {
    ui_prefix: String,
    overlay: Option<NodeId>,
    highlighted: Option<NodeId>,
    selected: Option<NodeId>,
}

impl EditSession {
    pub fn start(doc: &mut Document, ui_prefix: &str) -> Self {
        let mut session = Self {
            ui_prefix: ui_prefix.to_string(),
            overlay: None,
            highlighted: None,
            selected: None,
        };
        if let Some(body) = doc.body() {
            let mode_class = session.class("selection-mode");
            if let Some(element) = doc.element_mut(body) {
                element.add_class(&mode_class);
            }
            let overlay = doc.create_element(
                ElementNode::new("div").with_attribute("class", session.class("selector-overlay")),
            );
            match doc.append_child(body, overlay) {
                Ok(()) => session.overlay = Some(overlay),
                Err(e) => log::warn!("Failed to add selection overlay: {}", e),
            }
        }
        log::debug!("Edit mode enabled");
        session
    }

    /// Tear the session down, undoing every change it made to the page
    pub fn end(mut self, doc: &mut Document) {
        self.unhighlight(doc);
        if let Some(overlay) = self.overlay.take() {
            doc.detach(overlay);
        }
        let mode_class = self.class("selection-mode");
        if let Some(element) = doc.body().and_then(|body| doc.element_mut(body)) {
            element.remove_class(&mode_class);
        }
        log::debug!("Edit mode disabled");
    }

    fn class(&self, name: &str) -> String {
        format!("{}{}", self.ui_prefix, name)
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlighted
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    /// Elements of the injected UI, their descendants and elements being
    /// edited in place cannot be picked
    pub fn should_ignore(&self, doc: &Document, node: NodeId) -> bool {
        let Some(element) = doc.element(node) else {
            return true;
        };
        if element.get_attribute("contenteditable") == Some("true") {
            return true;
        }
        if element.has_class(&self.class("selector-overlay")) {
            return true;
        }
        let containers = [self.class("context-menu"), self.class("style-panel")];
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(el) = doc.element(id) {
                if containers.iter().any(|c| el.has_class(c)) {
                    return true;
                }
                if el.id().is_some_and(|i| i.starts_with(&self.ui_prefix)) {
                    return true;
                }
            }
            current = doc.parent_element(id);
        }
        false
    }

    /// Pointer entered `node`: highlight it with its info label.
    /// Returns false when the element is ignored.
    pub fn hover(&mut self, doc: &mut Document, node: NodeId) -> bool {
        if self.should_ignore(doc, node) {
            return false;
        }
        self.unhighlight(doc);
        let highlight = self.class("element-highlight");
        let info_attr = format!("data-{}info", self.ui_prefix);
        if let Some(element) = doc.element_mut(node) {
            let label = element.info_label();
            element.add_class(&highlight);
            element.set_attribute(info_attr, label);
            self.highlighted = Some(node);
        }
        true
    }

    pub fn unhighlight(&mut self, doc: &mut Document) {
        let Some(node) = self.highlighted.take() else {
            return;
        };
        let highlight = self.class("element-highlight");
        let info_attr = format!("data-{}info", self.ui_prefix);
        if let Some(element) = doc.element_mut(node) {
            element.remove_class(&highlight);
            element.remove_attribute(&info_attr);
        }
    }

    /// Pick `node` and return its synthesized selector, or `None` when the
    /// element is ignored
    pub fn select(&mut self, doc: &mut Document, node: NodeId) -> Result<Option<String>> {
        if self.should_ignore(doc, node) {
            return Ok(None);
        }
        self.unhighlight(doc);
        let selector = synthesize_with_prefix(doc, node, &self.ui_prefix)?;
        self.selected = Some(node);
        Ok(Some(selector))
    }

    /// Escape key: drop highlight and selection
    pub fn cancel(&mut self, doc: &mut Document) {
        self.unhighlight(doc);
        self.selected = None;
    }
}

/// Content-script side of one tab
pub struct PageAgent {
    page: Page,
    engine: RuleEngine,
    link: Arc<dyn CoordinatorLink>,
    session: Option<EditSession>,
    last_report: Option<ApplyReport>,
}

impl PageAgent {
    pub fn new(page: Page, engine: RuleEngine, link: Arc<dyn CoordinatorLink>) -> Self {
        Self {
            page,
            engine,
            link,
            session: None,
            last_report: None,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// Report of the most recent apply pass
    pub fn last_report(&self) -> Option<&ApplyReport> {
        self.last_report.as_ref()
    }

    /// Restore edit mode and apply the stored rules of this page's site
    pub async fn init(&mut self) -> Result<ApplyReport> {
        match self.link.request(Request::GetEditMode).await {
            Ok(Response::EditMode { edit_mode: true }) => self.enable_edit_mode(),
            Ok(_) => {}
            Err(e) => log::error!("Error loading initial state: {}", e),
        }
        self.load_and_apply_rules().await
    }

    /// Fetch this page's rules from the coordinator and apply them
    pub async fn load_and_apply_rules(&mut self) -> Result<ApplyReport> {
        let request = Request::GetRules {
            url: Some(self.page.url().to_string()),
        };
        match self.link.request(request).await? {
            Response::Rules { rules } => Ok(self.apply(&rules)),
            Response::Error { error } => Err(ZapError::MessageFailed {
                action: "getRules".to_string(),
                reason: error,
            }),
            other => Err(ZapError::MessageFailed {
                action: "getRules".to_string(),
                reason: format!("unexpected response {:?}", other),
            }),
        }
    }

    fn apply(&mut self, rules: &[Rule]) -> ApplyReport {
        let report = self.engine.apply_all(&mut self.page, rules);
        self.last_report = Some(report.clone());
        report
    }

    /// Handle a notification pushed by the coordinator
    pub async fn handle_message(&mut self, message: PageMessage) -> Response {
        match message {
            PageMessage::ToggleEditMode { enabled } => {
                if enabled {
                    self.enable_edit_mode();
                } else {
                    self.disable_edit_mode();
                }
            }
            PageMessage::ReapplyRules => {
                if let Err(e) = self.load_and_apply_rules().await {
                    log::error!("Error loading rules: {}", e);
                }
            }
            PageMessage::RemoveRuleFromDom { rule } => {
                if let Err(e) = self.engine.revert_one(&mut self.page, &rule) {
                    log::error!("Error removing rule {} from page: {}", rule.id, e);
                }
            }
            PageMessage::ApplyRules { rules } => {
                self.apply(&rules);
            }
        }
        Response::ok()
    }

    pub fn is_edit_mode(&self) -> bool {
        self.session.is_some()
    }

    pub fn enable_edit_mode(&mut self) {
        if self.session.is_none() {
            let prefix = self.engine.options().ui_prefix.clone();
            self.session = Some(EditSession::start(self.page.document_mut(), &prefix));
        }
    }

    pub fn disable_edit_mode(&mut self) {
        if let Some(session) = self.session.take() {
            session.end(self.page.document_mut());
        }
    }

    /// Pointer over `node` while editing
    pub fn hover(&mut self, node: NodeId) -> bool {
        match self.session.as_mut() {
            Some(session) => session.hover(self.page.document_mut(), node),
            None => false,
        }
    }

    /// Click on `node` while editing; returns its selector
    pub fn select(&mut self, node: NodeId) -> Result<Option<String>> {
        match self.session.as_mut() {
            Some(session) => session.select(self.page.document_mut(), node),
            None => Ok(None),
        }
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Hide `node` and save the `remove` rule
    pub async fn remove_element(&mut self, node: NodeId) -> Result<RuleDraft> {
        let draft = self.engine.remove_element(&mut self.page, node)?;
        self.save_rule(draft.clone()).await?;
        Ok(draft)
    }

    /// Restyle `node` and save the `style` rule
    pub async fn style_element(
        &mut self,
        node: NodeId,
        styles: IndexMap<StyleProperty, String>,
    ) -> Result<RuleDraft> {
        let draft = self.engine.style_element(&mut self.page, node, styles)?;
        self.save_rule(draft.clone()).await?;
        Ok(draft)
    }

    /// Replace the markup of `node` and save the `editText` rule, unless
    /// nothing changed
    pub async fn edit_text(&mut self, node: NodeId, new_text: &str) -> Result<Option<RuleDraft>> {
        let Some(draft) = self.engine.edit_text(&mut self.page, node, new_text)? else {
            return Ok(None);
        };
        self.save_rule(draft.clone()).await?;
        Ok(Some(draft))
    }

    /// Ask the coordinator to persist `draft`
    pub async fn save_rule(&self, draft: RuleDraft) -> Result<()> {
        match self.link.request(Request::SaveRule { rule: draft }).await? {
            Response::Error { error } => Err(ZapError::MessageFailed {
                action: "saveRule".to_string(),
                reason: error,
            }),
            _ => Ok(()),
        }
    }
}
