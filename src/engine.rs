//! Rule application engine
//!
//! Applies stored rules to a live [`Page`] and reverts them. Every bulk
//! application starts by returning the page to its baseline, so re-running
//! [`RuleEngine::apply_all`] with the same rules always converges to the same
//! state no matter how often or in which partial order it ran before.

use crate::config::EngineOptions;
use crate::dom::{Document, ElementNode, NodeId, StyleProperty};
use crate::error::{Result, ZapError};
use crate::rules::{Rule, RuleAction, RuleDraft, RuleId};
use crate::selector::synthesize_with_prefix;
use crate::snapshot::{SnapshotKind, SnapshotStore};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A loaded document together with its snapshot side-table
#[derive(Debug, Clone)]
pub struct Page {
    url: String,
    document: Document,
    snapshots: SnapshotStore,
}

impl Page {
    pub fn new(url: impl Into<String>, document: Document) -> Self {
        Self {
            url: url.into(),
            document,
            snapshots: SnapshotStore::new(),
        }
    }

    /// Parse `html` as the page loaded from `url`
    pub fn parse(url: impl Into<String>, html: &str) -> Self {
        Self::new(url, Document::parse(html))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Serialize the current state of the document
    pub fn to_html(&self) -> String {
        self.document.to_html()
    }
}

/// A rule `apply_all` could not apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: RuleId,
    pub selector: String,
    pub reason: String,
}

/// Outcome of one apply pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Rules whose selector resolved (possibly to zero elements)
    pub rules_applied: usize,

    /// Element mutations performed across all rules
    pub elements_touched: usize,

    /// Rules skipped because of an error, in stored order
    pub skipped: Vec<SkippedRule>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Applies and reverts rules against pages
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    options: EngineOptions,
}

impl RuleEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Reset the page to its baseline and apply `rules` in order.
    ///
    /// A rule that fails (unparseable selector, DOM error) is logged and
    /// reported; it never aborts the remaining rules.
    pub fn apply_all(&self, page: &mut Page, rules: &[Rule]) -> ApplyReport {
        let mut report = ApplyReport::default();

        if let Err(e) = page.snapshots.clear_all(&mut page.document, &self.options.removed_class) {
            log::warn!("Failed to restore page baseline: {}", e);
        }
        if self.options.inject_stylesheet {
            self.ensure_stylesheet(&mut page.document);
        }

        for rule in rules {
            match self.apply_rule(page, &rule.selector, &rule.action) {
                Ok(touched) => {
                    report.rules_applied += 1;
                    report.elements_touched += touched;
                }
                Err(e) => {
                    log::warn!("Error applying rule {} ({}): {}", rule.id, rule.selector, e);
                    report.skipped.push(SkippedRule {
                        rule_id: rule.id.clone(),
                        selector: rule.selector.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::debug!(
            "Applied {} of {} rule(s) to {}, {} element(s) touched",
            report.rules_applied,
            rules.len(),
            page.url,
            report.elements_touched
        );
        report
    }

    /// Apply one rule's effect to every element it matches
    pub fn apply_rule(&self, page: &mut Page, selector: &str, action: &RuleAction) -> Result<usize> {
        let nodes = page.document.query_selector_all(selector)?;
        let mut touched = 0;

        for node in nodes {
            // an earlier text edit may have replaced this node
            if !page.document.is_connected(node) {
                continue;
            }
            match action {
                RuleAction::Remove {} => {
                    if let Some(element) = page.document.element_mut(node) {
                        element.add_class(&self.options.removed_class);
                        touched += 1;
                    }
                }
                RuleAction::Style { styles } => {
                    if styles.is_empty() {
                        continue;
                    }
                    page.snapshots
                        .capture_style_if_absent(&page.document, node, styles.keys())?;
                    if let Some(element) = page.document.element_mut(node) {
                        for (property, value) in styles {
                            element.set_style(property, value);
                        }
                        touched += 1;
                    }
                }
                RuleAction::EditText { new_text, .. } => {
                    if new_text.is_empty() || page.snapshots.has_snapshot(node, SnapshotKind::Text) {
                        continue;
                    }
                    page.snapshots.capture_text_if_absent(&page.document, node)?;
                    page.document.set_inner_html(node, new_text)?;
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }

    /// Undo one rule on every element it matches.
    ///
    /// Style rules write back the captured values of their own properties;
    /// properties that were never captured are removed instead.
    pub fn revert_one(&self, page: &mut Page, rule: &Rule) -> Result<usize> {
        self.revert(page, &rule.selector, &rule.action)
    }

    pub fn revert(&self, page: &mut Page, selector: &str, action: &RuleAction) -> Result<usize> {
        let nodes = page.document.query_selector_all(selector)?;
        let mut reverted = 0;

        for node in nodes {
            match action {
                RuleAction::Remove {} => {
                    if let Some(element) = page.document.element_mut(node) {
                        if element.remove_class(&self.options.removed_class) {
                            reverted += 1;
                        }
                    }
                }
                RuleAction::Style { styles } => {
                    let missing = page
                        .snapshots
                        .restore_styles(&mut page.document, node, styles.keys())?;
                    if let Some(element) = page.document.element_mut(node) {
                        for property in &missing {
                            element.remove_style(property);
                        }
                    }
                    reverted += 1;
                }
                RuleAction::EditText { .. } => {
                    if page.snapshots.restore(&mut page.document, node, SnapshotKind::Text)? {
                        reverted += 1;
                    }
                }
            }
        }

        log::debug!("Reverted {} rule on {} element(s) ({})", action.name(), reverted, selector);
        Ok(reverted)
    }

    /// Selector for `node`, ignoring the engine's own UI classes
    pub fn synthesize(&self, page: &Page, node: NodeId) -> Result<String> {
        synthesize_with_prefix(&page.document, node, &self.options.ui_prefix)
    }

    /// Hide `node` right away and return the matching `remove` rule
    pub fn remove_element(&self, page: &mut Page, node: NodeId) -> Result<RuleDraft> {
        let selector = self.synthesize(page, node)?;
        let element = page
            .document
            .element_mut(node)
            .ok_or_else(|| ZapError::ElementNotFound(node.to_string()))?;
        element.add_class(&self.options.removed_class);
        Ok(RuleDraft::remove(selector))
    }

    /// Apply the non-empty `styles` to `node` and return the matching
    /// `style` rule
    pub fn style_element(
        &self,
        page: &mut Page,
        node: NodeId,
        styles: IndexMap<StyleProperty, String>,
    ) -> Result<RuleDraft> {
        let selector = self.synthesize(page, node)?;
        let styles: IndexMap<StyleProperty, String> = styles
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();

        page.snapshots
            .capture_style_if_absent(&page.document, node, styles.keys())?;
        if let Some(element) = page.document.element_mut(node) {
            for (property, value) in &styles {
                element.set_style(property, value);
            }
        }
        Ok(RuleDraft::style(selector, styles))
    }

    /// Replace the markup of `node` and return the matching `editText` rule,
    /// or `None` when the markup is unchanged
    pub fn edit_text(&self, page: &mut Page, node: NodeId, new_text: &str) -> Result<Option<RuleDraft>> {
        let selector = self.synthesize(page, node)?;
        let original = page.document.inner_html(node);
        if page.document.text_content(node).trim().is_empty() && original.trim().is_empty() {
            return Err(ZapError::NothingToEdit(format!("{} has no text", selector)));
        }
        if new_text == original {
            return Ok(None);
        }

        page.snapshots.capture_text_if_absent(&page.document, node)?;
        page.document.set_inner_html(node, new_text)?;
        Ok(Some(RuleDraft::edit_text(selector, original, new_text)))
    }

    fn ensure_stylesheet(&self, doc: &mut Document) {
        let id = self.options.stylesheet_id();
        if doc.get_element_by_id(&id).is_some() {
            return;
        }
        let Some(parent) = doc.head().or_else(|| doc.document_element()) else {
            return;
        };
        let style = doc.create_element(ElementNode::new("style").with_attribute("id", id));
        let css = doc.create_text(self.options.stylesheet());
        let attached = doc
            .append_child(style, css)
            .and_then(|_| doc.append_child(parent, style));
        if let Err(e) = attached {
            log::warn!("Failed to inject stylesheet: {}", e);
        }
    }
}
