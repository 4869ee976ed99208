//! Pre-mutation state of live elements.
//!
//! Snapshots live in a side-table keyed by [`NodeId`] rather than on the
//! elements themselves. A snapshot is taken at most once per element and kind,
//! so repeated or overlapping applications always restore the true original.

use crate::dom::{Document, NodeId, StyleProperty};
use crate::error::{Result, ZapError};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    /// Inline values of the properties a style rule overwrote
    Style,
    /// Children replaced by a text edit
    Text,
}

#[derive(Debug, Clone, Default)]
struct ElementSnapshot {
    styles: Option<Vec<(StyleProperty, String)>>,
    text: Option<Vec<NodeId>>,
}

impl ElementSnapshot {
    fn is_empty(&self) -> bool {
        self.styles.is_none() && self.text.is_none()
    }
}

/// Per-document snapshot side-table
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    entries: HashMap<NodeId, ElementSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_snapshot(&self, node: NodeId, kind: SnapshotKind) -> bool {
        self.entries.get(&node).is_some_and(|entry| match kind {
            SnapshotKind::Style => entry.styles.is_some(),
            SnapshotKind::Text => entry.text.is_some(),
        })
    }

    /// Number of elements holding at least one snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the current inline values of `properties`. Values already
    /// captured are never overwritten; properties missing from an existing
    /// snapshot are added to it, since nothing has modified them yet.
    /// Returns whether anything new was recorded.
    pub fn capture_style_if_absent<'a>(
        &mut self,
        doc: &Document,
        node: NodeId,
        properties: impl IntoIterator<Item = &'a StyleProperty>,
    ) -> Result<bool> {
        let element = doc.require_element(node)?;
        let existing = self.entries.get(&node).and_then(|e| e.styles.as_ref());

        let mut fresh: Vec<(StyleProperty, String)> = Vec::new();
        for property in properties {
            let known = existing.is_some_and(|styles| styles.iter().any(|(p, _)| p == property))
                || fresh.iter().any(|(p, _)| p == property);
            if !known {
                fresh.push((property.clone(), element.style_value(property)));
            }
        }
        if fresh.is_empty() {
            return Ok(false);
        }

        log::debug!("Captured {} style value(s) of {}", fresh.len(), node);
        self.entries
            .entry(node)
            .or_default()
            .styles
            .get_or_insert_with(Vec::new)
            .extend(fresh);
        Ok(true)
    }

    /// Record the current children unless a text snapshot already exists.
    /// The nodes themselves are kept, not their markup, so restoring puts
    /// back the very same elements along with any state held on them.
    pub fn capture_text_if_absent(&mut self, doc: &Document, node: NodeId) -> Result<bool> {
        if self.has_snapshot(node, SnapshotKind::Text) {
            return Ok(false);
        }
        doc.require_element(node)?;
        let children = doc.children(node).to_vec();
        self.entries.entry(node).or_default().text = Some(children);
        Ok(true)
    }

    /// Write the captured state back and forget it. A missing snapshot is
    /// not an error; returns whether anything was restored.
    pub fn restore(&mut self, doc: &mut Document, node: NodeId, kind: SnapshotKind) -> Result<bool> {
        let Some(entry) = self.entries.get_mut(&node) else {
            return Ok(false);
        };
        let restored = match kind {
            SnapshotKind::Style => match entry.styles.take() {
                Some(styles) => {
                    if let Some(element) = doc.element_mut(node) {
                        for (property, value) in &styles {
                            element.set_style(property, value);
                        }
                    }
                    true
                }
                None => false,
            },
            SnapshotKind::Text => match entry.text.take() {
                Some(children) => {
                    doc.replace_children(node, &children)?;
                    true
                }
                None => false,
            },
        };
        if entry.is_empty() {
            self.entries.remove(&node);
        }
        Ok(restored)
    }

    /// Write back the captured values of `properties` only. The snapshot is
    /// kept, so another rule touching the same properties still restores the
    /// original. Returns the properties that had no captured value.
    pub fn restore_styles<'a>(
        &self,
        doc: &mut Document,
        node: NodeId,
        properties: impl IntoIterator<Item = &'a StyleProperty>,
    ) -> Result<Vec<StyleProperty>> {
        let captured = self.entries.get(&node).and_then(|e| e.styles.as_ref());
        let element = doc
            .element_mut(node)
            .ok_or_else(|| ZapError::ElementNotFound(node.to_string()))?;

        let mut missing = Vec::new();
        for property in properties {
            match captured.and_then(|styles| styles.iter().find(|(p, _)| p == property)) {
                Some((_, value)) => element.set_style(property, value),
                None => missing.push(property.clone()),
            }
        }
        Ok(missing)
    }

    /// Return the document to its pre-mutation baseline: restore every
    /// snapshot and strip `removed_class` everywhere. Text comes first, so
    /// elements a text edit detached are back in the tree when their own
    /// style snapshots are restored.
    pub fn clear_all(&mut self, doc: &mut Document, removed_class: &str) -> Result<()> {
        let mut nodes: Vec<NodeId> = self.entries.keys().copied().collect();
        nodes.sort();

        for kind in [SnapshotKind::Text, SnapshotKind::Style] {
            for &node in &nodes {
                self.restore(doc, node, kind)?;
            }
        }
        self.entries.clear();

        let dropped = nodes.iter().filter(|&&n| !doc.is_connected(n)).count();
        if dropped > 0 {
            log::debug!("Dropped {} snapshot(s) of detached elements", dropped);
        }

        for node in doc.all_elements() {
            if let Some(element) = doc.element_mut(node) {
                element.remove_class(removed_class);
            }
        }
        Ok(())
    }
}
