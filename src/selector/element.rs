//! [`selectors::Element`] over the arena document.

use crate::dom::document::HTML_NAMESPACE;
use crate::dom::{Document, NodeData, NodeId};
use html5ever::Namespace;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::{Element, OpaqueElement, matching};
use std::fmt;

/// An element of a [`Document`], borrowed for matching
#[derive(Clone, Copy)]
pub struct ElementHandle<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementHandle<'a> {
    /// `None` unless `id` is an element of `doc`
    pub fn new(doc: &'a Document, id: NodeId) -> Option<Self> {
        doc.is_element(id).then_some(Self { doc, id })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    fn wrap(&self, id: Option<NodeId>) -> Option<Self> {
        id.and_then(|id| Self::new(self.doc, id))
    }

    fn tag(&self) -> &str {
        self.doc
            .element(self.id)
            .map(|el| el.tag_name.as_str())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ElementHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementHandle({})", self.id)
    }
}

/// Dynamic pseudo-classes and pseudo-elements never match.
impl Element for ElementHandle<'_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        match self.doc.data(self.id) {
            Some(data) => OpaqueElement::new(data),
            None => OpaqueElement::new(self.doc),
        }
    }

    fn parent_element(&self) -> Option<Self> {
        self.wrap(self.doc.parent_element(self.id))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.tag() == other.tag()
    }

    fn imported_part(&self, _: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.wrap(self.doc.previous_element_sibling(self.id))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.wrap(self.doc.next_element_sibling(self.id))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.wrap(self.doc.first_element_child(self.id))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        &*name.0 == self.tag()
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        &**namespace == HTML_NAMESPACE
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if matches!(*ns, NamespaceConstraint::Specific(url) if !url.is_empty()) {
            return false;
        }
        self.doc
            .element(self.id)
            .and_then(|el| el.get_attribute(&local_name.0))
            .is_some_and(|value| operation.eval_str(value))
    }

    fn match_non_ts_pseudo_class(
        &self,
        _pc: &NonTSPseudoClass,
        _context: &mut matching::MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn match_pseudo_element(
        &self,
        _pe: &PseudoElement,
        _context: &mut matching::MatchingContext<'_, Self::Impl>,
    ) -> bool {
        false
    }

    fn is_link(&self) -> bool {
        matches!(self.tag(), "a" | "area" | "link")
            && self
                .doc
                .element(self.id)
                .is_some_and(|el| el.has_attribute("href"))
    }

    fn is_html_slot_element(&self) -> bool {
        self.tag() == "slot"
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        match self.doc.element(self.id).and_then(|el| el.id()) {
            Some(value) => case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()),
            None => false,
        }
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.doc.element(self.id).is_some_and(|el| {
            el.classes()
                .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
        })
    }

    fn is_empty(&self) -> bool {
        !self.doc.children(self.id).iter().any(|&child| {
            matches!(
                self.doc.data(child),
                Some(NodeData::Element(_)) | Some(NodeData::Text(_))
            )
        })
    }

    fn is_root(&self) -> bool {
        self.doc
            .parent(self.id)
            .is_some_and(|parent| matches!(self.doc.data(parent), Some(NodeData::Document)))
    }

    fn apply_selector_flags(&self, _flags: matching::ElementSelectorFlags) {}
}
