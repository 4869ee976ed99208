use crate::dom::element::ElementNode;
use crate::error::{Result, ZapError};
use crate::selector::{SelectorList, compile};
use html5ever::serialize::{self as html_serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io;

/// Stable handle to a node of one [`Document`]. Handles are never reused,
/// so a handle to a detached node stays distinguishable from new nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementNode),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

pub(crate) const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// A live, mutable document stored as an arena of nodes
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `html > head + body` skeleton
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let html = doc.create_element(ElementNode::new("html"));
        let head = doc.create_element(ElementNode::new("head"));
        let body = doc.create_element(ElementNode::new("body"));
        doc.attach(doc.root(), html);
        doc.attach(html, head);
        doc.attach(html, body);
        doc
    }

    fn bare() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// Parse a full HTML document. HTML5 parsing never fails; malformed
    /// markup is repaired the way a browser would.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Self::bare();
        let root = doc.root();
        doc.import(&parsed, root, false);
        doc
    }

    /// Copy a scraper tree below `target`. Fragment parsing wraps content in
    /// an `<html>` element, which is skipped when `fragment` is set.
    fn import(&mut self, parsed: &Html, target: NodeId, fragment: bool) {
        let mut mapping = HashMap::new();
        for node in parsed.tree.root().descendants() {
            let Some(parent) = node.parent() else {
                mapping.insert(node.id(), target);
                continue;
            };
            let Some(&parent_id) = mapping.get(&parent.id()) else {
                continue;
            };

            let created = match node.value() {
                scraper::Node::Document | scraper::Node::Fragment => {
                    mapping.insert(node.id(), parent_id);
                    continue;
                }
                scraper::Node::Element(element)
                    if fragment && parent.parent().is_none() && element.name() == "html" =>
                {
                    mapping.insert(node.id(), parent_id);
                    continue;
                }
                scraper::Node::Element(element) => {
                    let mut el = ElementNode::new(element.name());
                    for (name, value) in element.attrs() {
                        el.set_attribute(name, value);
                    }
                    self.create_element(el)
                }
                scraper::Node::Text(text) => {
                    let text: &str = text;
                    self.create_text(text)
                }
                scraper::Node::Comment(comment) => {
                    let comment: &str = comment;
                    self.create_comment(comment)
                }
                scraper::Node::Doctype(doctype) if !fragment => {
                    self.push(NodeData::Doctype(doctype.name().to_string()))
                }
                _ => continue,
            };
            self.attach(parent_id, created);
            mapping.insert(node.id(), created);
        }
    }

    /// The document node itself
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, element: ElementNode) -> NodeId {
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return Err(ZapError::ElementNotFound(format!(
                "cannot append {} to {}",
                child, parent
            )));
        }
        if child == self.root() || self.is_inclusive_ancestor(child, parent) {
            return Err(ZapError::DomParseFailed(format!(
                "appending {} to {} would create a cycle",
                child, parent
            )));
        }
        if matches!(self.nodes[parent.0].data, NodeData::Text(_) | NodeData::Comment(_) | NodeData::Doctype(_)) {
            return Err(ZapError::DomParseFailed(format!("{} cannot have children", parent)));
        }
        self.detach(child);
        self.attach(parent, child);
        Ok(())
    }

    // caller guarantees both ids are valid and child is detached
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|n| n.parent) else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != id);
        self.nodes[id.0].parent = None;
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Is the node still reachable from the document root?
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some() && self.is_inclusive_ancestor(self.root(), id)
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.node(id).map(|n| &n.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        match self.data(id)? {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementNode> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.data)? {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Like [`element`](Self::element), but an error for non-elements
    pub fn require_element(&self, id: NodeId) -> Result<&ElementNode> {
        self.element(id)
            .ok_or_else(|| ZapError::ElementNotFound(format!("{} is not an element", id)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Parent if it is an element (the document node is not)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Element siblings of `id` including itself, in document order
    pub fn element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self.element_children(parent),
            None => vec![id],
        }
    }

    /// Descendant elements of `id` in document order, excluding `id`
    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if self.is_element(current) {
                out.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Every connected element in document order
    pub fn all_elements(&self) -> Vec<NodeId> {
        self.descendant_elements(self.root())
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.is_element(c))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings[..index].iter().rev().copied().find(|&c| self.is_element(c))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings[index + 1..].iter().copied().find(|&c| self.is_element(c))
    }

    /// The `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_element_child(self.root())
    }

    fn child_named(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some_and(|el| el.is_tag(tag)))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_named(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_named(self.document_element()?, "body")
    }

    /// First element (document order) whose id attribute equals `id`
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.all_elements()
            .into_iter()
            .find(|&n| self.element(n).and_then(|el| el.id()) == Some(id))
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            match self.data(child) {
                Some(NodeData::Text(text)) => out.push_str(text),
                Some(NodeData::Element(_)) => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// Every element matching `selector` (after validate/escape)
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let compiled = compile(selector)?;
        Ok(self.select(&compiled))
    }

    /// First element matching `selector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Every connected element matching a compiled selector, in document order
    pub fn select(&self, selector: &SelectorList) -> Vec<NodeId> {
        selector.select(self)
    }

    /// Serialized markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let parent = self.element(id).map(|el| html_name(&el.tag_name));
        self.serialize_to_string(id, TraversalScope::ChildrenOnly(parent))
    }

    /// Serialized markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        self.serialize_to_string(id, TraversalScope::IncludeNode)
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    fn serialize_to_string(&self, id: NodeId, traversal_scope: TraversalScope) -> String {
        let opts = SerializeOpts {
            traversal_scope,
            ..Default::default()
        };
        let mut buf = Vec::new();
        if let Err(err) = html5ever::serialize(&mut buf, &Subtree { doc: self, id }, opts) {
            log::warn!("Serializing {} failed: {}", id, err);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Replace the children of `id` with `markup`, parsed the way `innerHTML`
    /// is: with `id` as the context element, so `<td>` survives inside a
    /// `<tr>` and `<option>` inside a `<select>`. Returns the previous
    /// children, detached but intact.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<Vec<NodeId>> {
        let context = html_name(&self.require_element(id)?.tag_name);
        let old = self.take_children(id);
        let parsed = html5ever::parse_fragment(
            Html::new_fragment(),
            ParseOpts::default(),
            context,
            Vec::new(),
        )
        .one(markup);
        self.import(&parsed, id, true);
        Ok(old)
    }

    /// Detach every child of `id` and return them in order
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let old: Vec<NodeId> = self.children(id).to_vec();
        for &child in &old {
            self.detach(child);
        }
        old
    }

    /// Swap the children of `id` for `children`, which are moved from
    /// wherever they currently are. Returns the children that were replaced.
    pub fn replace_children(&mut self, id: NodeId, children: &[NodeId]) -> Result<Vec<NodeId>> {
        self.require_element(id)?;
        let old = self.take_children(id);
        for &child in children {
            self.append_child(id, child)?;
        }
        Ok(old)
    }

    fn serialize_node<S: Serializer>(&self, id: NodeId, serializer: &mut S) -> io::Result<()> {
        match self.data(id) {
            Some(NodeData::Document) => self.serialize_children(id, serializer),
            Some(NodeData::Doctype(name)) => serializer.write_doctype(name),
            Some(NodeData::Text(text)) => serializer.write_text(text),
            Some(NodeData::Comment(text)) => serializer.write_comment(text),
            Some(NodeData::Element(el)) => {
                let name = html_name(&el.tag_name);
                let attrs: Vec<(QualName, &str)> = el
                    .attributes
                    .iter()
                    .map(|(key, value)| (attribute_name(key), value.as_str()))
                    .collect();
                serializer.start_elem(name.clone(), attrs.iter().map(|(key, value)| (key, *value)))?;
                self.serialize_children(id, serializer)?;
                serializer.end_elem(name)
            }
            None => Ok(()),
        }
    }

    fn serialize_children<S: Serializer>(&self, id: NodeId, serializer: &mut S) -> io::Result<()> {
        for &child in self.children(id) {
            self.serialize_node(child, serializer)?;
        }
        Ok(())
    }
}

/// A node and its descendants, as seen by the html5ever serializer
struct Subtree<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl html_serialize::Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        match traversal_scope {
            TraversalScope::IncludeNode => self.doc.serialize_node(self.id, serializer),
            TraversalScope::ChildrenOnly(_) => self.doc.serialize_children(self.id, serializer),
        }
    }
}

fn html_name(tag: &str) -> QualName {
    QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag))
}

fn attribute_name(key: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(key))
}
