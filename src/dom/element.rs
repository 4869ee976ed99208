use crate::dom::style::{InlineStyle, StyleProperty};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a DOM element (tag plus attributes); children live in the
/// owning [`Document`](crate::dom::Document) arena.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// Lowercase HTML tag name (e.g., "div", "li", "button")
    pub tag_name: String,

    /// Element attributes in source order (id, class, style, ...)
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: add one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Set (or replace) a single attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Remove an attribute, preserving the order of the remaining ones
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.shift_remove(key)
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Get the non-empty element ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id").filter(|id| !id.is_empty())
    }

    /// Whitespace-separated class list
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attribute("class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    /// Check if element has a specific class
    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }

    /// Add a class; returns false when it was already present
    pub fn add_class(&mut self, class_name: &str) -> bool {
        if self.has_class(class_name) {
            return false;
        }
        let mut classes: Vec<&str> = self.classes().collect();
        classes.push(class_name);
        let joined = classes.join(" ");
        self.set_attribute("class", joined);
        true
    }

    /// Remove a class; returns false when it was not present.
    /// An emptied class attribute is dropped.
    pub fn remove_class(&mut self, class_name: &str) -> bool {
        if !self.has_class(class_name) {
            return false;
        }
        let remaining: Vec<&str> = self.classes().filter(|c| *c != class_name).collect();
        if remaining.is_empty() {
            self.remove_attribute("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attribute("class", joined);
        }
        true
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Parsed view of the `style` attribute
    pub fn inline_style(&self) -> InlineStyle {
        InlineStyle::parse(self.get_attribute("style").unwrap_or(""))
    }

    /// Current inline value of a property, `""` when unset
    pub fn style_value(&self, property: &StyleProperty) -> String {
        self.inline_style().get(property).to_string()
    }

    /// Set one inline property; an empty value removes the declaration
    pub fn set_style(&mut self, property: &StyleProperty, value: &str) {
        let mut style = self.inline_style();
        style.set(property, value);
        self.store_inline_style(&style);
    }

    /// Remove one inline property
    pub fn remove_style(&mut self, property: &StyleProperty) {
        self.set_style(property, "");
    }

    fn store_inline_style(&mut self, style: &InlineStyle) {
        if style.is_empty() {
            self.remove_attribute("style");
        } else {
            self.set_attribute("style", style.to_string());
        }
    }

    /// `tag#id.class1.class2`, as shown next to a highlighted element
    pub fn info_label(&self) -> String {
        let mut label = self.tag_name.clone();
        if let Some(id) = self.id() {
            label.push('#');
            label.push_str(id);
        }
        for class in self.classes() {
            label.push('.');
            label.push_str(class);
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_creation() {
        let element = ElementNode::new("BUTTON")
            .with_attribute("id", "test-id")
            .with_attribute("class", "btn primary");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.id(), Some("test-id"));
        assert!(element.is_tag("Button"));
    }

    #[test]
    fn test_empty_id_is_none() {
        let element = ElementNode::new("div").with_attribute("id", "");
        assert_eq!(element.id(), None);
    }

    #[test]
    fn test_has_class() {
        let element = ElementNode::new("div").with_attribute("class", "container  main\tactive");

        assert!(element.has_class("container"));
        assert!(element.has_class("main"));
        assert!(element.has_class("active"));
        assert!(!element.has_class("hidden"));
    }

    #[test]
    fn test_add_and_remove_class() {
        let mut element = ElementNode::new("div").with_attribute("class", "ad-banner");

        assert!(element.add_class("zapit-removed"));
        assert!(!element.add_class("zapit-removed"));
        assert_eq!(element.get_attribute("class"), Some("ad-banner zapit-removed"));

        assert!(element.remove_class("zapit-removed"));
        assert!(!element.remove_class("zapit-removed"));
        assert_eq!(element.get_attribute("class"), Some("ad-banner"));

        element.remove_class("ad-banner");
        assert!(!element.has_attribute("class"));
    }

    #[test]
    fn test_inline_style_roundtrip() {
        let mut element = ElementNode::new("p").with_attribute("style", "color: red");

        element.set_style(&StyleProperty::BackgroundColor, "#000");
        assert_eq!(element.style_value(&StyleProperty::BackgroundColor), "#000");
        assert_eq!(
            element.get_attribute("style"),
            Some("color: red; background-color: #000;")
        );

        element.remove_style(&StyleProperty::BackgroundColor);
        element.remove_style(&StyleProperty::Color);
        assert_eq!(element.style_value(&StyleProperty::Color), "");
        assert!(!element.has_attribute("style"));
    }

    #[test]
    fn test_info_label() {
        let element = ElementNode::new("div")
            .with_attribute("id", "main")
            .with_attribute("class", "a b");
        assert_eq!(element.info_label(), "div#main.a.b");
    }

    #[test]
    fn test_serialization() {
        let element = ElementNode::new("button").with_attribute("id", "go");

        let json = serde_json::to_string(&element).unwrap();
        let deserialized: ElementNode = serde_json::from_str(&json).unwrap();

        assert_eq!(element, deserialized);
    }
}
