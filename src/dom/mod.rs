//! Live document model
//!
//! This module provides the mutable document rules are applied to. It includes:
//! - Document: Arena of nodes with stable [`NodeId`] handles, HTML parsing and serialization
//! - ElementNode: Tag name and ordered attributes of one element
//! - InlineStyle / StyleProperty: Typed access to the `style` attribute

pub mod document;
pub mod element;
pub mod style;

pub use document::{Document, NodeData, NodeId};
pub use element::ElementNode;
pub use style::{InlineStyle, StyleProperty};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_export() {
        let element = ElementNode::new("div");
        assert_eq!(element.tag_name, "div");
    }

    #[test]
    fn test_document_export() {
        let doc = Document::parse("<p id=x></p>");
        assert!(doc.get_element_by_id("x").is_some());
    }

    #[test]
    fn test_style_export() {
        assert_eq!(StyleProperty::parse("color"), StyleProperty::Color);
        assert!(InlineStyle::default().is_empty());
    }
}
