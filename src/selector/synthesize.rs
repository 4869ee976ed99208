use crate::dom::{Document, NodeId};
use crate::error::{Result, ZapError};
use crate::selector::escape::css_escape;

/// Class prefix of the elements and markers this crate injects into pages
pub const SYSTEM_PREFIX: &str = "zapit-";

/// Derive a re-playable selector for `node`, ignoring `zapit-` classes
pub fn synthesize(doc: &Document, node: NodeId) -> Result<String> {
    synthesize_with_prefix(doc, node, SYSTEM_PREFIX)
}

/// Derive a re-playable selector for `node`.
///
/// The first strategy that applies wins:
/// 1. `#id` when the element has a non-empty id
/// 2. `tag.class1.class2` from the classes not starting with `ignored_prefix`
/// 3. a `" > "` joined path of tags up to (not including) `<body>`, anchored
///    at the nearest ancestor with an id and disambiguated among same-tag
///    siblings with `:nth-of-type(n)`
pub fn synthesize_with_prefix(doc: &Document, node: NodeId, ignored_prefix: &str) -> Result<String> {
    let element = doc.require_element(node)?;

    if let Some(id) = element.id() {
        return Ok(format!("#{}", css_escape(id)));
    }

    let classes: Vec<String> = element
        .classes()
        .filter(|class| ignored_prefix.is_empty() || !class.starts_with(ignored_prefix))
        .map(css_escape)
        .collect();
    if !classes.is_empty() {
        return Ok(format!("{}.{}", element.tag_name, classes.join(".")));
    }

    let path = ancestor_path(doc, node);
    if path.is_empty() {
        // <body> itself
        return Ok(element.tag_name.clone());
    }
    let selector = path.join(" > ");
    log::debug!("Synthesized path selector for {}: {}", node, selector);
    Ok(selector)
}

fn ancestor_path(doc: &Document, node: NodeId) -> Vec<String> {
    let body = doc.body();
    let mut path = Vec::new();
    let mut current = Some(node);

    while let Some(id) = current {
        if Some(id) == body {
            break;
        }
        let Some(element) = doc.element(id) else {
            break;
        };

        let mut step = element.tag_name.clone();
        if let Some(anchor) = element.id() {
            step.push('#');
            step.push_str(&css_escape(anchor));
            path.push(step);
            break;
        }

        let same_tag: Vec<NodeId> = doc
            .element_siblings(id)
            .into_iter()
            .filter(|&s| doc.element(s).is_some_and(|el| el.tag_name == element.tag_name))
            .collect();
        if same_tag.len() > 1 {
            if let Some(position) = same_tag.iter().position(|&s| s == id) {
                step.push_str(&format!(":nth-of-type({})", position + 1));
            }
        }
        path.push(step);
        current = doc.parent_element(id);
    }

    path.reverse();
    path
}

/// Synthesize and check that the selector re-locates `node`
pub fn synthesize_verified(doc: &Document, node: NodeId) -> Result<String> {
    let selector = synthesize(doc, node)?;
    if doc.query_selector_all(&selector)?.contains(&node) {
        Ok(selector)
    } else {
        Err(ZapError::ElementNotFound(format!(
            "synthesized selector '{}' does not match {}",
            selector, node
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_by_id(doc: &Document, id: &str) -> NodeId {
        doc.get_element_by_id(id).unwrap()
    }

    #[test]
    fn test_id_wins() {
        let doc = Document::parse(r#"<div id="ad-123" class="ad-banner"></div>"#);
        let node = find_by_id(&doc, "ad-123");
        assert_eq!(synthesize(&doc, node).unwrap(), "#ad-123");
    }

    #[test]
    fn test_id_with_colons_is_escaped() {
        let doc = Document::parse(r#"<div id=":r1:"></div>"#);
        let node = find_by_id(&doc, ":r1:");
        let selector = synthesize(&doc, node).unwrap();
        assert_eq!(selector, r"#\:r1\:");
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![node]);
    }

    #[test]
    fn test_classes_without_system_prefix() {
        let doc = Document::parse(
            r#"<section><p class="note hover:text-red zapit-element-highlight">x</p></section>"#,
        );
        let node = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(synthesize(&doc, node).unwrap(), r"p.note.hover\:text-red");
    }

    #[test]
    fn test_only_system_classes_fall_through_to_path() {
        let doc = Document::parse(r#"<main><p class="zapit-removed">x</p></main>"#);
        let node = doc.query_selector("p").unwrap().unwrap();
        assert_eq!(synthesize(&doc, node).unwrap(), "main > p");
    }

    #[test]
    fn test_nth_of_type_among_same_tag_siblings() {
        let doc = Document::parse("<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul>");
        let items = doc.query_selector_all("li").unwrap();
        let selector = synthesize(&doc, items[2]).unwrap();
        assert_eq!(selector, "ul > li:nth-of-type(3)");
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![items[2]]);
    }

    #[test]
    fn test_path_anchors_at_ancestor_id() {
        let doc = Document::parse(
            r#"<div id="wrap"><div><span>a</span><em>b</em><span>c</span></div><div></div></div>"#,
        );
        let spans = doc.query_selector_all("span").unwrap();
        let selector = synthesize(&doc, spans[1]).unwrap();
        assert_eq!(selector, "div#wrap > div:nth-of-type(1) > span:nth-of-type(2)");
        assert_eq!(doc.query_selector_all(&selector).unwrap(), vec![spans[1]]);
    }

    #[test]
    fn test_body_and_html() {
        let doc = Document::parse("<p>x</p>");
        assert_eq!(synthesize(&doc, doc.body().unwrap()).unwrap(), "body");
        assert_eq!(synthesize(&doc, doc.document_element().unwrap()).unwrap(), "html");
    }

    #[test]
    fn test_non_element_is_an_error() {
        let doc = Document::parse("<p>x</p>");
        let p = doc.query_selector("p").unwrap().unwrap();
        let text = doc.children(p)[0];
        assert!(synthesize(&doc, text).is_err());
    }

    #[test]
    fn test_synthesize_verified() {
        let doc = Document::parse(r#"<div><b class="x">1</b></div>"#);
        let b = doc.query_selector("b").unwrap().unwrap();
        assert_eq!(synthesize_verified(&doc, b).unwrap(), "b.x");
    }
}
