//! Compiled selector lists, parsed and matched by the `selectors` crate.
//!
//! Parsing goes through scraper's selector dialect, which accepts every
//! tree-structural pseudo-class but rejects dynamic ones (`:hover`) and
//! pseudo-elements. A rejected selector is a [`ZapError::InvalidSelector`],
//! which is what lets the escape tier kick in for utility class names such
//! as `hover:bg-red` or `w-[1.5rem]`.

use crate::dom::{Document, NodeId};
use crate::error::{Result, ZapError};
use crate::selector::element::ElementHandle;
use cssparser::ParserInput;
use scraper::error::SelectorErrorKind;
use scraper::selector::{Parser, Simple};
use selectors::matching::{
    self, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode, NeedsSelectorFlags,
    QuirksMode,
};
use selectors::parser::ParseRelative;
use selectors::NthIndexCache;

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    inner: selectors::SelectorList<Simple>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser_input = ParserInput::new(input);
        let mut parser = cssparser::Parser::new(&mut parser_input);
        selectors::SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map(|inner| Self { inner })
            .map_err(|err| ZapError::invalid_selector(input, SelectorErrorKind::from(err).to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.0.is_empty()
    }

    /// Does any selector of the list match the element?
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_with_cache(doc, node, &mut NthIndexCache::default())
    }

    /// Every connected element of `doc` that matches, in document order.
    /// One nth-index cache is shared across the walk; the document is not
    /// mutated in between.
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        let mut cache = NthIndexCache::default();
        doc.all_elements()
            .into_iter()
            .filter(|&n| self.matches_with_cache(doc, n, &mut cache))
            .collect()
    }

    fn matches_with_cache(&self, doc: &Document, node: NodeId, cache: &mut NthIndexCache) -> bool {
        let Some(element) = ElementHandle::new(doc, node) else {
            return false;
        };
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );
        self.inner
            .0
            .iter()
            .any(|s| matching::matches_selector(s, 0, None, &element, &mut context))
    }
}

/// `true` when the selector is accepted as-is
pub fn is_valid(input: &str) -> bool {
    SelectorList::parse(input).is_ok()
}
