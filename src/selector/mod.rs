//! Selector codec: parsing, matching, escaping and synthesis of the CSS
//! selectors rules are keyed by.

pub mod element;
pub mod escape;
pub mod list;
pub mod synthesize;

pub use element::ElementHandle;
pub use escape::{compile, css_escape, escape_selector, unescape};
pub use list::{SelectorList, is_valid};
pub use synthesize::{SYSTEM_PREFIX, synthesize, synthesize_verified, synthesize_with_prefix};
