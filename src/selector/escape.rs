//! Validate/escape tier for stored selectors.
//!
//! A selector is used verbatim when it parses. Otherwise each class segment
//! is escaped independently so that combinators, `#id` parts and already
//! escaped characters survive; only when no class segment exists are bare
//! colons escaped across the whole string.

use crate::error::{Result, ZapError};
use crate::selector::list::{SelectorList, is_valid};
use std::fmt::Write;

/// The CSSOM `CSS.escape()` algorithm
pub fn css_escape(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 8);
    for (index, &c) in chars.iter().enumerate() {
        match c {
            '\0' => out.push('\u{FFFD}'),
            '\u{1}'..='\u{1F}' | '\u{7F}' => {
                let _ = write!(out, "\\{:x} ", c as u32);
            }
            '0'..='9' if index == 0 || (index == 1 && chars[0] == '-') => {
                let _ = write!(out, "\\{:x} ", c as u32);
            }
            '-' if index == 0 && chars.len() == 1 => out.push_str("\\-"),
            c if !c.is_ascii() || c == '-' || c == '_' || c.is_ascii_alphanumeric() => out.push(c),
            c => {
                out.push('\\');
                out.push(c);
            }
        }
    }
    out
}

/// Resolve CSS escapes (`\:`, `\31 `) back to the characters they denote
pub fn unescape(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        i += 1;
        if !chars[i].is_ascii_hexdigit() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && i - start < 6 && chars[i].is_ascii_hexdigit() {
            i += 1;
        }
        let hex: String = chars[start..i].iter().collect();
        if i < chars.len() && chars[i].is_ascii_whitespace() {
            i += 1;
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        out.push(match code {
            0 => '\u{FFFD}',
            _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
        });
    }
    out
}

/// Return `selector` unchanged when it parses, otherwise a reconstructed,
/// escaped version of it. The result is not guaranteed to parse; callers
/// that need a query go through [`compile`].
pub fn escape_selector(selector: &str) -> String {
    if is_valid(selector) {
        return selector.to_string();
    }

    let has_class_segment = selector
        .split(' ')
        .any(|group| split_class_segments(group).len() > 1);
    if has_class_segment {
        let rebuilt: Vec<String> = selector.split(' ').map(escape_compound_group).collect();
        let rebuilt = rebuilt.join(" ");
        log::debug!("Escaped class segments: '{}' -> '{}'", selector, rebuilt);
        return rebuilt;
    }

    escape_bare_colons(selector)
}

/// Validate/escape `selector` and parse the result
pub fn compile(selector: &str) -> Result<SelectorList> {
    let safe = escape_selector(selector);
    SelectorList::parse(&safe).map_err(|err| match err {
        ZapError::InvalidSelector { reason, .. } => ZapError::invalid_selector(selector, reason),
        other => other,
    })
}

// "div.hover:x.w-[1.5rem]" -> "div.hover\:x.w-\[1\.5rem\]"
fn escape_compound_group(group: &str) -> String {
    let segments = split_class_segments(group);
    if segments.len() < 2 {
        return group.to_string();
    }
    let mut out = segments[0].to_string();
    for class in &segments[1..] {
        out.push('.');
        if class.is_empty() {
            continue;
        }
        out.push_str(&css_escape(&unescape(class)));
    }
    out
}

/// Split on `.` outside escapes, brackets, parentheses and quotes
fn split_class_segments(group: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = group.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' | '\'' if quote.is_none() => quote = Some(c),
            c if Some(c) == quote => quote = None,
            _ if quote.is_some() => {}
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                segments.push(&group[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&group[start..]);
    segments
}

// "#ad:123" -> "#ad\:123"; already escaped colons are left alone
fn escape_bare_colons(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len() + 4);
    let mut chars = selector.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            ':' => out.push_str("\\:"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_escape() {
        assert_eq!(css_escape("ad-banner"), "ad-banner");
        assert_eq!(css_escape("hover:bg-red"), r"hover\:bg-red");
        assert_eq!(css_escape("bg-[#fff]"), r"bg-\[\#fff\]");
        assert_eq!(css_escape("w-1/2"), r"w-1\/2");
        assert_eq!(css_escape("123"), r"\31 23");
        assert_eq!(css_escape("-1a"), r"-\31 a");
        assert_eq!(css_escape("-"), r"\-");
        assert_eq!(css_escape("héllo"), "héllo");
        assert_eq!(css_escape("a\u{1}b"), r"a\1 b");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"hover\:bg-red"), "hover:bg-red");
        assert_eq!(unescape(r"\31 23"), "123");
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape(&css_escape("bg-[#fff]:hover")), "bg-[#fff]:hover");
    }

    #[test]
    fn test_valid_selector_is_untouched() {
        for selector in ["#ad-123", "div.ad-banner", "body > div:nth-of-type(2) > p", r".hover\:x"] {
            assert_eq!(escape_selector(selector), selector);
        }
    }

    #[test]
    fn test_escape_utility_classes() {
        assert_eq!(escape_selector(".bg-[#fff]:hover"), r".bg-\[\#fff\]\:hover");
        assert_eq!(escape_selector("div.md:flex.p-4"), r"div.md\:flex.p-4");
        assert_eq!(escape_selector(".w-[1.5rem]"), r".w-\[1\.5rem\]");
        assert_eq!(escape_selector(".w-1/2 > span"), r".w-1\/2 > span");
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        assert_eq!(
            escape_selector(r"div.hover\:x.sm:block"),
            r"div.hover\:x.sm\:block"
        );
    }

    #[test]
    fn test_escape_bare_colons_without_classes() {
        assert_eq!(escape_selector("#ad:123"), r"#ad\:123");
        assert_eq!(escape_selector(r"#a\:b:c"), r"#a\:b\:c");
    }

    #[test]
    fn test_compile_resolves_escaped_selectors() {
        assert!(compile(".bg-[#fff]:hover").is_ok());
        assert!(compile("#ad:123").is_ok());
        assert!(compile("div > li:nth-of-type(3)").is_ok());
    }

    #[test]
    fn test_compile_reports_original_selector() {
        let err = compile("div >").unwrap_err();
        match err {
            ZapError::InvalidSelector { selector, .. } => assert_eq!(selector, "div >"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
