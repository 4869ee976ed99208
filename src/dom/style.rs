use serde::{Deserialize, Serialize};
use std::fmt;

/// A CSS property a `style` rule can set.
///
/// The six properties offered by the style editor are named variants; any
/// other property is carried as `Custom` holding its CSS (kebab-case) name.
/// Rules serialize properties by their script name (`backgroundColor`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StyleProperty {
    BackgroundColor,
    Color,
    FontSize,
    Border,
    Padding,
    Margin,
    Custom(String),
}

impl StyleProperty {
    /// Properties exposed by the style editing form
    pub const EDITABLE: [StyleProperty; 6] = [
        StyleProperty::BackgroundColor,
        StyleProperty::Color,
        StyleProperty::FontSize,
        StyleProperty::Border,
        StyleProperty::Padding,
        StyleProperty::Margin,
    ];

    /// Parse either a script name (`fontSize`) or a CSS name (`font-size`)
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        let css = if name.starts_with("--") {
            name.to_string()
        } else if name.contains('-') {
            name.to_ascii_lowercase()
        } else {
            camel_to_kebab(name)
        };
        match css.as_str() {
            "background-color" => StyleProperty::BackgroundColor,
            "color" => StyleProperty::Color,
            "font-size" => StyleProperty::FontSize,
            "border" => StyleProperty::Border,
            "padding" => StyleProperty::Padding,
            "margin" => StyleProperty::Margin,
            _ => StyleProperty::Custom(css),
        }
    }

    /// Name used in inline `style` declarations
    pub fn css_name(&self) -> &str {
        match self {
            StyleProperty::BackgroundColor => "background-color",
            StyleProperty::Color => "color",
            StyleProperty::FontSize => "font-size",
            StyleProperty::Border => "border",
            StyleProperty::Padding => "padding",
            StyleProperty::Margin => "margin",
            StyleProperty::Custom(name) => name,
        }
    }

    /// Name used in stored rules (`element.style[name]`)
    pub fn script_name(&self) -> String {
        match self {
            StyleProperty::BackgroundColor => "backgroundColor".to_string(),
            StyleProperty::Color => "color".to_string(),
            StyleProperty::FontSize => "fontSize".to_string(),
            StyleProperty::Border => "border".to_string(),
            StyleProperty::Padding => "padding".to_string(),
            StyleProperty::Margin => "margin".to_string(),
            StyleProperty::Custom(name) if name.starts_with("--") => name.clone(),
            StyleProperty::Custom(name) => kebab_to_camel(name),
        }
    }
}

impl From<String> for StyleProperty {
    fn from(name: String) -> Self {
        StyleProperty::parse(&name)
    }
}

impl From<&str> for StyleProperty {
    fn from(name: &str) -> Self {
        StyleProperty::parse(name)
    }
}

impl From<StyleProperty> for String {
    fn from(property: StyleProperty) -> Self {
        property.script_name()
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

// "backgroundColor" -> "background-color", "WebkitTransform" -> "-webkit-transform"
fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// "border-radius" -> "borderRadius", "-webkit-transform" -> "WebkitTransform"
fn kebab_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Ordered inline declarations of an element's `style` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    // input: "color: red; font-size: 12px;"
    pub fn parse(input: &str) -> Self {
        let declarations = input
            .split(';')
            .filter_map(|pair| {
                let (n, v) = pair.split_once(':')?;
                let n = n.trim();
                if n.is_empty() {
                    return None;
                }
                let name = if n.starts_with("--") {
                    n.to_string()
                } else {
                    n.to_ascii_lowercase()
                };
                let value = v.trim().to_string();
                if value.is_empty() {
                    return None;
                }
                Some((name, value))
            })
            .collect();
        Self { declarations }
    }

    /// Inline value, `""` when the property is not set
    pub fn get(&self, property: &StyleProperty) -> &str {
        let name = property.css_name();
        self.declarations
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Set a declaration in place; an empty value removes it
    pub fn set(&mut self, property: &StyleProperty, value: &str) {
        let name = property.css_name();
        let value = value.trim();
        if value.is_empty() {
            self.declarations.retain(|(n, _)| n != name);
            return;
        }
        match self.declarations.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.declarations.push((name.to_string(), value.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_property_names() {
        assert_eq!(StyleProperty::parse("backgroundColor"), StyleProperty::BackgroundColor);
        assert_eq!(StyleProperty::parse("background-color"), StyleProperty::BackgroundColor);
        assert_eq!(StyleProperty::parse("fontSize"), StyleProperty::FontSize);
        assert_eq!(
            StyleProperty::parse("borderRadius"),
            StyleProperty::Custom("border-radius".to_string())
        );
        assert_eq!(
            StyleProperty::parse("--accent"),
            StyleProperty::Custom("--accent".to_string())
        );
    }

    #[test]
    fn test_script_names() {
        assert_eq!(StyleProperty::BackgroundColor.script_name(), "backgroundColor");
        assert_eq!(StyleProperty::parse("border-radius").script_name(), "borderRadius");
        assert_eq!(
            StyleProperty::parse("WebkitTransform").css_name(),
            "-webkit-transform"
        );
        assert_eq!(
            StyleProperty::parse("-webkit-transform").script_name(),
            "WebkitTransform"
        );
    }

    #[test]
    fn test_property_serde_as_map_key() {
        let mut map = indexmap::IndexMap::new();
        map.insert(StyleProperty::BackgroundColor, "#ffcc00".to_string());
        map.insert(StyleProperty::parse("line-height"), "2".to_string());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r##"{"backgroundColor":"#ffcc00","lineHeight":"2"}"##);

        let back: indexmap::IndexMap<StyleProperty, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_inline_style_parse_and_get() {
        let style = InlineStyle::parse("Color: red;; font-size:12px; bogus; margin:");
        assert_eq!(style.len(), 2);
        assert_eq!(style.get(&StyleProperty::Color), "red");
        assert_eq!(style.get(&StyleProperty::FontSize), "12px");
        assert_eq!(style.get(&StyleProperty::Margin), "");
    }

    #[test]
    fn test_inline_style_set_preserves_order() {
        let mut style = InlineStyle::parse("color: red; padding: 1px");
        style.set(&StyleProperty::Color, "blue");
        style.set(&StyleProperty::Border, "1px solid #000");
        assert_eq!(
            style.to_string(),
            "color: blue; padding: 1px; border: 1px solid #000;"
        );

        style.set(&StyleProperty::Padding, "");
        assert_eq!(style.to_string(), "color: blue; border: 1px solid #000;");
    }
}
