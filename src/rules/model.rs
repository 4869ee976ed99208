use crate::dom::StyleProperty;
use crate::error::{Result, ZapError};
use crate::selector::{SelectorList, escape_selector};
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored rule, unique within a hostname partition.
///
/// New ids are `"<unix-millis>-<random hex>"`. Older records stored numeric
/// ids; those are read back as their decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRuleId", into = "String")]
pub struct RuleId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRuleId {
    Number(serde_json::Number),
    Text(String),
}

impl From<RawRuleId> for RuleId {
    fn from(raw: RawRuleId) -> Self {
        match raw {
            RawRuleId::Number(n) => RuleId(n.to_string()),
            RawRuleId::Text(s) => RuleId(s),
        }
    }
}

impl From<RuleId> for String {
    fn from(id: RuleId) -> Self {
        id.0
    }
}

impl RuleId {
    /// Fresh id from the current time and a random suffix
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        RuleId(format!("{}-{:08x}", millis, rand::random::<u32>()))
    }

    pub fn new(id: impl Into<String>) -> Self {
        RuleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The mutation a rule performs, tagged by `action` in stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RuleAction {
    /// Hide matched elements with the removed-marker class
    Remove {},

    /// Overwrite inline style properties
    Style {
        #[serde(default)]
        styles: IndexMap<StyleProperty, String>,
    },

    /// Replace the inner markup
    EditText {
        /// Markup at the time the rule was authored
        #[serde(rename = "originalText", default)]
        original_text: String,
        #[serde(rename = "newText", default)]
        new_text: String,
    },
}

impl RuleAction {
    /// The stored `action` tag
    pub fn name(&self) -> &'static str {
        match self {
            RuleAction::Remove {} => "remove",
            RuleAction::Style { .. } => "style",
            RuleAction::EditText { .. } => "editText",
        }
    }

    /// Human-readable label for rule listings
    pub fn label(&self) -> &'static str {
        match self {
            RuleAction::Remove {} => "Element removed",
            RuleAction::Style { .. } => "Style changed",
            RuleAction::EditText { .. } => "Text edited",
        }
    }
}

/// A rule as produced by the picking UI, before the coordinator stamps it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub selector: String,

    #[serde(flatten)]
    pub action: RuleAction,
}

impl RuleDraft {
    pub fn remove(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            action: RuleAction::Remove {},
        }
    }

    pub fn style(selector: impl Into<String>, styles: IndexMap<StyleProperty, String>) -> Self {
        Self {
            selector: selector.into(),
            action: RuleAction::Style { styles },
        }
    }

    pub fn edit_text(
        selector: impl Into<String>,
        original_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            action: RuleAction::EditText {
                original_text: original_text.into(),
                new_text: new_text.into(),
            },
        }
    }

    /// Run the selector through validate/escape; fails when even the escaped
    /// form cannot be queried
    pub fn normalized(mut self) -> Result<Self> {
        let safe = escape_selector(&self.selector);
        SelectorList::parse(&safe)
            .map_err(|err| match err {
                ZapError::InvalidSelector { reason, .. } => {
                    ZapError::invalid_selector(self.selector.clone(), reason)
                }
                other => other,
            })?;
        self.selector = safe;
        Ok(self)
    }

    /// Turn the draft into a stored rule authored on `url`
    pub fn stamp(self, url: impl Into<String>) -> Rule {
        Rule {
            id: RuleId::generate(),
            selector: self.selector,
            action: self.action,
            created: Utc::now(),
            url: url.into(),
        }
    }
}

/// A persisted mutation bound to a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,

    pub selector: String,

    #[serde(flatten)]
    pub action: RuleAction,

    /// When the rule was saved
    pub created: DateTime<Utc>,

    /// Page the rule was authored on (informational; matching is by hostname)
    #[serde(default)]
    pub url: String,
}

impl Rule {
    pub fn draft(&self) -> RuleDraft {
        RuleDraft {
            selector: self.selector.clone(),
            action: self.action.clone(),
        }
    }

    /// One listing line: id, action label, shortened selector and creation
    /// time relative to `now`
    pub fn summary<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        format!(
            "{}  {:<15}  {:<43}  {}",
            self.id,
            self.action.label(),
            shorten_selector(&self.selector),
            format_created(&self.created, now)
        )
    }
}

const SELECTOR_DISPLAY_CHARS: usize = 40;

/// Cut long selectors to 40 characters plus an ellipsis
pub fn shorten_selector(selector: &str) -> String {
    match selector.char_indices().nth(SELECTOR_DISPLAY_CHARS) {
        Some((cut, _)) => format!("{}...", &selector[..cut]),
        None => selector.to_string(),
    }
}

/// `Today at 02:05:09 PM`, `Yesterday at ...` or `04/05/2024 at ...`, in
/// the time zone of `now`
pub fn format_created<Tz: TimeZone>(created: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let local = created.with_timezone(&now.timezone());
    let time = local.format("%I:%M:%S %p");
    let day = local.date_naive();
    let today = now.date_naive();

    if day == today {
        format!("Today at {}", time)
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday at {}", time)
    } else {
        format!("{} at {}", local.format("%m/%d/%Y"), time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RuleId::generate();
        let b = RuleId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().contains('-'));
    }

    #[test]
    fn test_legacy_numeric_id() {
        let id: RuleId = serde_json::from_value(json!(1712345678901.5)).unwrap();
        assert_eq!(id.as_str(), "1712345678901.5");
        assert_eq!(serde_json::to_value(&id).unwrap(), json!("1712345678901.5"));
    }

    #[test]
    fn test_deserialize_stored_remove_rule() {
        let rule: Rule = serde_json::from_value(json!({
            "selector": "#ad-123",
            "action": "remove",
            "styles": {},
            "id": 1712345678901.25,
            "created": "2024-04-05T19:34:38.901Z",
            "url": "https://example.com/news"
        }))
        .unwrap();

        assert_eq!(rule.action, RuleAction::Remove {});
        assert_eq!(rule.selector, "#ad-123");
        assert_eq!(rule.id.as_str(), "1712345678901.25");
    }

    #[test]
    fn test_style_rule_shape() {
        let mut styles = IndexMap::new();
        styles.insert(StyleProperty::BackgroundColor, "#000".to_string());
        let rule = RuleDraft::style(".ad-banner", styles).stamp("https://example.com/");

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["action"], "style");
        assert_eq!(value["styles"], json!({"backgroundColor": "#000"}));
        assert_eq!(value["selector"], ".ad-banner");

        let back: Rule = serde_json::from_value(value).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_edit_text_rule_shape() {
        let draft = RuleDraft::edit_text("h1", "Old <b>title</b>", "New");
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            json!({
                "selector": "h1",
                "action": "editText",
                "originalText": "Old <b>title</b>",
                "newText": "New"
            })
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = serde_json::from_value::<RuleDraft>(json!({"selector": "p", "action": "explode"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_escapes_selector() {
        let draft = RuleDraft::remove(".bg-[#fff]:hover").normalized().unwrap();
        assert_eq!(draft.selector, r".bg-\[\#fff\]\:hover");

        let draft = RuleDraft::remove("#ad-123").normalized().unwrap();
        assert_eq!(draft.selector, "#ad-123");
    }

    #[test]
    fn test_shorten_selector() {
        assert_eq!(shorten_selector("#ad-123"), "#ad-123");

        let long = "body > main#content > section:nth-of-type(2) > ul > li";
        let short = shorten_selector(long);
        assert_eq!(short, format!("{}...", &long[..40]));
        assert_eq!(shorten_selector(&long[..40]), &long[..40]);
    }

    #[test]
    fn test_format_created_relative_days() {
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 18, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 4, 5, 14, 5, 9).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 4, 4, 9, 30, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap();

        assert_eq!(format_created(&today, &now), "Today at 02:05:09 PM");
        assert_eq!(format_created(&yesterday, &now), "Yesterday at 09:30:00 AM");
        assert_eq!(format_created(&older, &now), "03/01/2024 at 11:59:59 PM");
    }

    #[test]
    fn test_summary_line() {
        let mut rule = RuleDraft::remove("#ad-123").stamp("https://example.com/");
        rule.id = RuleId::new("1712345678901-ab12");
        rule.created = Utc.with_ymd_and_hms(2024, 4, 5, 14, 5, 9).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 4, 5, 18, 0, 0).unwrap();

        let line = rule.summary(&now);
        assert!(line.starts_with("1712345678901-ab12  Element removed  #ad-123"));
        assert!(line.ends_with("Today at 02:05:09 PM"));
    }

    #[test]
    fn test_normalized_rejects_garbage() {
        let err = RuleDraft::remove("div >").normalized().unwrap_err();
        assert!(matches!(err, ZapError::InvalidSelector { .. }));
    }
}
