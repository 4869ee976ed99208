//! Messages exchanged between page agents, the coordinator and the popup.
//!
//! Every message is a JSON object tagged by its `action` field.

use crate::rules::{Rule, RuleDraft, RuleId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a browser tab hosting one page agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab {}", self.0)
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub tab: Option<TabId>,

    /// URL of the sending tab's page
    pub url: Option<String>,
}

impl Sender {
    /// A page agent running in `tab` on `url`
    pub fn tab(tab: TabId, url: impl Into<String>) -> Self {
        Self {
            tab: Some(tab),
            url: Some(url.into()),
        }
    }

    /// A context without a tab (popup, CLI)
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Requests answered by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Persist a rule for the sender's hostname
    SaveRule { rule: RuleDraft },

    /// Rules for `url`, or for the sender's page when absent
    GetRules {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    DeleteRule {
        #[serde(rename = "ruleId")]
        rule_id: RuleId,
    },

    GetEditMode,

    SetEditMode { enabled: bool },
}

impl Request {
    /// Every `action` tag a request may carry
    pub const ACTIONS: [&'static str; 5] = [
        "saveRule",
        "getRules",
        "deleteRule",
        "getEditMode",
        "setEditMode",
    ];

    pub fn action(&self) -> &'static str {
        match self {
            Request::SaveRule { .. } => "saveRule",
            Request::GetRules { .. } => "getRules",
            Request::DeleteRule { .. } => "deleteRule",
            Request::GetEditMode => "getEditMode",
            Request::SetEditMode { .. } => "setEditMode",
        }
    }

    /// Decode a raw message; unknown actions and malformed payloads are
    /// turned into the error response to send back
    pub fn from_value(message: Value) -> Result<Self, Response> {
        let known = message
            .get("action")
            .and_then(Value::as_str)
            .is_some_and(|action| Self::ACTIONS.contains(&action));
        if !known {
            return Err(Response::unrecognized());
        }
        serde_json::from_value(message).map_err(|e| Response::error(e.to_string()))
    }
}

/// Reply to a [`Request`], distinguished by its single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success {
        success: bool,
    },
    Rules {
        rules: Vec<Rule>,
    },
    EditMode {
        #[serde(rename = "editMode")]
        edit_mode: bool,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn ok() -> Self {
        Response::Success { success: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }

    pub fn unrecognized() -> Self {
        Response::error("Unrecognized action")
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Failed to encode response: {}", e) })
        })
    }
}

/// Notifications pushed into a page agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageMessage {
    /// Reset the page and apply exactly these rules
    ApplyRules { rules: Vec<Rule> },

    /// Undo one (deleted) rule
    #[serde(rename = "removeRuleFromDOM")]
    RemoveRuleFromDom { rule: Rule },

    ToggleEditMode { enabled: bool },

    /// Fetch the current rules from the coordinator and apply them
    ReapplyRules,
}

impl PageMessage {
    pub fn action(&self) -> &'static str {
        match self {
            PageMessage::ApplyRules { .. } => "applyRules",
            PageMessage::RemoveRuleFromDom { .. } => "removeRuleFromDOM",
            PageMessage::ToggleEditMode { .. } => "toggleEditMode",
            PageMessage::ReapplyRules => "reapplyRules",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = Request::from_value(json!({"action": "deleteRule", "ruleId": 1712345678901.5})).unwrap();
        assert_eq!(
            request,
            Request::DeleteRule {
                rule_id: RuleId::new("1712345678901.5")
            }
        );

        let request = Request::from_value(json!({"action": "getRules"})).unwrap();
        assert_eq!(request, Request::GetRules { url: None });
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"action": "getRules"}));

        let request = Request::from_value(json!({
            "action": "saveRule",
            "rule": {"selector": "#a", "action": "remove", "styles": {}}
        }))
        .unwrap();
        assert_eq!(request, Request::SaveRule { rule: RuleDraft::remove("#a") });
    }

    #[test]
    fn test_unknown_action() {
        assert_eq!(
            Request::from_value(json!({"action": "selfDestruct"})).unwrap_err(),
            Response::unrecognized()
        );
        assert_eq!(
            Request::from_value(json!({"noAction": true})).unwrap_err(),
            Response::unrecognized()
        );
    }

    #[test]
    fn test_malformed_payload_is_an_error_response() {
        let response = Request::from_value(json!({"action": "setEditMode"})).unwrap_err();
        assert!(response.is_error());
        assert_ne!(response, Response::unrecognized());
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(Response::ok().to_value(), json!({"success": true}));
        assert_eq!(
            Response::EditMode { edit_mode: true }.to_value(),
            json!({"editMode": true})
        );
        assert_eq!(
            Response::unrecognized().to_value(),
            json!({"error": "Unrecognized action"})
        );

        let back: Response = serde_json::from_value(json!({"rules": []})).unwrap();
        assert_eq!(back, Response::Rules { rules: vec![] });
        let back: Response = serde_json::from_value(json!({"editMode": false})).unwrap();
        assert_eq!(back, Response::EditMode { edit_mode: false });
    }

    #[test]
    fn test_page_message_tags() {
        let message = PageMessage::ReapplyRules;
        assert_eq!(serde_json::to_value(&message).unwrap(), json!({"action": "reapplyRules"}));

        let message: PageMessage =
            serde_json::from_value(json!({"action": "toggleEditMode", "enabled": true})).unwrap();
        assert_eq!(message, PageMessage::ToggleEditMode { enabled: true });
        assert_eq!(message.action(), "toggleEditMode");

        let rule = RuleDraft::remove("#a").stamp("https://example.com/");
        let value = serde_json::to_value(PageMessage::RemoveRuleFromDom { rule }).unwrap();
        assert_eq!(value["action"], "removeRuleFromDOM");
    }
}
