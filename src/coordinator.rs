use crate::error::{Result, ZapError};
use crate::messaging::{Request, Response, Sender};
use crate::rules::{
    KeyValueStore, RuleDraft, RuleId, RuleRepository, SettingsRepository, StoredRuleRepository,
    hostname_of,
};
use serde_json::Value;
use std::sync::Arc;

/// Extension-wide request handler owning rule storage and settings
#[derive(Clone)]
pub struct Coordinator {
    rules: Arc<dyn RuleRepository>,
    settings: Arc<dyn SettingsRepository>,
}

impl Coordinator {
    /// Coordinator over one stored repository serving both rules and settings
    pub fn new<S: KeyValueStore + 'static>(repository: StoredRuleRepository<S>) -> Self {
        let repository = Arc::new(repository);
        Self {
            rules: repository.clone(),
            settings: repository,
        }
    }

    pub fn with_repositories(
        rules: Arc<dyn RuleRepository>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self { rules, settings }
    }

    pub fn rules(&self) -> &Arc<dyn RuleRepository> {
        &self.rules
    }

    pub fn settings(&self) -> &Arc<dyn SettingsRepository> {
        &self.settings
    }

    /// Answer a request; failures become `{error}` responses
    pub async fn handle(&self, request: Request, sender: &Sender) -> Response {
        let action = request.action();
        match self.dispatch(request, sender).await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Error in {}: {}", action, e);
                Response::error(e.to_string())
            }
        }
    }

    /// Answer a raw JSON message
    pub async fn handle_value(&self, message: Value, sender: &Sender) -> Value {
        let response = match Request::from_value(message) {
            Ok(request) => self.handle(request, sender).await,
            Err(response) => response,
        };
        response.to_value()
    }

    async fn dispatch(&self, request: Request, sender: &Sender) -> Result<Response> {
        match request {
            Request::SaveRule { rule } => {
                self.save_rule(rule, sender_url(sender, "saveRule")?).await?;
                Ok(Response::ok())
            }
            Request::GetRules { url } => {
                let rules = match url.as_deref().or(sender.url.as_deref()) {
                    Some(url) => match hostname_of(url) {
                        Ok(hostname) => self.rules.list(&hostname).await,
                        Err(e) => {
                            log::error!("Error while retrieving rules: {}", e);
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                };
                Ok(Response::Rules { rules })
            }
            Request::DeleteRule { rule_id } => {
                self.delete_rule(&rule_id, sender_url(sender, "deleteRule")?)
                    .await?;
                Ok(Response::ok())
            }
            Request::GetEditMode => Ok(Response::EditMode {
                edit_mode: self.settings.edit_mode().await,
            }),
            Request::SetEditMode { enabled } => {
                self.settings.set_edit_mode(enabled).await?;
                Ok(Response::ok())
            }
        }
    }

    /// Normalize, stamp and store a draft authored on `page_url`
    pub async fn save_rule(&self, draft: RuleDraft, page_url: &str) -> Result<RuleId> {
        let hostname = hostname_of(page_url)?;
        let rule = draft.normalized()?.stamp(page_url);
        let id = rule.id.clone();
        self.rules.add(&hostname, rule).await?;
        Ok(id)
    }

    pub async fn delete_rule(&self, id: &RuleId, page_url: &str) -> Result<()> {
        let hostname = hostname_of(page_url)?;
        self.rules.remove_by_id(&hostname, id).await?;
        Ok(())
    }
}

fn sender_url<'a>(sender: &'a Sender, action: &str) -> Result<&'a str> {
    sender.url.as_deref().ok_or_else(|| ZapError::MessageFailed {
        action: action.to_string(),
        reason: "sender has no tab URL".to_string(),
    })
}
