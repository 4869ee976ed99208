use crate::selector::SYSTEM_PREFIX;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for the rule engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Class prefix of injected UI; such classes never appear in synthesized selectors
    pub ui_prefix: String,

    /// Marker class of `remove` rules
    pub removed_class: String,

    /// Inject a `<style>` element hiding removed elements
    pub inject_stylesheet: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            ui_prefix: SYSTEM_PREFIX.to_string(),
            removed_class: format!("{}removed", SYSTEM_PREFIX),
            inject_stylesheet: true,
        }
    }
}

impl EngineOptions {
    /// Create new engine options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ignored UI class prefix
    pub fn ui_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.ui_prefix = prefix.into();
        self
    }

    /// Set the marker class of removed elements
    pub fn removed_class(mut self, class: impl Into<String>) -> Self {
        self.removed_class = class.into();
        self
    }

    /// Enable or disable stylesheet injection
    pub fn inject_stylesheet(mut self, inject: bool) -> Self {
        self.inject_stylesheet = inject;
        self
    }

    /// Id of the injected `<style>` element
    pub fn stylesheet_id(&self) -> String {
        format!("{}styles", self.ui_prefix)
    }

    /// CSS of the injected stylesheet
    pub fn stylesheet(&self) -> String {
        format!(".{} {{ display: none !important; }}", self.removed_class)
    }
}

/// Bounded retry for messages pushed into a page that may not be ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first attempt, giving the page agent time to attach
    pub initial_delay: Duration,

    /// Total delivery attempts, at least one
    pub attempts: u32,

    /// Fixed wait between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            attempts: 3,
            interval: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single attempt without delays
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            attempts: 1,
            interval: Duration::ZERO,
        }
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_options_builder() {
        let opts = EngineOptions::new()
            .removed_class("gone")
            .inject_stylesheet(false);

        assert_eq!(opts.removed_class, "gone");
        assert_eq!(opts.ui_prefix, "zapit-");
        assert!(!opts.inject_stylesheet);
        assert_eq!(opts.stylesheet(), ".gone { display: none !important; }");
    }

    #[test]
    fn test_engine_options_defaults() {
        let opts = EngineOptions::default();
        assert_eq!(opts.removed_class, "zapit-removed");
        assert_eq!(opts.stylesheet_id(), "zapit-styles");
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::new().attempts(0).interval(Duration::from_millis(10));
        assert_eq!(policy.attempts, 1);
        assert_eq!(policy.interval, Duration::from_millis(10));
        assert_eq!(RetryPolicy::default().initial_delay, Duration::from_millis(1000));
    }
}
