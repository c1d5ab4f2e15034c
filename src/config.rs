//! Mount-time configuration for a listbox instance.

use serde::Deserialize;

use crate::error::{ListboxError, Result};

/// Typed replacement for the attribute bag a host element would carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ListboxConfig {
    /// Caller-supplied stable identity; generated when absent.
    pub instance: Option<String>,
    /// Label or value of the option selected at mount.
    pub initial_value: Option<String>,
    /// Toggle text shown until the first commit.
    pub placeholder: Option<String>,
    /// Mount with the list already open.
    pub open: bool,
}

impl ListboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an attribute-style JSON object such as
    /// `{"initial-value": "b", "placeholder": "Choose one", "open": true}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(instance) = self.instance.as_deref() {
            if instance.trim().is_empty() {
                return Err(ListboxError::InvalidConfig(
                    "instance identity must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Requested initial value; an empty attribute requests nothing.
    pub fn requested_value(&self) -> Option<&str> {
        self.initial_value.as_deref().filter(|v| !v.is_empty())
    }

    /// Placeholder text; an empty attribute declares none.
    pub fn placeholder_text(&self) -> Option<&str> {
        self.placeholder.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attribute_style_json() {
        let config = ListboxConfig::from_json(
            r#"{"initial-value":"b","placeholder":"Choose one","open":true}"#,
        )
        .unwrap();
        assert_eq!(config.requested_value(), Some("b"));
        assert_eq!(config.placeholder_text(), Some("Choose one"));
        assert!(config.open);
        assert!(config.instance.is_none());
    }

    #[test]
    fn empty_attributes_count_as_absent() {
        let config = ListboxConfig::new()
            .with_initial_value("")
            .with_placeholder("");
        assert_eq!(config.requested_value(), None);
        assert_eq!(config.placeholder_text(), None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ListboxConfig::from_json(r#"{"multiple":true}"#).unwrap_err();
        assert!(matches!(err, ListboxError::Json(_)));
    }

    #[test]
    fn blank_instance_is_invalid() {
        let err = ListboxConfig::from_json(r#"{"instance":"  "}"#).unwrap_err();
        assert!(matches!(err, ListboxError::InvalidConfig(_)));
    }
}
