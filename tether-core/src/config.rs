//! Configuration.
//!
//! Two independent knobs: [`BinderConfig`] is per observer and decides how a
//! manual first bind treats auto-run declarations; [`RuntimeConfig`] is
//! process-wide and installs the scoped-mutation policy.
//!
//! Both load from JSON and default every missing field:
//!
//! ```rust,ignore
//! let runtime = RuntimeConfig::from_json_str(r#"{ "enforce_actions": "observed" }"#)?;
//! runtime.apply();
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reactive::{EnforceActions, Runtime};

/// Per-observer binding behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// When the first bind of an instance is a manual one, move every
    /// disable-scoped auto-run declaration to the retained set first, so it
    /// survives later disable/enable cycles.
    pub promote_on_manual_bind: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            promote_on_manual_bind: true,
        }
    }
}

impl BinderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Process-wide reactive runtime settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub enforce_actions: EnforceActions,
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Install these settings for the whole process.
    pub fn apply(&self) {
        tracing::debug!(enforce_actions = ?self.enforce_actions, "applying runtime config");
        Runtime::set_enforce_actions(self.enforce_actions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binder_config_defaults_missing_fields() {
        let config = BinderConfig::from_json_str("{}").unwrap();
        assert!(config.promote_on_manual_bind);

        let config = BinderConfig::from_json_str(r#"{ "promote_on_manual_bind": false }"#).unwrap();
        assert!(!config.promote_on_manual_bind);
    }

    #[test]
    fn runtime_config_parses_policy() {
        let config = RuntimeConfig::from_json_str(r#"{ "enforce_actions": "observed" }"#).unwrap();
        assert_eq!(config.enforce_actions, EnforceActions::Observed);
        assert_eq!(RuntimeConfig::default().enforce_actions, EnforceActions::Never);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = RuntimeConfig::from_json_str(r#"{ "enforce_actions": "always" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
