//! Layered configuration for custody modules
//!
//! Values are resolved as defaults, then a config file (`.toml` or `.json`),
//! then `WARDEN_*` environment overrides, and are validated last.

use crate::errors::{CustodyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fixed delay between queueing a guardian removal and being able to execute it.
pub const GUARDIAN_REMOVAL_DELAY_SECS: u64 = 3 * 24 * 60 * 60;

/// Default upper bound on the voter list accepted by recovery execution.
pub const DEFAULT_MAX_VOTERS: usize = 256;

const ENV_PREFIX: &str = "WARDEN_";

/// Who may cancel an in-progress recovery.
///
/// `Controller` assumes the controller credential was merely misplaced and
/// lets its holder veto recoveries; a single guardian cannot stall a
/// recovery. `Guardian` assumes the controller may be fully unreachable and
/// lets any guardian abort a recovery it considers malicious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Only the current controller may cancel
    #[default]
    Controller,
    /// Any current guardian may cancel
    Guardian,
}

impl std::str::FromStr for CancelPolicy {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "controller" => Ok(Self::Controller),
            "guardian" => Ok(Self::Guardian),
            other => Err(CustodyError::config(format!(
                "unknown cancel policy '{other}', expected 'controller' or 'guardian'"
            ))),
        }
    }
}

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;
}

/// Custody module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustodyConfig {
    /// Who may cancel an in-progress recovery
    pub cancel_policy: CancelPolicy,
    /// Whether guardians may publish their digest-to-account link
    pub allow_identity_reveal: bool,
    /// Maximum voter list length accepted by recovery execution
    pub max_voters: usize,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            cancel_policy: CancelPolicy::default(),
            allow_identity_reveal: true,
            max_voters: DEFAULT_MAX_VOTERS,
        }
    }
}

impl CustodyConfig {
    /// Load from a `.toml` or `.json` file. Missing keys keep their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CustodyError::config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CustodyError::config(format!("invalid JSON config: {e}")))?,
            Some("toml") | None => toml::from_str(&content)?,
            Some(other) => {
                return Err(CustodyError::config(format!(
                    "unsupported config extension '.{other}'"
                )))
            }
        };

        tracing::debug!(path = %path.display(), "Loaded custody config");
        Ok(config)
    }

    /// Apply `WARDEN_*` overrides from the process environment.
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `WARDEN_*` overrides from an explicit variable list.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.set_from_string(&name.to_ascii_lowercase(), value.as_ref())?;
        }
        Ok(())
    }

    /// Set one configuration value by key (file/env/CLI spelling).
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "cancel_policy" => self.cancel_policy = value.parse()?,
            "allow_identity_reveal" => {
                self.allow_identity_reveal = value.trim().parse().map_err(|_| {
                    CustodyError::config(format!(
                        "allow_identity_reveal must be true or false, got '{value}'"
                    ))
                })?;
            }
            "max_voters" => {
                self.max_voters = value.trim().parse().map_err(|_| {
                    CustodyError::config(format!("max_voters must be an integer, got '{value}'"))
                })?;
            }
            // Unrelated WARDEN_* variables (e.g. CLI settings) are not ours.
            _ => {}
        }
        Ok(())
    }

    /// Defaults, then `path` if given, then environment, then validation.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigValidation for CustodyConfig {
    fn validate(&self) -> Result<()> {
        if self.max_voters == 0 {
            return Err(CustodyError::config("max_voters must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CustodyConfig::default();
        assert_eq!(config.cancel_policy, CancelPolicy::Controller);
        assert!(config.allow_identity_reveal);
        assert_eq!(config.max_voters, DEFAULT_MAX_VOTERS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_removal_delay_is_three_days() {
        assert_eq!(GUARDIAN_REMOVAL_DELAY_SECS, 259_200);
    }

    #[test]
    fn test_load_toml_keeps_missing_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "cancel_policy = \"guardian\"").unwrap();

        let config = CustodyConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.cancel_policy, CancelPolicy::Guardian);
        assert_eq!(config.max_voters, DEFAULT_MAX_VOTERS);
    }

    #[test]
    fn test_load_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"allow_identity_reveal": false, "max_voters": 8}}"#).unwrap();

        let config = CustodyConfig::load_from_file(file.path()).unwrap();
        assert!(!config.allow_identity_reveal);
        assert_eq!(config.max_voters, 8);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "removal_delay_secs = 10").unwrap();

        let err = CustodyConfig::load_from_file(file.path()).unwrap_err();
        assert_matches!(err, CustodyError::Config { .. });
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CustodyConfig::default();
        config
            .merge_with_vars([
                ("WARDEN_CANCEL_POLICY", "Guardian"),
                ("WARDEN_MAX_VOTERS", "16"),
                ("WARDEN_LOG", "debug"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert_eq!(config.cancel_policy, CancelPolicy::Guardian);
        assert_eq!(config.max_voters, 16);
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut config = CustodyConfig::default();
        let err = config
            .merge_with_vars([("WARDEN_ALLOW_IDENTITY_REVEAL", "sometimes")])
            .unwrap_err();
        assert_matches!(err, CustodyError::Config { .. });
    }

    #[test]
    fn test_zero_max_voters_invalid() {
        let config = CustodyConfig {
            max_voters: 0,
            ..CustodyConfig::default()
        };
        assert_matches!(config.validate(), Err(CustodyError::Config { .. }));
    }
}
