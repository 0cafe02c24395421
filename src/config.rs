//! Locator configuration
//!
//! A host usually builds one [`LocatorConfig`] at startup and hands it to
//! [`AstInfo::new`](crate::ast::AstInfo::new) for every parsed snapshot.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ast::{IdentificationStyle, PositionConvention, RecoveryStrategy};

pub const RECOVERY_ENV: &str = "AST_LOCATOR_RECOVERY";
pub const POSITIONS_ENV: &str = "AST_LOCATOR_POSITIONS";
pub const IDENTIFY_ENV: &str = "AST_LOCATOR_IDENTIFY";

/// Knobs shared by every snapshot of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocatorConfig {
    pub recovery: RecoveryStrategy,
    pub positions: PositionConvention,
    pub identify: IdentificationStyle,
}

impl LocatorConfig {
    /// Reads configuration from the environment, falling back to `init` and
    /// then to the defaults.
    ///
    /// Checks, per field:
    /// 1. `AST_LOCATOR_RECOVERY`, `AST_LOCATOR_POSITIONS`, `AST_LOCATOR_IDENTIFY`
    /// 2. The matching field of `init`
    /// 3. The default value
    pub fn from_env_or_default(init: Option<&LocatorConfig>) -> Self {
        Self::from_lookup(init, |key| std::env::var(key).ok())
    }

    fn from_lookup(init: Option<&LocatorConfig>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fallback = init.copied().unwrap_or_default();
        LocatorConfig {
            recovery: parse_or(lookup(RECOVERY_ENV), RECOVERY_ENV, fallback.recovery),
            positions: parse_or(lookup(POSITIONS_ENV), POSITIONS_ENV, fallback.positions),
            identify: parse_or(lookup(IDENTIFY_ENV), IDENTIFY_ENV, fallback.identify),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, fallback: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return fallback;
    };
    match value.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Ignoring {}: {}, using {}", key, e, fallback);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = LocatorConfig::from_lookup(None, env(&[]));
        assert_eq!(config, LocatorConfig::default());
        assert_eq!(config.recovery, RecoveryStrategy::AlternateParentChild);
        assert_eq!(config.positions, PositionConvention::Packed);
        assert_eq!(config.identify, IdentificationStyle::Type);
    }

    #[test]
    fn test_env_overrides_init() {
        let init = LocatorConfig { recovery: RecoveryStrategy::Parent, ..Default::default() };
        let config = LocatorConfig::from_lookup(
            Some(&init),
            env(&[(RECOVERY_ENV, "child"), (IDENTIFY_ENV, "LABEL")]),
        );
        assert_eq!(config.recovery, RecoveryStrategy::Child);
        assert_eq!(config.identify, IdentificationStyle::Label);
        assert_eq!(config.positions, PositionConvention::Packed);
    }

    #[test]
    fn test_bad_value_falls_back() {
        let init = LocatorConfig { positions: PositionConvention::LineColumn, ..Default::default() };
        let config = LocatorConfig::from_lookup(
            Some(&init),
            env(&[(POSITIONS_ENV, "bytes"), (RECOVERY_ENV, "upwards")]),
        );
        assert_eq!(config.positions, PositionConvention::LineColumn);
        assert_eq!(config.recovery, RecoveryStrategy::AlternateParentChild);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LocatorConfig = serde_json::from_str(r#"{"recovery":"SEQUENCE_CHILD_PARENT"}"#).unwrap();
        assert_eq!(config.recovery, RecoveryStrategy::SequenceChildParent);
        assert_eq!(config.identify, IdentificationStyle::Type);
    }
}
