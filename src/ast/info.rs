//! Per-snapshot context shared by every locator operation
//!
//! `AstInfo` is rebuilt whenever the host reparses. It carries the
//! configuration knobs, the type registry and the hook cache.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::host::{HostHook, HostTree};
use super::recovery::RecoveryStrategy;
use crate::config::LocatorConfig;
use crate::error::ConfigError;

/// How raw positions are read from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionConvention {
    /// `HostTree::packed_span`
    #[default]
    Packed,
    /// `HostTree::line_column_span`
    LineColumn,
}

impl fmt::Display for PositionConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionConvention::Packed => write!(f, "PACKED"),
            PositionConvention::LineColumn => write!(f, "LINE_COLUMN"),
        }
    }
}

impl FromStr for PositionConvention {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PACKED" => Ok(PositionConvention::Packed),
            "LINE_COLUMN" => Ok(PositionConvention::LineColumn),
            _ => Err(ConfigError::UnknownValue { kind: "position convention", value: s.to_string() }),
        }
    }
}

/// What identifies a node in a TAL edge besides its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentificationStyle {
    /// The runtime type name.
    #[default]
    Type,
    /// The host label when the node has one, the type name otherwise.
    Label,
}

impl fmt::Display for IdentificationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentificationStyle::Type => write!(f, "TYPE"),
            IdentificationStyle::Label => write!(f, "LABEL"),
        }
    }
}

impl FromStr for IdentificationStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TYPE" => Ok(IdentificationStyle::Type),
            "LABEL" => Ok(IdentificationStyle::Label),
            _ => Err(ConfigError::UnknownValue { kind: "identification style", value: s.to_string() }),
        }
    }
}

/// Small integer standing in for a type name within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(u32);

/// Interns type names seen in one snapshot.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: FxHashMap<String, TypeTag>,
    names: Vec<String>,
}

impl TypeRegistry {
    pub fn intern(&mut self, name: &str) -> TypeTag {
        if let Some(tag) = self.by_name.get(name) {
            return *tag;
        }
        let tag = TypeTag(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), tag);
        tag
    }

    pub fn lookup(&self, name: &str) -> Option<TypeTag> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, tag: TypeTag) -> &str {
        &self.names[tag.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn clear(&mut self) {
        self.by_name.clear();
        self.names.clear();
    }
}

/// Identification key compared by the TAL matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Type(TypeTag),
    Label(String),
}

/// Request-scoped context for one parsed snapshot.
#[derive(Debug, Default)]
pub struct AstInfo {
    pub recovery: RecoveryStrategy,
    pub positions: PositionConvention,
    pub identify: IdentificationStyle,
    pub(crate) types: TypeRegistry,
    pub(crate) tal_root: Option<TypeTag>,
    hooks: FxHashMap<(TypeTag, HostHook), bool>,
}

impl AstInfo {
    pub fn new(config: &LocatorConfig) -> Self {
        AstInfo {
            recovery: config.recovery,
            positions: config.positions,
            identify: config.identify,
            ..Default::default()
        }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Tag of the TAL-root hint, if the host provided one.
    pub fn tal_root(&self) -> Option<TypeTag> {
        self.tal_root
    }

    /// Whether nodes tagged `tag` implement `hook`, asking the host once per
    /// `(type, hook)` pair.
    pub(crate) fn hook_enabled<H: HostTree>(&mut self, host: &H, tag: TypeTag, hook: HostHook) -> bool {
        if let Some(enabled) = self.hooks.get(&(tag, hook)) {
            return *enabled;
        }
        let enabled = host.supports(self.types.name(tag), hook);
        self.hooks.insert((tag, hook), enabled);
        enabled
    }

    /// Drops everything derived from the previous parse.
    pub(crate) fn reset_caches(&mut self) {
        self.types.clear();
        self.hooks.clear();
        self.tal_root = None;
    }
}
