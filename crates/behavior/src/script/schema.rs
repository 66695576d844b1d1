//! Document types of a behavior script.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::behavior::Hook;

/// Metadata shared by every script document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only public `Behavior` documents are candidates for instantiation.
    #[serde(default = "default_public")]
    pub public: bool,
}

fn default_public() -> bool {
    true
}

/// Supported document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptKind {
    Behavior,
    Partial,
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptKind::Behavior => write!(f, "Behavior"),
            ScriptKind::Partial => write!(f, "Partial"),
        }
    }
}

impl FromStr for ScriptKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Behavior" => Ok(ScriptKind::Behavior),
            "Partial" => Ok(ScriptKind::Partial),
            other => Err(format!("unknown script kind: '{}'", other)),
        }
    }
}

/// First-pass view of a document: header fields plus everything else as raw YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: ScriptMetadata,
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl ScriptEnvelope {
    pub fn script_kind(&self) -> std::result::Result<ScriptKind, String> {
        self.kind.parse()
    }

    /// Second pass: re-read the whole document as its kind-specific type.
    pub fn parse_full(&self) -> std::result::Result<ScriptDocument, String> {
        let kind = self.script_kind()?;
        let value = serde_yaml::to_value(self).map_err(|e| e.to_string())?;
        match kind {
            ScriptKind::Behavior => serde_yaml::from_value::<BehaviorDef>(value)
                .map(ScriptDocument::Behavior)
                .map_err(|e| e.to_string()),
            ScriptKind::Partial => serde_yaml::from_value::<PartialDef>(value)
                .map(ScriptDocument::Partial)
                .map_err(|e| e.to_string()),
        }
    }
}

/// Hook bodies of a behavior; absent hooks are no-ops.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookTemplates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_config_load: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_config_loaded: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_dispatch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_dispatched: Option<String>,
}

impl HookTemplates {
    pub fn get(&self, hook: Hook) -> Option<&str> {
        match hook {
            Hook::OnConfigLoad => self.on_config_load.as_deref(),
            Hook::OnConfigLoaded => self.on_config_loaded.as_deref(),
            Hook::OnDispatch => self.on_dispatch.as_deref(),
            Hook::OnDispatched => self.on_dispatched.as_deref(),
        }
    }
}

/// `kind: Behavior` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorDef {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: ScriptMetadata,
    #[serde(default)]
    pub hooks: HookTemplates,
    /// Static values exposed to every hook as `vars`.
    #[serde(default)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
}

/// `kind: Partial` document: a named template fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialDef {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: ScriptMetadata,
    pub template: String,
}

/// A fully parsed script document.
#[derive(Debug, Clone)]
pub enum ScriptDocument {
    Behavior(BehaviorDef),
    Partial(PartialDef),
}

impl ScriptDocument {
    pub fn metadata(&self) -> &ScriptMetadata {
        match self {
            ScriptDocument::Behavior(def) => &def.metadata,
            ScriptDocument::Partial(def) => &def.metadata,
        }
    }

    pub fn kind(&self) -> ScriptKind {
        match self {
            ScriptDocument::Behavior(_) => ScriptKind::Behavior,
            ScriptDocument::Partial(_) => ScriptKind::Partial,
        }
    }
}
