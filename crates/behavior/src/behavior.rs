//! The [`Behavior`] hook set and the [`BehaviorSource`] that builds it.

use std::fmt;
use std::path::Path;

use lane_core::Message;
use serde::Serialize;

use crate::error::Result;

/// One of the four hook points of a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    OnConfigLoad,
    OnConfigLoaded,
    OnDispatch,
    OnDispatched,
}

impl Hook {
    pub const ALL: [Hook; 4] = [
        Hook::OnConfigLoad,
        Hook::OnConfigLoaded,
        Hook::OnDispatch,
        Hook::OnDispatched,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::OnConfigLoad => "on_config_load",
            Hook::OnConfigLoaded => "on_config_loaded",
            Hook::OnDispatch => "on_dispatch",
            Hook::OnDispatched => "on_dispatched",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable processing logic of a stage.
///
/// Hosts call hooks with exclusive access (`&mut self`): at most one hook of
/// a given instance runs at any time, and never while the instance is being
/// replaced.
pub trait Behavior: Send {
    /// Identifier of the definition this instance was built from.
    fn id(&self) -> &str;

    fn on_config_load(&mut self) -> Result<()>;

    fn on_config_loaded(&mut self) -> Result<()>;

    fn on_dispatch(&mut self, item: &Message) -> Result<()>;

    fn on_dispatched(&mut self, item: &Message) -> Result<()>;
}

/// Builds complete [`Behavior`] instances, e.g. by compiling source files.
///
/// Every call produces a fresh instance; a failed call must not have side
/// effects on instances handed out earlier.
pub trait BehaviorSource: Send + Sync {
    /// Human-readable origin for logs (e.g. the source directory).
    fn describe(&self) -> String;

    fn load(&self) -> Result<Box<dyn Behavior>>;

    /// Directory whose changes should trigger a reload, if any.
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}
