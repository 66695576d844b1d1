//! [`ScriptBehavior`]: a compiled behavior script.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lane_core::Message;
use minijinja::Environment;
use serde::Serialize;

use crate::behavior::{Behavior, Hook};
use crate::error::{BehaviorError, Result};

use super::compiler::hook_template_name;
use super::output::{HookOutput, HookSink};
use super::schema::BehaviorDef;

/// Variables visible to hook templates.
#[derive(Serialize)]
struct HookContext<'a> {
    stage: &'a str,
    behavior: &'a str,
    hook: &'static str,
    item: Option<&'a Message>,
    vars: &'a BTreeMap<String, serde_yaml::Value>,
    /// Hook invocations on this instance so far, including the current one.
    calls: u64,
}

/// A behavior compiled from a script. Rendering a hook emits its non-empty
/// output to the configured [`HookSink`].
pub struct ScriptBehavior {
    id: String,
    stage: String,
    env: Environment<'static>,
    hooks: Vec<Hook>,
    vars: BTreeMap<String, serde_yaml::Value>,
    calls: u64,
    sink: Arc<dyn HookSink>,
}

impl ScriptBehavior {
    pub(super) fn new(def: BehaviorDef, stage: &str, env: Environment<'static>, sink: Arc<dyn HookSink>) -> Self {
        let hooks = Hook::ALL
            .into_iter()
            .filter(|hook| def.hooks.get(*hook).is_some())
            .collect();
        Self {
            id: def.metadata.id,
            stage: stage.to_string(),
            env,
            hooks,
            vars: def.vars,
            calls: 0,
            sink,
        }
    }

    /// Hooks this script defines; the others are no-ops.
    pub fn defined_hooks(&self) -> &[Hook] {
        &self.hooks
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn run_hook(&mut self, hook: Hook, item: Option<&Message>) -> Result<()> {
        self.calls += 1;
        if !self.hooks.contains(&hook) {
            return Ok(());
        }

        let hook_error = |e: minijinja::Error| BehaviorError::Hook {
            hook,
            message: e.to_string(),
        };
        let template = self.env.get_template(&hook_template_name(hook)).map_err(hook_error)?;
        let rendered = template
            .render(HookContext {
                stage: &self.stage,
                behavior: &self.id,
                hook: hook.as_str(),
                item,
                vars: &self.vars,
                calls: self.calls,
            })
            .map_err(hook_error)?;

        let text = rendered.trim();
        if !text.is_empty() {
            self.sink.emit(HookOutput {
                stage: self.stage.clone(),
                behavior: self.id.clone(),
                hook,
                seq: item.map(|m| m.seq),
                text: text.to_string(),
            });
        }
        Ok(())
    }
}

impl Behavior for ScriptBehavior {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_config_load(&mut self) -> Result<()> {
        self.run_hook(Hook::OnConfigLoad, None)
    }

    fn on_config_loaded(&mut self) -> Result<()> {
        self.run_hook(Hook::OnConfigLoaded, None)
    }

    fn on_dispatch(&mut self, item: &Message) -> Result<()> {
        self.run_hook(Hook::OnDispatch, Some(item))
    }

    fn on_dispatched(&mut self, item: &Message) -> Result<()> {
        self.run_hook(Hook::OnDispatched, Some(item))
    }
}

impl fmt::Debug for ScriptBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptBehavior")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .field("hooks", &self.hooks)
            .field("calls", &self.calls)
            .finish()
    }
}
