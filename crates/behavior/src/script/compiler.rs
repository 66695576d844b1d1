//! Turns a compilation unit into a [`ScriptBehavior`].

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use minijinja::{Environment, ErrorKind};
use serde::Deserialize;
use tracing::debug;

use crate::behavior::Hook;
use crate::error::{BehaviorError, Result};
use crate::loader::CompilationUnit;

use super::output::HookSink;
use super::runtime::ScriptBehavior;
use super::schema::{BehaviorDef, PartialDef, ScriptDocument, ScriptEnvelope};

/// Prefix of the template names hooks are registered under.
const HOOK_TEMPLATE_PREFIX: &str = "@hook/";

/// Names a template may read without defining them: the hook context, the
/// `fail` function and minijinja's own globals.
const KNOWN_NAMES: &[&str] = &[
    "stage", "behavior", "hook", "item", "vars", "calls", "fail", "loop", "range", "dict",
    "namespace", "debug", "lipsum", "cycler", "joiner",
];

/// Compile every document of `unit` and instantiate its single public behavior.
///
/// Fails when the unit has YAML or template syntax errors, unknown kinds,
/// duplicate or reserved partial ids, includes of unknown partials, reads of
/// names outside the hook context, or not exactly one public `Behavior`
/// document.
pub fn compile(unit: &CompilationUnit, stage: &str, sink: Arc<dyn HookSink>) -> Result<ScriptBehavior> {
    let mut behaviors: Vec<BehaviorDef> = Vec::new();
    let mut partials: Vec<PartialDef> = Vec::new();

    for doc in parse_documents(&unit.text)? {
        match doc {
            ScriptDocument::Behavior(def) if def.metadata.public => behaviors.push(def),
            ScriptDocument::Behavior(def) => {
                debug!(behavior_id = %def.metadata.id, "skipping non-public behavior");
            }
            ScriptDocument::Partial(def) => partials.push(def),
        }
    }

    let def = match behaviors.len() {
        0 => return Err(BehaviorError::NoBehavior(unit.dir.display().to_string())),
        1 => behaviors.remove(0),
        _ => {
            return Err(BehaviorError::AmbiguousBehavior {
                ids: behaviors.into_iter().map(|b| b.metadata.id).collect(),
            })
        }
    };

    let env = build_env(&def, &partials)?;
    Ok(ScriptBehavior::new(def, stage, env, sink))
}

/// Split the stream into documents and run the two-pass parse on each.
/// Empty documents (e.g. from leading `---` separators) are skipped.
fn parse_documents(text: &str) -> Result<Vec<ScriptDocument>> {
    let mut docs = Vec::new();
    for (index, de) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_yaml::Value::deserialize(de)?;
        if value.is_null() {
            continue;
        }

        let envelope: ScriptEnvelope = serde_yaml::from_value(value)?;
        if envelope.metadata.id.is_empty() {
            return Err(BehaviorError::Compile(format!(
                "document #{}: metadata.id must not be empty",
                index
            )));
        }

        let doc = envelope.parse_full().map_err(|e| {
            BehaviorError::Compile(format!(
                "document #{} ('{}'): {}",
                index, envelope.metadata.id, e
            ))
        })?;
        debug!(id = %doc.metadata().id, kind = %doc.kind(), "parsed script document");
        docs.push(doc);
    }
    Ok(docs)
}

/// Template name under which a hook body is registered.
pub(super) fn hook_template_name(hook: Hook) -> String {
    format!("{}{}", HOOK_TEMPLATE_PREFIX, hook)
}

fn build_env(def: &BehaviorDef, partials: &[PartialDef]) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_function("fail", fail_function);

    let mut seen = HashSet::new();
    for partial in partials {
        let id = &partial.metadata.id;
        if id.starts_with(HOOK_TEMPLATE_PREFIX) {
            return Err(BehaviorError::Compile(format!(
                "partial id '{}' uses the reserved prefix '{}'",
                id, HOOK_TEMPLATE_PREFIX
            )));
        }
        if !seen.insert(id.as_str()) {
            return Err(BehaviorError::Compile(format!("duplicate partial id '{}'", id)));
        }
        env.add_template_owned(id.clone(), partial.template.clone())
            .map_err(|e| BehaviorError::Compile(format!("partial '{}': {}", id, e)))?;
    }

    for hook in Hook::ALL {
        if let Some(source) = def.hooks.get(hook) {
            env.add_template_owned(hook_template_name(hook), source.to_string())
                .map_err(|e| {
                    BehaviorError::Compile(format!(
                        "behavior '{}' hook {}: {}",
                        def.metadata.id, hook, e
                    ))
                })?;
        }
    }

    for partial in partials {
        check_references(&env, &partial.metadata.id, &partial.template, &seen, || {
            format!("partial '{}'", partial.metadata.id)
        })?;
    }
    for hook in Hook::ALL {
        if let Some(source) = def.hooks.get(hook) {
            check_references(&env, &hook_template_name(hook), source, &seen, || {
                format!("behavior '{}' hook {}", def.metadata.id, hook)
            })?;
        }
    }

    Ok(env)
}

/// Reject a template that includes an unknown partial or reads a name the
/// hook context does not provide. Both would otherwise only fail on render.
fn check_references(
    env: &Environment<'static>,
    name: &str,
    source: &str,
    partials: &HashSet<&str>,
    origin: impl Fn() -> String,
) -> Result<()> {
    for target in static_includes(source) {
        if !partials.contains(target.as_str()) {
            return Err(BehaviorError::Compile(format!(
                "{}: includes unknown partial '{}'",
                origin(),
                target
            )));
        }
    }

    let template = env
        .get_template(name)
        .map_err(|e| BehaviorError::Compile(format!("{}: {}", origin(), e)))?;
    let unknown: BTreeSet<String> = template
        .undeclared_variables(false)
        .into_iter()
        .filter(|v| !KNOWN_NAMES.contains(&v.as_str()))
        .collect();
    if !unknown.is_empty() {
        let names: Vec<String> = unknown.into_iter().collect();
        return Err(BehaviorError::Compile(format!(
            "{}: unknown name(s) {}",
            origin(),
            names.join(", ")
        )));
    }
    Ok(())
}

/// Targets of `{% include %}` tags written as string literals. Includes with
/// computed targets or `ignore missing` are left to render time.
pub(super) fn static_includes(source: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut rest = source;
    while let Some(open) = rest.find("{%") {
        rest = &rest[open + 2..];
        let Some(close) = rest.find("%}") else {
            break;
        };
        let tag = rest[..close].trim_matches(|c: char| c == '-' || c == '+' || c.is_whitespace());
        rest = &rest[close + 2..];

        let Some(arg) = tag.strip_prefix("include") else {
            continue;
        };
        let arg = arg.trim_start();
        let Some(quote) = arg.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            continue;
        };
        let body = &arg[1..];
        if let Some(end) = body.find(quote) {
            if !body[end + 1..].contains("ignore missing") {
                targets.push(body[..end].to_string());
            }
        }
    }
    targets
}

/// Template function `fail(message)`: aborts the current hook.
fn fail_function(message: String) -> std::result::Result<String, minijinja::Error> {
    Err(minijinja::Error::new(ErrorKind::InvalidOperation, message))
}
