//! Behavior scripts: YAML documents with minijinja hook templates.
//!
//! A compilation unit is a multi-document YAML stream. Each document is read
//! in two passes: first as a [`ScriptEnvelope`] to get `kind`, then into the
//! kind-specific definition. Exactly one public `Behavior` document must be
//! present; `Partial` documents register named fragments that hooks may
//! `{% include %}`.

mod compiler;
mod output;
mod runtime;
mod schema;


pub use self::compiler::compile;
pub use self::output::{HookOutput, HookSink, MemoryHookSink, TracingHookSink};
pub use self::runtime::ScriptBehavior;
pub use self::schema::{BehaviorDef, HookTemplates, PartialDef, ScriptDocument, ScriptEnvelope, ScriptKind, ScriptMetadata};
