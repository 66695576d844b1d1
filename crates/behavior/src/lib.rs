//! Hot-swappable stage behaviors.
//!
//! This crate provides:
//! - [`Behavior`] trait: the four hooks a pipeline stage calls around config
//!   loading and per-item dispatch
//! - Behavior scripts: YAML documents whose hooks are minijinja templates,
//!   compiled from every source file in a stage directory
//! - [`BehaviorHost`]: one active behavior behind one exclusive lock, swapped
//!   wholesale on reload
//! - [`BehaviorWatcher`]: recursive `notify` watch with a debounced reload

pub mod behavior;
pub mod error;
pub mod host;
pub mod loader;
pub mod script;
pub mod watcher;

pub use behavior::{Behavior, BehaviorSource, Hook};
pub use error::{BehaviorError, Result};
pub use host::BehaviorHost;
pub use loader::{collect_sources, CompilationUnit, ScriptSource};
pub use script::{HookOutput, HookSink, MemoryHookSink, ScriptBehavior, TracingHookSink};
pub use watcher::{BehaviorWatcher, DebounceTrigger, Debouncer, WatchState};
