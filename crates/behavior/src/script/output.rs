//! Where rendered hook output goes.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::info;

use crate::behavior::Hook;

/// One non-empty rendering of a hook template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookOutput {
    pub stage: String,
    pub behavior: String,
    pub hook: Hook,
    /// Sequence number of the dispatched item, for dispatch hooks.
    pub seq: Option<u64>,
    pub text: String,
}

/// Receives hook output from script behaviors.
pub trait HookSink: Send + Sync {
    fn emit(&self, output: HookOutput);
}

/// Default sink: one `info!` event per output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHookSink;

impl HookSink for TracingHookSink {
    fn emit(&self, output: HookOutput) {
        info!(
            stage = %output.stage,
            behavior = %output.behavior,
            hook = %output.hook,
            seq = ?output.seq,
            "{}",
            output.text
        );
    }
}

/// Sink that keeps every output in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryHookSink {
    outputs: Mutex<Vec<HookOutput>>,
}

impl MemoryHookSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<HookOutput> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts emitted for one hook, in order.
    pub fn texts(&self, hook: Hook) -> Vec<String> {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|o| o.hook == hook)
            .map(|o| o.text.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HookSink for MemoryHookSink {
    fn emit(&self, output: HookOutput) {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(output);
    }
}
