//! Filesystem-driven reloads.
//!
//! A [`BehaviorWatcher`] forwards change events under a stage directory to a
//! [`Debouncer`], which turns each burst into a single
//! [`BehaviorHost::update_behavior`](crate::host::BehaviorHost::update_behavior)
//! call once the burst has been quiet for the debounce window.

mod core;
mod debounce;

#[cfg(test)]
mod tests;

pub use self::core::BehaviorWatcher;
pub use self::debounce::{DebounceTrigger, Debouncer, WatchState};
