use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub node: NodeConfig,
    pub watcher: WatcherConfig,
    pub pool: PoolConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LANE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("LANE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            node: NodeConfig::from_env_profiled(p),
            watcher: WatcherConfig::from_env_profiled(p),
            pool: PoolConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  node:     name={}, category={}, concurrent={}, interval={}ms",
            self.node.name,
            self.node.category,
            self.node.concurrent,
            self.node.interval_ms
        );
        tracing::info!("  scripts:  dir={}", self.node.source_dir().display());
        tracing::info!(
            "  watcher:  enabled={}, debounce={}ms",
            self.watcher.enabled,
            self.watcher.debounce_ms
        );
        tracing::info!("  pool:     worker_threads={}", self.pool.worker_threads);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            node: NodeConfig::default(),
            watcher: WatcherConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

// ── Node ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Stage name; also the leaf directory holding its behavior sources.
    pub name: String,
    /// Stage category directory (e.g. `importer`).
    pub category: String,
    /// Root directory for all behavior sources.
    pub script_root: PathBuf,
    /// `true` selects the unordered pool scheduler, `false` the ordered lane.
    pub concurrent: bool,
    /// Producer period in milliseconds.
    pub interval_ms: u64,
}

impl NodeConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            name: profiled_env_or(p, "LANE_NODE_NAME", "queue"),
            category: profiled_env_or(p, "LANE_NODE_CATEGORY", "importer"),
            script_root: PathBuf::from(profiled_env_or(p, "LANE_SCRIPT_ROOT", "data/scripts")),
            concurrent: profiled_env_bool(p, "LANE_CONCURRENT", false),
            // Zero would make the producer spin.
            interval_ms: match profiled_env_u64(p, "LANE_PRODUCE_INTERVAL_MS", 1000) {
                0 => 1000,
                ms => ms,
            },
        }
    }

    /// Directory whose files form this stage's behavior compilation unit:
    /// `<script_root>/<category>/<name>`.
    pub fn source_dir(&self) -> PathBuf {
        self.script_root.join(&self.category).join(&self.name)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "queue".to_string(),
            category: "importer".to_string(),
            script_root: PathBuf::from("data/scripts"),
            concurrent: false,
            interval_ms: 1000,
        }
    }
}

// ── Watcher ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub enabled: bool,
    /// Quiet period after the last filesystem event before a reload fires.
    pub debounce_ms: u64,
}

impl WatcherConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            enabled: profiled_env_bool(p, "LANE_WATCH", true),
            debounce_ms: profiled_env_u64(p, "LANE_DEBOUNCE_MS", 5000),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 5000,
        }
    }
}

// ── Worker pool ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Dedicated pool size. 0 = share the process-wide pool.
    pub worker_threads: usize,
}

impl PoolConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            worker_threads: profiled_env_usize(p, "LANE_WORKER_THREADS", 0),
        }
    }

    pub fn uses_global_pool(&self) -> bool {
        self.worker_threads == 0
    }
}
