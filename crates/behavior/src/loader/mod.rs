//! Collects a stage's source files into one compilation unit.
//!
//! Every YAML file under the stage directory (recursively, in file-name
//! order) belongs to the unit; dotfiles, dot-directories and other
//! extensions are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::behavior::{Behavior, BehaviorSource};
use crate::error::{BehaviorError, Result};
use crate::script::{compile, HookSink, TracingHookSink};


/// All source files of one stage, concatenated as a multi-document YAML stream.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub text: String,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

/// Read every script file under `dir` into a [`CompilationUnit`].
///
/// A missing or unreadable directory is an error; an empty one yields an
/// empty unit (which then fails to compile for lack of a behavior).
pub fn collect_sources(dir: &Path) -> Result<CompilationUnit> {
    let meta = fs::metadata(dir).map_err(|source| BehaviorError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(BehaviorError::Io {
            path: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut files = Vec::new();
    let mut text = String::new();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_yaml(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        let contents = fs::read_to_string(&path).map_err(|source| BehaviorError::Io {
            path: path.clone(),
            source,
        })?;

        // A byte-order mark mid-stream is not valid YAML.
        let body = contents.strip_prefix('\u{FEFF}').unwrap_or(&contents);

        text.push_str("---\n");
        text.push_str(&format!("# {}\n", path.display()));
        text.push_str(body);
        if !body.ends_with('\n') {
            text.push('\n');
        }
        files.push(path);
    }

    debug!(dir = %dir.display(), files = files.len(), "collected behavior sources");
    Ok(CompilationUnit {
        dir: dir.to_path_buf(),
        files,
        text,
    })
}

/// [`BehaviorSource`] that compiles the scripts in one stage directory.
pub struct ScriptSource {
    dir: PathBuf,
    stage: String,
    sink: Arc<dyn HookSink>,
}

impl ScriptSource {
    /// Scripts under `dir`, with hook output going to `tracing`.
    pub fn new(dir: impl Into<PathBuf>, stage: impl Into<String>) -> Self {
        Self::with_sink(dir, stage, Arc::new(TracingHookSink))
    }

    pub fn with_sink(dir: impl Into<PathBuf>, stage: impl Into<String>, sink: Arc<dyn HookSink>) -> Self {
        Self {
            dir: dir.into(),
            stage: stage.into(),
            sink,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }
}

impl BehaviorSource for ScriptSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn load(&self) -> Result<Box<dyn Behavior>> {
        let unit = collect_sources(&self.dir)?;
        let behavior = compile(&unit, &self.stage, self.sink.clone())?;
        debug!(
            stage = %self.stage,
            behavior_id = %behavior.id(),
            files = unit.files.len(),
            "compiled behavior"
        );
        Ok(Box::new(behavior))
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
