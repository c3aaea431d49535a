// petribench - core/discovery.rs
//
// Discovery of event logs and approach model directories.
//
// Both roots are flat: logs are the files directly inside the logs root,
// approaches are the directories directly inside the models root. Results
// are sorted by file name so runs are deterministic.
//
// Per-entry I/O errors are non-fatal and collected as warnings; only an
// invalid root returns `Err`.

use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for log discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Glob patterns (filename-only) a log file must match to be included.
    /// An empty list means "include every file".
    pub log_patterns: Vec<String>,

    /// Extension of model files inside each approach directory.
    pub model_extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            log_patterns: constants::DEFAULT_LOG_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            model_extension: constants::DEFAULT_MODEL_EXTENSION.to_string(),
        }
    }
}

/// An event log file and the process it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,

    /// File name up to the first `.`: `p1.xes.gz` -> `p1`.
    pub process_name: String,
}

/// Process name of a log file name.
pub fn process_name(file_name: &str) -> &str {
    file_name
        .split(constants::PROCESS_NAME_SEPARATOR)
        .next()
        .unwrap_or(file_name)
}

/// Location of `approach`'s model for `process_name`:
/// `<models_root>/<approach>/<process_name>.<extension>`.
pub fn model_path(models_root: &Path, approach: &str, process_name: &str, extension: &str) -> PathBuf {
    models_root
        .join(approach)
        .join(format!("{process_name}.{extension}"))
}

/// Discover event logs directly under `root`, sorted by file name.
///
/// Hidden files and files whose process name would be empty are skipped.
/// Returns the logs and non-fatal warnings.
pub fn discover_logs(
    root: &Path,
    config: &DiscoveryConfig,
) -> Result<(Vec<LogFile>, Vec<String>), DiscoveryError> {
    check_root(root)?;
    let patterns = compile_patterns(&config.log_patterns);

    let mut logs = Vec::new();
    let mut warnings = Vec::new();

    for entry in list_entries(root, &mut warnings) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            warnings.push(format!(
                "Skipping '{}': non-UTF-8 filename",
                entry.path().display()
            ));
            continue;
        };
        if file_name.starts_with('.') {
            continue;
        }
        if !is_included(file_name, &patterns) {
            tracing::trace!(file = file_name, "Not matched by log patterns");
            continue;
        }

        logs.push(LogFile {
            path: entry.path().to_path_buf(),
            process_name: process_name(file_name).to_string(),
        });
    }
    warn_shared_process_names(&logs, &mut warnings);

    tracing::debug!(
        root = %root.display(),
        logs = logs.len(),
        warnings = warnings.len(),
        "Log discovery complete"
    );
    Ok((logs, warnings))
}

/// Discover approach directories directly under `root`, sorted by name.
pub fn discover_approaches(root: &Path) -> Result<(Vec<String>, Vec<String>), DiscoveryError> {
    check_root(root)?;

    let mut approaches = Vec::new();
    let mut warnings = Vec::new();

    for entry in list_entries(root, &mut warnings) {
        if !entry.file_type().is_dir() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if !name.starts_with('.') => approaches.push(name.to_string()),
            Some(_) => {}
            None => warnings.push(format!(
                "Skipping '{}': non-UTF-8 directory name",
                entry.path().display()
            )),
        }
    }

    tracing::debug!(
        root = %root.display(),
        approaches = approaches.len(),
        "Approach discovery complete"
    );
    Ok((approaches, warnings))
}

// =============================================================================
// Helpers
// =============================================================================

fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DiscoveryError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(_) => Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
        }),
    }
}

/// Immediate children of `root`, sorted by file name. Inaccessible entries
/// become warnings.
fn list_entries(root: &Path, warnings: &mut Vec<String>) -> Vec<walkdir::DirEntry> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                None
            }
        })
        .collect()
}

/// Several logs with one process name share a result table: each approach
/// is analysed once per log but recorded only once.
fn warn_shared_process_names(logs: &[LogFile], warnings: &mut Vec<String>) {
    let mut by_process: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for log in logs {
        let file = log
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        by_process.entry(&log.process_name).or_default().push(file);
    }
    for (process, files) in by_process {
        if files.len() > 1 {
            warnings.push(format!(
                "Process '{process}' has several logs ({}); only the first to finish \
                 each approach is recorded",
                files.join(", ")
            ));
        }
    }
}

/// Compile glob patterns; patterns that fail to compile are logged and skipped.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// Returns true if `file_name` matches at least one pattern.
/// An empty pattern list means "include all".
fn is_included(file_name: &str, patterns: &[glob::Pattern]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.matches(file_name))
}
