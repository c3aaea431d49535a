// petribench - platform/config.rs
//
// Platform configuration directory resolution and petribench.toml loading
// with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for petribench configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/petribench/ or %APPDATA%\petribench\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }
}

// =============================================================================
// petribench.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of petribench.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[paths]` section.
    pub paths: PathsSection,
    /// `[discovery]` section.
    pub discovery: DiscoverySection,
    /// `[import]` section.
    pub import: ImportSection,
    /// `[analysis]` section.
    pub analysis: AnalysisSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[paths]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub logs: Option<PathBuf>,
    pub models: Option<PathBuf>,
    pub results: Option<PathBuf>,
}

/// `[discovery]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Include glob patterns for log files.
    pub log_patterns: Option<Vec<String>>,
    /// Extension of model files.
    pub model_extension: Option<String>,
}

/// `[import]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// Glob patterns of silent transition labels.
    pub silent_label_patterns: Option<Vec<String>>,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    /// Number of worker threads (0 = auto).
    pub worker_threads: Option<usize>,
    /// Reachable marking cap for the soundness check.
    pub max_states: Option<usize>,
    /// Search state cap for one alignment.
    pub max_alignment_states: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated run configuration.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    // -- Paths --
    pub logs_root: PathBuf,
    pub models_root: PathBuf,
    pub results_root: PathBuf,

    // -- Discovery --
    pub log_patterns: Vec<String>,
    pub model_extension: String,

    // -- Import --
    pub silent_label_patterns: Vec<String>,

    // -- Analysis --
    /// Worker threads; 0 means one per available CPU.
    pub worker_threads: usize,
    pub max_states: usize,
    pub max_alignment_states: usize,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            logs_root: PathBuf::from(constants::DEFAULT_LOGS_ROOT),
            models_root: PathBuf::from(constants::DEFAULT_MODELS_ROOT),
            results_root: PathBuf::from(constants::DEFAULT_RESULTS_ROOT),
            log_patterns: to_strings(constants::DEFAULT_LOG_PATTERNS),
            model_extension: constants::DEFAULT_MODEL_EXTENSION.to_string(),
            silent_label_patterns: to_strings(constants::DEFAULT_SILENT_LABEL_PATTERNS),
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            max_states: constants::DEFAULT_MAX_STATES,
            max_alignment_states: constants::DEFAULT_MAX_ALIGNMENT_STATES,
            log_level: None,
        }
    }
}

/// Which config file to read: the explicit one, else `petribench.toml` in
/// the working directory, else the one in the platform config directory.
/// `None` if no default file exists.
pub fn config_file_location(explicit: Option<&Path>, platform: &PlatformPaths) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    [
        PathBuf::from(constants::CONFIG_FILE_NAME),
        platform.config_dir.join(constants::CONFIG_FILE_NAME),
    ]
    .into_iter()
    .find(|candidate| candidate.is_file())
}

/// Load and validate the configuration.
///
/// Returns the validated config and a list of non-fatal warnings. Without a
/// config file the defaults are returned with no warnings. An explicit file
/// that cannot be read is an error; an unparseable file falls back to
/// defaults with a warning.
pub fn load_config(
    explicit: Option<&Path>,
    platform: &PlatformPaths,
) -> Result<(BenchConfig, Vec<String>), ConfigError> {
    let Some(config_path) = config_file_location(explicit, platform) else {
        tracing::debug!("No petribench.toml found; using defaults");
        return Ok((BenchConfig::default(), Vec::new()));
    };

    let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
        path: config_path.clone(),
        source,
    })?;

    Ok(parse_config(&content, &config_path))
}

/// Parse and validate config file content. `source` is only used in messages.
pub fn parse_config(content: &str, source: &Path) -> (BenchConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                source.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (BenchConfig::default(), warnings);
        }
    };

    tracing::info!(path = %source.display(), "Loaded petribench.toml");

    let mut config = BenchConfig::default();

    // -- Paths --
    if let Some(logs) = raw.paths.logs {
        config.logs_root = logs;
    }
    if let Some(models) = raw.paths.models {
        config.models_root = models;
    }
    if let Some(results) = raw.paths.results {
        config.results_root = results;
    }

    // -- Discovery: log_patterns --
    if let Some(patterns) = raw.discovery.log_patterns {
        config.log_patterns = valid_patterns("[discovery] log_patterns", patterns, &mut warnings);
    }

    // -- Discovery: model_extension --
    if let Some(ext) = raw.discovery.model_extension {
        let ext = ext.trim().trim_start_matches('.');
        if ext.is_empty() {
            warnings.push(format!(
                "[discovery] model_extension is empty. Using default ({}).",
                constants::DEFAULT_MODEL_EXTENSION
            ));
        } else {
            config.model_extension = ext.to_string();
        }
    }

    // -- Import: silent_label_patterns --
    if let Some(patterns) = raw.import.silent_label_patterns {
        config.silent_label_patterns =
            valid_patterns("[import] silent_label_patterns", patterns, &mut warnings);
    }

    // -- Analysis: worker_threads --
    if let Some(threads) = raw.analysis.worker_threads {
        match validate_worker_threads(threads) {
            Ok(threads) => config.worker_threads = threads,
            Err(e) => warnings.push(format!(
                "[analysis] {e}. Using default ({}).",
                constants::DEFAULT_WORKER_THREADS
            )),
        }
    }

    // -- Analysis: state caps --
    if let Some(states) = raw.analysis.max_states {
        if let Some(states) = state_limit(
            "max_states",
            states,
            constants::DEFAULT_MAX_STATES,
            &mut warnings,
        ) {
            config.max_states = states;
        }
    }
    if let Some(states) = raw.analysis.max_alignment_states {
        if let Some(states) = state_limit(
            "max_alignment_states",
            states,
            constants::DEFAULT_MAX_ALIGNMENT_STATES,
            &mut warnings,
        ) {
            config.max_alignment_states = states;
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: {}. Using default ({}).",
                constants::VALID_LOG_LEVELS.join(", "),
                constants::DEFAULT_LOG_LEVEL,
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Check a worker thread count (from the config file or the command line).
pub fn validate_worker_threads(threads: usize) -> Result<usize, ConfigError> {
    if threads <= constants::ABSOLUTE_MAX_WORKER_THREADS {
        Ok(threads)
    } else {
        Err(ConfigError::ValueOutOfRange {
            field: "worker_threads".to_string(),
            value: threads.to_string(),
            expected: format!("0-{} (0 = auto)", constants::ABSOLUTE_MAX_WORKER_THREADS),
        })
    }
}

fn state_limit(
    field: &str,
    value: usize,
    default: usize,
    warnings: &mut Vec<String>,
) -> Option<usize> {
    if (constants::MIN_STATE_LIMIT..=constants::ABSOLUTE_MAX_STATE_LIMIT).contains(&value) {
        Some(value)
    } else {
        warnings.push(format!(
            "[analysis] {field} = {value} is out of range ({}-{}). Using default ({default}).",
            constants::MIN_STATE_LIMIT,
            constants::ABSOLUTE_MAX_STATE_LIMIT,
        ));
        None
    }
}

/// Keep the patterns that compile; warn about the rest.
fn valid_patterns(field: &str, patterns: Vec<String>, warnings: &mut Vec<String>) -> Vec<String> {
    patterns
        .into_iter()
        .filter(|p| match glob::Pattern::new(p) {
            Ok(_) => true,
            Err(e) => {
                warnings.push(format!("{field}: pattern \"{p}\" is invalid ({e}); ignoring it."));
                false
            }
        })
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| (*s).to_string()).collect()
}
