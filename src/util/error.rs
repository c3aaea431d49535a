// petribench - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every error keeps the path or unit it concerns so a logged message is
// actionable without extra context.

use crate::util::constants;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all petribench operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum PetriBenchError {
    /// Input discovery failed.
    Discovery(DiscoveryError),

    /// The worker pool could not be created.
    ThreadPool { source: rayon::ThreadPoolBuildError },

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for PetriBenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::ThreadPool { source } => write!(f, "Cannot start worker pool: {source}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for PetriBenchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Discovery(e) => Some(e),
            Self::ThreadPool { source } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

/// Errors related to event log and Petri net import.
#[derive(Debug)]
pub enum ImportError {
    /// The input file does not exist.
    NotFound { path: PathBuf },

    /// The path is not valid UTF-8 and cannot be handed to the parser.
    InvalidPath { path: PathBuf },

    /// The XES parser rejected the file.
    Xes { path: PathBuf, reason: String },

    /// The PNML parser rejected the file.
    Pnml { path: PathBuf, reason: String },

    /// The net parsed but its structure cannot be analysed.
    InvalidNet { path: PathBuf, reason: String },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => write!(f, "'{}' does not exist", path.display()),
            Self::InvalidPath { path } => {
                write!(f, "'{}' is not a valid UTF-8 path", path.display())
            }
            Self::Xes { path, reason } => {
                write!(f, "Failed to parse XES log '{}': {reason}", path.display())
            }
            Self::Pnml { path, reason } => {
                write!(f, "Failed to parse PNML net '{}': {reason}", path.display())
            }
            Self::InvalidNet { path, reason } => {
                write!(f, "Petri net '{}' is invalid: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ImportError {}

// ---------------------------------------------------------------------------
// Soundness errors
// ---------------------------------------------------------------------------

/// Reasons a Petri net is rejected by the soundness gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundnessError {
    /// The net is not a workflow net (source/sink/connectivity).
    NotWorkflowNet { reason: String },

    /// Some reachable marking strictly covers one of its predecessors.
    Unbounded,

    /// A transition can never fire from the initial marking.
    DeadTransition { transition: String },

    /// The final marking cannot be reached from some reachable marking.
    NoOptionToComplete,

    /// A reachable marking marks the sink place alongside other tokens.
    ImproperCompletion,

    /// The reachability graph grew beyond the configured limit.
    StateLimitExceeded { limit: usize },
}

impl fmt::Display for SoundnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotWorkflowNet { reason } => write!(f, "not a workflow net: {reason}"),
            Self::Unbounded => write!(f, "net is unbounded"),
            Self::DeadTransition { transition } => {
                write!(f, "transition '{transition}' is dead")
            }
            Self::NoOptionToComplete => {
                write!(f, "final marking is not reachable from every reachable marking")
            }
            Self::ImproperCompletion => write!(f, "net does not complete properly"),
            Self::StateLimitExceeded { limit } => write!(
                f,
                "state space exceeds {limit} markings. \
                 Increase [analysis] max_states in config to analyse this net."
            ),
        }
    }
}

impl std::error::Error for SoundnessError {}

// ---------------------------------------------------------------------------
// Result store errors
// ---------------------------------------------------------------------------

/// Errors related to per-process result tables.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error creating, opening or writing a table.
    Io { path: PathBuf, source: io::Error },

    /// CSV reading or serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// The table exists but has no `name` column.
    MissingNameColumn { path: PathBuf },

    /// The table header differs from the fixed result columns.
    HeaderMismatch { path: PathBuf, found: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Result table I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "Result table CSV error '{}': {source}", path.display())
            }
            Self::MissingNameColumn { path } => write!(
                f,
                "Result table '{}' has no 'name' column",
                path.display()
            ),
            Self::HeaderMismatch { path, found } => write!(
                f,
                "Result table '{}' has header '{found}', expected '{}'",
                path.display(),
                constants::RESULT_COLUMNS.join(",")
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::MissingNameColumn { .. } | Self::HeaderMismatch { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to discovery of logs and approach directories.
#[derive(Debug)]
pub enum DiscoveryError {
    /// A root directory does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// A root path is not a directory.
    NotADirectory { path: PathBuf },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Directory '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "'{}' is not a directory", path.display())
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<DiscoveryError> for PetriBenchError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
