// petribench - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every configurable limit has a default plus an absolute bound that the
// config loader validates against.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "petribench";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "petribench";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Input / output roots
// =============================================================================

/// Default directory holding one event log per process.
pub const DEFAULT_LOGS_ROOT: &str = "resource/log/pre-processed";

/// Default directory holding one subdirectory per discovery approach.
pub const DEFAULT_MODELS_ROOT: &str = "resource/model";

/// Default directory receiving one result table per process.
pub const DEFAULT_RESULTS_ROOT: &str = "resource/results";

// =============================================================================
// Discovery
// =============================================================================

/// Default include glob patterns for event log discovery (filename only).
pub const DEFAULT_LOG_PATTERNS: &[&str] = &["*.xes", "*.xes.gz"];

/// Default file extension of approach model files.
pub const DEFAULT_MODEL_EXTENSION: &str = "pnml";

/// Separator between the process name and the rest of a log file name.
/// `p1.xes.gz` belongs to process `p1`.
pub const PROCESS_NAME_SEPARATOR: char = '.';

// =============================================================================
// Event log attributes
// =============================================================================

/// XES event attribute carrying the activity name.
pub const ACTIVITY_KEY: &str = "concept:name";

/// Transition labels treated as silent (glob patterns), on top of the
/// transitions the PNML itself marks invisible. Empty by default: a labelled
/// transition is visible unless the configuration opts in, e.g. with
/// `["tau", "tau_*"]` for exporters that name silent steps.
pub const DEFAULT_SILENT_LABEL_PATTERNS: &[&str] = &[];

// =============================================================================
// Result tables
// =============================================================================

/// Extension of per-process result tables.
pub const RESULT_TABLE_EXTENSION: &str = "csv";

/// Fixed column order of every result table.
pub const RESULT_COLUMNS: [&str; 6] = [
    "name",
    "fitness",
    "precision",
    "f-score",
    "generalization",
    "simplicity",
];

// =============================================================================
// Alignment costs
// =============================================================================

/// Cost of a log move or a visible model move.
pub const STD_MOVE_COST: u64 = 10_000;

/// Cost of a model move on a silent transition.
pub const TAU_MOVE_COST: u64 = 1;

/// Cost of a synchronous move.
pub const SYNC_MOVE_COST: u64 = 0;

/// Offset subtracted from the mean arc degree in the simplicity metric.
pub const SIMPLICITY_DEGREE_OFFSET: f64 = 0.0;

// =============================================================================
// Analysis limits
// =============================================================================

/// Default number of worker threads. 0 means one per available CPU.
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on configurable worker threads.
pub const ABSOLUTE_MAX_WORKER_THREADS: usize = 256;

/// Default cap on reachable markings explored by the soundness check.
pub const DEFAULT_MAX_STATES: usize = 100_000;

/// Default cap on search states explored for a single alignment.
pub const DEFAULT_MAX_ALIGNMENT_STATES: usize = 200_000;

/// Minimum sensible value for either state cap.
pub const MIN_STATE_LIMIT: usize = 10;

/// Hard upper bound on either state cap (prevents runaway memory use).
pub const ABSOLUTE_MAX_STATE_LIMIT: usize = 50_000_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted values for `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name, looked up in the working directory first and
/// then in the platform configuration directory.
pub const CONFIG_FILE_NAME: &str = "petribench.toml";
