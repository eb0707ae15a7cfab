//! Error taxonomy for descriptor construction, data generation and execution.

use std::time::Duration;

/// Result type used across the workload crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error returned by the orchestrator and initialization code
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl Error {
    /// Errors that must stop a run before any traffic is issued
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Execution(_))
    }
}

/// A descriptor tree, script or configuration file is not usable
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("malformed descriptor: {0}")]
    Malformed(String),

    #[error("no SQL statement named `{query}` for workload `{workload}`")]
    UnresolvedReference { workload: String, query: String },

    #[error("{kind} `{path}` not found")]
    NotFound { kind: &'static str, path: String },

    #[error("query `{query}` references unknown parameter `{placeholder}`")]
    UnknownPlaceholder { query: String, placeholder: String },

    #[error("group `{group}` member `{param}` has no enumerable domain")]
    NotEnumerable { group: String, param: String },

    #[error("load `{load}` requests {requested} rows but `{source_name}` can only produce {domain} unique values")]
    RowCountExceedsDomain {
        load: String,
        source_name: String,
        requested: u64,
        domain: u64,
    },

    #[error("invalid inline hint `{hint}`: {reason}")]
    InvalidHint { hint: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigurationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn not_found(kind: &'static str, path: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            path: path.into(),
        }
    }
}

/// A generator cannot produce another value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generator `{generator}` exhausted its range after {emitted} values")]
    RangeExhausted { generator: String, emitted: u64 },

    #[error("generator `{generator}` cannot produce more than {domain} unique values")]
    InsufficientDomain { generator: String, domain: u64 },
}

/// Failure reported by a driver implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    #[error("failed to execute SQL: {0}")]
    Execute(String),

    #[error("failed to insert rows: {0}")]
    Insert(String),

    #[error("driver not available: {0}")]
    NotAvailable(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// A unit failed while running steady-state traffic
#[derive(Debug, Clone, thiserror::Error)]
#[error("unit `{unit}` failed: {source}")]
pub struct ExecutionError {
    pub unit: String,
    #[source]
    pub source: DriverError,
}

/// A setup phase failed; the run is aborted before traffic starts
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("schema step `{step}` failed on unit `{unit}`: {source}")]
    Schema {
        step: String,
        unit: String,
        #[source]
        source: DriverError,
    },

    #[error("load `{load}` failed: {source}")]
    Load {
        load: String,
        #[source]
        source: DriverError,
    },

    #[error("load `{load}` inserted {inserted} of {expected} rows")]
    ShortLoad {
        load: String,
        expected: u64,
        inserted: u64,
    },

    #[error("generation failed in `{step}`: {source}")]
    Generation {
        step: String,
        #[source]
        source: GenerationError,
    },

    #[error("phase {phase} cannot run after {current}")]
    OutOfOrder { phase: String, current: String },

    #[error("scenario `{scenario}` worker failed: {message}")]
    Worker { scenario: String, message: String },
}
