use thiserror::Error;

/// Main error type for netsample
#[derive(Error, Debug)]
pub enum NsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Trial failure: {0}")]
    Trial(#[from] TrialError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures raised while a dispatched trial is running
#[derive(Error, Debug)]
pub enum TrialError {
    #[error("Trial {trial} failed: {source}")]
    Failed {
        trial: usize,
        #[source]
        source: Box<NsError>,
    },

    #[error("Trial {trial} panicked: {message}")]
    Panicked { trial: usize, message: String },

    #[error("Trial batch timed out after {timeout_ms} ms ({completed}/{total} trials completed)")]
    Timeout {
        timeout_ms: u64,
        completed: usize,
        total: usize,
    },

    #[error("Worker pool disconnected before all results arrived")]
    WorkerDisconnected,
}

impl NsError {
    /// True for errors that were raised synchronously by argument or state checks.
    pub fn is_validation(&self) -> bool {
        matches!(self, NsError::Config(_) | NsError::State(_) | NsError::Validation(_))
    }
}

/// Result type alias for netsample operations
pub type NsResult<T> = Result<T, NsError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::NsError::Config(format!($($arg)*))
    };
}

/// Macro for creating state errors
#[macro_export]
macro_rules! state_error {
    ($($arg:tt)*) => {
        $crate::NsError::State(format!($($arg)*))
    };
}

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::NsError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::NsError::Internal(format!($($arg)*))
    };
}
