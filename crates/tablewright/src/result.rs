//! Result and error types for Tablewright.

use thiserror::Error;

/// Result type for Tablewright operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum EngineError {
    /// Query identifier is not registered for the page
    #[error("Unknown filter query: {query}")]
    UnknownQuery {
        /// Requested query identifier
        query: String,
    },

    /// Option is not offered by the query
    #[error("Invalid option {option:?} for filter query {query}")]
    InvalidOption {
        /// Query identifier
        query: String,
        /// Requested option label
        option: String,
    },

    /// Sort column is not among the table headers
    #[error("Unknown table column {column:?} (headers: {available:?})")]
    UnknownColumn {
        /// Requested column
        column: String,
        /// Header labels found on the page
        available: Vec<String>,
    },

    /// Retry budget exhausted while an overlay kept intercepting input
    #[error("Interaction with {target} blocked after {attempts} attempts: {last}")]
    InteractionBlocked {
        /// Query or control being driven
        target: String,
        /// Attempts made
        attempts: u32,
        /// Last transient failure
        last: String,
    },

    /// Page structure no longer matches the declared locator contract
    #[error("Consistency violation for {subject}: {message}")]
    ConsistencyViolation {
        /// Query or table part being read
        subject: String,
        /// What was found instead
        message: String,
    },

    /// A body row does not have one cell per header
    #[error("Row {row} has {found} cells, expected {expected}")]
    RowShapeMismatch {
        /// Zero-based row position
        row: usize,
        /// Header count
        expected: usize,
        /// Cell count in the row
        found: usize,
    },

    /// Session was torn down
    #[error("Session closed")]
    SessionClosed,

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Click landed on a different element
    #[error("Click on {locator} intercepted by {by}")]
    Intercepted {
        /// Locator that was targeted
        locator: String,
        /// Element that received the click
        by: String,
    },

    /// Element exists but cannot receive input
    #[error("Element {locator}[{index}] is not interactable")]
    NotInteractable {
        /// Locator that was targeted
        locator: String,
        /// Match position
        index: usize,
    },

    /// No element at the requested match position
    #[error("No element matches {locator}[{index}]")]
    ElementNotFound {
        /// Locator that was targeted
        locator: String,
        /// Match position
        index: usize,
    },

    /// Locator is not a valid selector expression
    #[error("Invalid locator {locator:?}: {message}")]
    InvalidLocator {
        /// Offending locator
        locator: String,
        /// Parser message
        message: String,
    },

    /// Query declaration does not fit its control kind
    #[error("Invalid registry entry {query}: {message}")]
    InvalidRegistry {
        /// Query identifier
        query: String,
        /// Error message
        message: String,
    },

    /// Query identifier declared twice
    #[error("Duplicate filter query: {query}")]
    DuplicateQuery {
        /// Query identifier
        query: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    /// Whether the failure is a transient obstruction worth retrying
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Intercepted { .. } | Self::NotInteractable { .. })
    }

    pub(crate) fn unknown_query(query: &str) -> Self {
        Self::UnknownQuery {
            query: query.to_string(),
        }
    }

    pub(crate) fn consistency(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConsistencyViolation {
            subject: subject.into(),
            message: message.into(),
        }
    }
}
