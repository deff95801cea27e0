//! Wait mechanisms for synchronizing with an asynchronously rendering page.
//!
//! Every suspend point in the engine is bounded: conditions are polled until
//! a deadline, and single driver calls run under [`with_deadline`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::locator::Locator;
use crate::result::{EngineError, EngineResult};

/// Default timeout for wait operations (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Page condition a caller can wait for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one element matches
    Present(Locator),
    /// The first match is rendered and visible
    Visible(Locator),
    /// No match is visible
    Hidden(Locator),
    /// The `<select>` matched by the locator shows the given option text
    Selected {
        /// The select element
        select: Locator,
        /// Expected option label
        label: String,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(loc) => write!(f, "presence of {loc}"),
            Self::Visible(loc) => write!(f, "visibility of {loc}"),
            Self::Hidden(loc) => write!(f, "hiding of {loc}"),
            Self::Selected { select, label } => write!(f, "{select} to show {label:?}"),
        }
    }
}

/// Result of a wait operation
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of checks made
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `check` until it reports `true` or the timeout elapses.
///
/// Check errors abort the wait immediately. Each check runs under the time
/// left on the deadline, so a check that never resolves still times out.
pub async fn poll_until<F, Fut>(
    options: &WaitOptions,
    waited_for: impl Into<String>,
    mut check: F,
) -> EngineResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<bool>>,
{
    let waited_for = waited_for.into();
    let start = Instant::now();
    let mut polls = 0;

    loop {
        polls += 1;
        let remaining = options.timeout().saturating_sub(start.elapsed());
        let Ok(outcome) = tokio::time::timeout(remaining, check()).await else {
            return Err(EngineError::Timeout {
                ms: options.timeout_ms,
                waited_for,
            });
        };
        if outcome? {
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                polls,
                waited_for,
            });
        }
        if start.elapsed() >= options.timeout() {
            return Err(EngineError::Timeout {
                ms: options.timeout_ms,
                waited_for,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Run a future under a deadline, mapping expiry to [`EngineError::Timeout`]
pub async fn with_deadline<T, Fut>(
    timeout: Duration,
    what: impl fmt::Display,
    future: Fut,
) -> EngineResult<T>
where
    Fut: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waited_for: what.to_string(),
        }),
    }
}
