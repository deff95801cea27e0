//! PageDriver - the browser-automation capability boundary.
//!
//! The engine never controls a browser itself. It consumes four
//! capabilities from a driver: navigate, capture the current markup, find
//! and interact with an element, and wait for a condition.
//!
//! # Implementations
//!
//! - `ChromiumDriver` - Chrome DevTools Protocol via chromiumoxide (feature `browser`)
//! - `MockDriver` - Fixed markup with scripted interceptions, for unit testing

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::locator::Locator;
use crate::result::{EngineError, EngineResult};
use crate::snapshot::DocumentSnapshot;
use crate::wait::{poll_until, Condition, WaitOptions, WaitResult};

/// Interaction performed on a located element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Pointer click at the element's centre
    Click,
    /// Pointer moved over the element
    Hover,
    /// Choose an `<option>` in its parent `<select>`
    Select,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Click => "click",
            Self::Hover => "hover",
            Self::Select => "select",
        })
    }
}

/// Abstract driver trait for browser automation
///
/// Implementations report a click that lands on another element as
/// [`EngineError::Intercepted`] and a hidden target as
/// [`EngineError::NotInteractable`]; the filter controller retries those.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load event
    async fn navigate(&mut self, url: &str) -> EngineResult<()>;

    /// Serialized markup of the current document
    async fn content(&self) -> EngineResult<String>;

    /// Perform `action` on match `index` of `locator`
    async fn interact(&self, locator: &Locator, index: usize, action: Action) -> EngineResult<()>;

    /// Get current URL
    async fn current_url(&self) -> EngineResult<String>;

    /// Release the page and browser
    async fn close(&mut self) -> EngineResult<()>;

    /// Number of matches
    async fn count(&self, locator: &Locator) -> EngineResult<usize> {
        let markup = self.content().await?;
        DocumentSnapshot::parse(&markup).count(locator)
    }

    /// Whether match `index` is rendered and visible
    async fn is_visible(&self, locator: &Locator, index: usize) -> EngineResult<bool> {
        Ok(self.count(locator).await? > index)
    }

    /// Evaluate a condition once
    async fn check(&self, condition: &Condition) -> EngineResult<bool> {
        match condition {
            Condition::Present(locator) => Ok(self.count(locator).await? > 0),
            Condition::Visible(locator) => self.is_visible(locator, 0).await,
            Condition::Hidden(locator) => Ok(!self.is_visible(locator, 0).await?),
            Condition::Selected { select, label } => {
                let markup = self.content().await?;
                let selected = DocumentSnapshot::parse(&markup).selected_label(select)?;
                Ok(selected.as_deref() == Some(label.as_str()))
            }
        }
    }

    /// Poll a condition until it holds or the timeout elapses
    async fn wait_for(
        &self,
        condition: &Condition,
        options: &WaitOptions,
    ) -> EngineResult<WaitResult> {
        poll_until(options, condition.to_string(), || self.check(condition)).await
    }
}

/// Mock driver for unit testing
///
/// Serves fixed markup. The next `n` clicks or hovers can be made to fail
/// as intercepted, which exercises the overlay retry path.
#[derive(Debug, Default)]
pub struct MockDriver {
    markup: String,
    current_url: String,
    pending_interceptions: AtomicU32,
    call_history: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Create new mock driver serving `markup`
    #[must_use]
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            current_url: "about:blank".to_string(),
            ..Self::default()
        }
    }

    /// Fail the next `count` pointer interactions as intercepted
    #[must_use]
    pub fn with_interceptions(self, count: u32) -> Self {
        self.pending_interceptions.store(count, Ordering::SeqCst);
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Check if a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.call_history.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> EngineResult<()> {
        self.record(format!("navigate:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    async fn content(&self) -> EngineResult<String> {
        Ok(self.markup.clone())
    }

    async fn interact(&self, locator: &Locator, index: usize, action: Action) -> EngineResult<()> {
        self.record(format!("{action}:{locator}[{index}]"));
        if action != Action::Select
            && self
                .pending_interceptions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(EngineError::Intercepted {
                locator: locator.to_string(),
                by: "div#mock-overlay".to_string(),
            });
        }
        if DocumentSnapshot::parse(&self.markup).count(locator)? <= index {
            return Err(EngineError::ElementNotFound {
                locator: locator.to_string(),
                index,
            });
        }
        Ok(())
    }

    async fn current_url(&self) -> EngineResult<String> {
        Ok(self.current_url.clone())
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}
