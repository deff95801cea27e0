//! Tablewright: filter configuration and table export for rendered data explorers
//!
//! Tablewright drives a JavaScript-rendered data grid (filters, dropdowns,
//! multi-select splits, quick presets) through a declarative registry of
//! locators, then extracts the resulting table.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   TABLEWRIGHT Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Page       │    │ Filter     │    │ PageDriver │            │
//! │   │ Profile    │───►│ Controller │───►│ (chromium) │            │
//! │   │ (YAML)     │    │ + Exporter │    │            │            │
//! │   └────────────┘    └─────┬──────┘    └─────┬──────┘            │
//! │                           │  Document       │                   │
//! │                           └◄─ Snapshot ◄────┘                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "browser")]
//! # async fn run() -> tablewright::EngineResult<()> {
//! use tablewright::{BrowserConfig, ChromiumDriver, EngineConfig, ExportJob, PageProfile, Session};
//!
//! let profile = PageProfile::from_path("profiles/splits.yaml")?;
//! let driver = ChromiumDriver::launch(&BrowserConfig::default()).await?;
//! let mut session = Session::open(driver, profile, EngineConfig::default()).await?;
//!
//! session.configure_with("league", "NL", true).await?;
//! let path = session
//!     .export_to(&ExportJob::new().sorted_by("HR").reversed(true))
//!     .await?;
//! println!("wrote {}", path.display());
//! session.quit().await
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod chromium;
mod config;
mod controller;
mod driver;
mod exporter;
mod locator;
mod logging;
mod profile;
mod registry;
mod result;
mod retry;
mod session;
mod snapshot;
mod wait;

#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
pub use chromium::BrowserConfig;
pub use config::{EngineConfig, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS};
pub use controller::FilterController;
pub use driver::{Action, MockDriver, PageDriver};
pub use exporter::{
    default_export_path, export, read_table, ExportJob, SizeCap, Table, DEFAULT_OUTPUT_DIR,
    FILE_TIMESTAMP_FORMAT,
};
pub use locator::{Locator, DEFAULT_OPTION_SELECTOR};
pub use logging::{init_tracing, LoggingConfig};
pub use profile::{Markers, OverlaySpec, PageProfile, Setting, TableLayout};
pub use registry::{ControlKind, LocatorSet, QuerySpec, Registry, RegistryBuilder, Reveal};
pub use result::{EngineError, EngineResult};
pub use retry::{RetryPolicy, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS};
pub use session::Session;
pub use snapshot::{element_text, has_marker, DocumentSnapshot, FALSE_LABEL, TRUE_LABEL};
pub use wait::{
    poll_until, with_deadline, Condition, WaitOptions, WaitResult, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};
