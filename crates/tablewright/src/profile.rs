//! Page profiles: everything page-specific the engine needs.
//!
//! A profile bundles the canonical address, the query registry, and the
//! handful of page-wide controls (overlay, apply-filters button, result
//! table). Profiles are data and load from YAML or JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::load_document;
use crate::locator::Locator;
use crate::registry::{ControlKind, Registry};
use crate::result::{EngineError, EngineResult};

/// Marker classes/attributes that flag the current option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Active selection button or switch
    pub active: String,
    /// Checked checkbox
    pub checked: String,
    /// Highlighted dropdown or split option
    pub highlighted: String,
    /// Reported when a dropdown has no highlighted option
    pub none_selected: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            active: "isActive".to_string(),
            checked: "checked".to_string(),
            highlighted: "highlight-selection".to_string(),
            none_selected: "None".to_string(),
        }
    }
}

impl Markers {
    /// Default marker for a control kind
    #[must_use]
    pub fn for_kind(&self, kind: ControlKind) -> &str {
        match kind {
            ControlKind::Selection | ControlKind::Switch | ControlKind::QuickPreset => &self.active,
            ControlKind::Checkbox => &self.checked,
            ControlKind::Dropdown | ControlKind::MultiChoiceSplit => &self.highlighted,
        }
    }
}

/// Transient overlay that may intercept clicks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySpec {
    /// Control closing the overlay
    pub close: Locator,
    /// Matches only while the overlay is already hidden
    #[serde(default)]
    pub hidden: Option<Locator>,
}

impl OverlaySpec {
    /// Overlay closed by `close`
    #[must_use]
    pub fn new(close: impl Into<Locator>) -> Self {
        Self {
            close: close.into(),
            hidden: None,
        }
    }

    /// Locator matching the hidden overlay
    #[must_use]
    pub fn with_hidden(mut self, hidden: impl Into<Locator>) -> Self {
        self.hidden = Some(hidden.into());
        self
    }
}

/// Where the result table and its controls live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    /// Header cells, in column order
    pub header_cells: Locator,
    /// Body rows
    pub body_rows: Locator,
    /// Cell selector within a body row
    pub cell: String,
    /// Row-count `<select>`
    pub size_select: Option<Locator>,
    /// Option selector within the row-count control
    pub size_options: String,
    /// Label of the "show all" row-count option
    pub unbounded_label: String,
    /// Hovered before export
    pub hover: Option<Locator>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            header_cells: Locator::new(".table-scroll thead tr th"),
            body_rows: Locator::new(".table-scroll tbody tr"),
            cell: "td".to_string(),
            size_select: Some(Locator::new(".table-page-control:nth-child(3) select")),
            size_options: "option".to_string(),
            unbounded_label: "Infinity".to_string(),
            hover: None,
        }
    }
}

impl TableLayout {
    /// Locator for every row-count option
    #[must_use]
    pub fn size_option_locator(&self) -> Option<Locator> {
        self.size_select
            .as_ref()
            .map(|select| select.descendant(&self.size_options))
    }

    fn locators(&self) -> impl Iterator<Item = &Locator> {
        [&self.header_cells, &self.body_rows]
            .into_iter()
            .chain(self.size_select.as_ref())
            .chain(self.hover.as_ref())
    }
}

/// A filter setting applied when a session opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Query identifier
    pub query: String,
    /// Option label
    pub option: String,
    /// Click the apply-filters control afterwards
    #[serde(default)]
    pub autoupdate: bool,
}

/// Page-specific configuration consumed by a session
#[derive(Debug, Clone, Deserialize)]
pub struct PageProfile {
    /// Human-readable name used in logs
    pub name: String,
    /// Canonical address
    pub address: String,
    /// Element that signals the page finished rendering
    #[serde(default)]
    pub ready: Option<Locator>,
    /// Interstitial overlay
    #[serde(default)]
    pub overlay: Option<OverlaySpec>,
    /// Explicit "apply filters" control
    #[serde(default)]
    pub update: Option<Locator>,
    /// Control clearing every filter
    #[serde(default)]
    pub reset_filters: Option<Locator>,
    /// Current-option markers
    #[serde(default)]
    pub markers: Markers,
    /// Result table
    #[serde(default)]
    pub table: TableLayout,
    /// Settings applied on open
    #[serde(default)]
    pub startup: Vec<Setting>,
    /// Filter queries
    pub queries: Registry,
}

impl PageProfile {
    /// Profile with default markers and table layout
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, queries: Registry) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ready: None,
            overlay: None,
            update: None,
            reset_filters: None,
            markers: Markers::default(),
            table: TableLayout::default(),
            startup: Vec::new(),
            queries,
        }
    }

    /// Set the readiness locator
    #[must_use]
    pub fn with_ready(mut self, ready: impl Into<Locator>) -> Self {
        self.ready = Some(ready.into());
        self
    }

    /// Set the overlay
    #[must_use]
    pub fn with_overlay(mut self, overlay: OverlaySpec) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Set the apply-filters control
    #[must_use]
    pub fn with_update(mut self, update: impl Into<Locator>) -> Self {
        self.update = Some(update.into());
        self
    }

    /// Set the reset-filters control
    #[must_use]
    pub fn with_reset_filters(mut self, reset: impl Into<Locator>) -> Self {
        self.reset_filters = Some(reset.into());
        self
    }

    /// Set the table layout
    #[must_use]
    pub fn with_table(mut self, table: TableLayout) -> Self {
        self.table = table;
        self
    }

    /// Set the markers
    #[must_use]
    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    /// Add a startup setting
    #[must_use]
    pub fn with_startup(mut self, query: &str, option: &str, autoupdate: bool) -> Self {
        self.startup.push(Setting {
            query: query.to_string(),
            option: option.to_string(),
            autoupdate,
        });
        self
    }

    /// Parse a YAML profile
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        let profile: Self = serde_yaml_ng::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Parse a JSON profile
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile file (`.json` as JSON, anything else as YAML)
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let profile: Self = load_document(path.as_ref())?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check page-wide locators and startup settings
    pub fn validate(&self) -> EngineResult<()> {
        if self.address.trim().is_empty() {
            return Err(EngineError::Config {
                message: format!("profile {} has no address", self.name),
            });
        }
        let overlay = self
            .overlay
            .iter()
            .flat_map(|o| std::iter::once(&o.close).chain(o.hidden.as_ref()));
        for locator in self
            .ready
            .iter()
            .chain(self.update.as_ref())
            .chain(self.reset_filters.as_ref())
            .chain(overlay)
            .chain(self.table.locators())
        {
            locator.compile()?;
        }
        for setting in &self.startup {
            self.queries.get(&setting.query)?;
        }
        Ok(())
    }
}
