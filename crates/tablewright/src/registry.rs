//! Locator Registry: the declarative description of a page's filter queries.
//!
//! Each query is tagged with a [`ControlKind`] that decides both how its
//! options are read from a snapshot and how it is driven on the live page.
//! Registries are plain data; a page variant is a registry, not new code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::driver::Action;
use crate::locator::{Locator, DEFAULT_OPTION_SELECTOR};
use crate::result::{EngineError, EngineResult};

/// Category of interactive control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Mutually exclusive tab/button group
    Selection,
    /// Single-choice list revealed on interaction
    Dropdown,
    /// Binary toggle backed by a form checkbox
    Checkbox,
    /// Binary toggle rendered as a button
    Switch,
    /// Dropdown allowing several highlighted options at once
    #[serde(alias = "split")]
    MultiChoiceSplit,
    /// One-shot composite action without a current option
    #[serde(alias = "quick_split")]
    QuickPreset,
}

impl ControlKind {
    /// Binary toggles read as "True"/"False"
    #[must_use]
    pub const fn is_toggle(self) -> bool {
        matches!(self, Self::Checkbox | Self::Switch)
    }

    /// Kinds whose options are addressed by position
    #[must_use]
    pub const fn is_indexable(self) -> bool {
        matches!(
            self,
            Self::Selection | Self::Dropdown | Self::MultiChoiceSplit
        )
    }

    /// Stable name used in configuration files and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::Switch => "switch",
            Self::MultiChoiceSplit => "multi_choice_split",
            Self::QuickPreset => "quick_preset",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a collapsed control is opened before its options can be clicked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reveal {
    /// Move the pointer over the control
    #[default]
    Hover,
    /// Click the control
    Click,
}

impl Reveal {
    /// Driver action performing the reveal
    #[must_use]
    pub const fn action(self) -> Action {
        match self {
            Self::Hover => Action::Hover,
            Self::Click => Action::Click,
        }
    }
}

/// Locators attached to a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorSet {
    /// One locator per option; position is the option index
    Enumerated(Vec<Locator>),
    /// A container whose descendants enumerate the options
    Container {
        /// The control itself (revealed before option clicks)
        root: Locator,
        /// All option elements, in document order
        options: Locator,
    },
    /// A single interactive element
    Single(Locator),
}

impl LocatorSet {
    fn locators(&self) -> Vec<&Locator> {
        match self {
            Self::Enumerated(list) => list.iter().collect(),
            Self::Container { root, options } => vec![root, options],
            Self::Single(loc) => vec![loc],
        }
    }
}

/// A registered filter query
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "QueryDecl")]
pub struct QuerySpec {
    name: String,
    kind: ControlKind,
    locators: LocatorSet,
    reveal: Reveal,
    expand: Option<Locator>,
    submit: Option<Locator>,
    marker: Option<String>,
}

impl QuerySpec {
    fn with_set(name: &str, kind: ControlKind, locators: LocatorSet) -> Self {
        Self {
            name: name.to_lowercase(),
            kind,
            locators,
            reveal: Reveal::default(),
            expand: None,
            submit: None,
            marker: None,
        }
    }

    fn container(root: impl Into<Locator>) -> LocatorSet {
        let root = root.into();
        let options = root.descendant(DEFAULT_OPTION_SELECTOR);
        LocatorSet::Container { root, options }
    }

    /// Selection whose options are one locator each
    #[must_use]
    pub fn selection<I, L>(name: &str, locators: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Locator>,
    {
        let list = locators.into_iter().map(Into::into).collect();
        Self::with_set(name, ControlKind::Selection, LocatorSet::Enumerated(list))
    }

    /// Selection whose options are the `ul li` descendants of a container
    #[must_use]
    pub fn selection_group(name: &str, root: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::Selection, Self::container(root))
    }

    /// Dropdown with `ul li` options
    #[must_use]
    pub fn dropdown(name: &str, root: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::Dropdown, Self::container(root))
    }

    /// Multi-choice split dropdown with `ul li` options
    #[must_use]
    pub fn split(name: &str, root: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::MultiChoiceSplit, Self::container(root))
    }

    /// Checkbox toggle
    #[must_use]
    pub fn checkbox(name: &str, locator: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::Checkbox, LocatorSet::Single(locator.into()))
    }

    /// Button-style switch toggle
    #[must_use]
    pub fn switch(name: &str, locator: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::Switch, LocatorSet::Single(locator.into()))
    }

    /// Quick preset button
    #[must_use]
    pub fn preset(name: &str, locator: impl Into<Locator>) -> Self {
        Self::with_set(name, ControlKind::QuickPreset, LocatorSet::Single(locator.into()))
    }

    /// Replace the descendant selector enumerating a container's options
    #[must_use]
    pub fn with_options(mut self, selector: &str) -> Self {
        if let LocatorSet::Container { root, options } = &mut self.locators {
            *options = root.descendant(selector);
        }
        self
    }

    /// Set how the control is opened
    #[must_use]
    pub const fn with_reveal(mut self, reveal: Reveal) -> Self {
        self.reveal = reveal;
        self
    }

    /// Control clicked when an option is hidden in a collapsed sub-level
    #[must_use]
    pub fn with_expand(mut self, locator: impl Into<Locator>) -> Self {
        self.expand = Some(locator.into());
        self
    }

    /// Control clicked after the query's own interaction
    #[must_use]
    pub fn with_submit(mut self, locator: impl Into<Locator>) -> Self {
        self.submit = Some(locator.into());
        self
    }

    /// Override the marker class/attribute signalling the current option
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Lower-cased query identifier
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control kind
    #[must_use]
    pub const fn kind(&self) -> ControlKind {
        self.kind
    }

    /// Attached locators
    #[must_use]
    pub const fn locators(&self) -> &LocatorSet {
        &self.locators
    }

    /// Reveal mode for container controls
    #[must_use]
    pub const fn reveal(&self) -> Reveal {
        self.reveal
    }

    /// Sub-level expand control
    #[must_use]
    pub const fn expand(&self) -> Option<&Locator> {
        self.expand.as_ref()
    }

    /// Submit control
    #[must_use]
    pub const fn submit(&self) -> Option<&Locator> {
        self.submit.as_ref()
    }

    /// Marker override
    #[must_use]
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    fn invalid(&self, message: impl Into<String>) -> EngineError {
        EngineError::InvalidRegistry {
            query: self.name.clone(),
            message: message.into(),
        }
    }

    /// Check that the locator shape fits the kind and every locator parses
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("empty query identifier"));
        }
        let shape_ok = match (&self.kind, &self.locators) {
            (ControlKind::Selection | ControlKind::MultiChoiceSplit, LocatorSet::Enumerated(list)) => {
                !list.is_empty()
            }
            (
                ControlKind::Selection | ControlKind::MultiChoiceSplit | ControlKind::Dropdown,
                LocatorSet::Container { .. },
            ) => true,
            (
                ControlKind::Checkbox | ControlKind::Switch | ControlKind::QuickPreset,
                LocatorSet::Single(_),
            ) => true,
            _ => false,
        };
        if !shape_ok {
            return Err(self.invalid(format!(
                "locator set does not fit a {} control",
                self.kind
            )));
        }
        if self.expand.is_some() && self.kind != ControlKind::Selection {
            return Err(self.invalid("only selections take an expand control"));
        }
        for locator in self
            .locators
            .locators()
            .into_iter()
            .chain(self.expand.as_ref())
            .chain(self.submit.as_ref())
        {
            locator.compile()?;
        }
        Ok(())
    }
}

/// Query as written in a profile file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryDecl {
    name: String,
    kind: ControlKind,
    #[serde(default)]
    locator: Option<Locator>,
    #[serde(default)]
    locators: Vec<Locator>,
    #[serde(default)]
    options: Option<String>,
    #[serde(default)]
    reveal: Option<Reveal>,
    #[serde(default)]
    expand: Option<Locator>,
    #[serde(default)]
    submit: Option<Locator>,
    #[serde(default)]
    marker: Option<String>,
}

impl TryFrom<QueryDecl> for QuerySpec {
    type Error = EngineError;

    fn try_from(decl: QueryDecl) -> EngineResult<Self> {
        let invalid = |message: &str| EngineError::InvalidRegistry {
            query: decl.name.clone(),
            message: message.to_string(),
        };
        let set = match (decl.locator.clone(), decl.locators.is_empty()) {
            (Some(_), false) => return Err(invalid("give either `locator` or `locators`, not both")),
            (None, true) => return Err(invalid("missing `locator`")),
            (None, false) => LocatorSet::Enumerated(decl.locators.clone()),
            (Some(root), true) if decl.kind.is_indexable() => {
                let child = decl.options.as_deref().unwrap_or(DEFAULT_OPTION_SELECTOR);
                LocatorSet::Container {
                    options: root.descendant(child),
                    root,
                }
            }
            (Some(single), true) => LocatorSet::Single(single),
        };
        let spec = Self {
            name: decl.name.to_lowercase(),
            kind: decl.kind,
            locators: set,
            reveal: decl.reveal.unwrap_or_default(),
            expand: decl.expand,
            submit: decl.submit,
            marker: decl.marker,
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Immutable mapping from query identifier to its declaration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<QuerySpec>")]
pub struct Registry {
    entries: Vec<QuerySpec>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Build a registry, rejecting duplicates and malformed entries
    pub fn new(specs: impl IntoIterator<Item = QuerySpec>) -> EngineResult<Self> {
        let mut registry = Self::default();
        for spec in specs {
            spec.validate()?;
            if registry.index.contains_key(spec.name()) {
                return Err(EngineError::DuplicateQuery {
                    query: spec.name().to_string(),
                });
            }
            registry
                .index
                .insert(spec.name().to_string(), registry.entries.len());
            registry.entries.push(spec);
        }
        Ok(registry)
    }

    /// Start an empty builder
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Query identifiers in declaration order
    #[must_use]
    pub fn list_queries(&self) -> Vec<&str> {
        self.entries.iter().map(QuerySpec::name).collect()
    }

    /// Look up a query, ignoring case
    pub fn get(&self, query: &str) -> EngineResult<&QuerySpec> {
        self.index
            .get(&query.to_lowercase())
            .map(|&i| &self.entries[i])
            .ok_or_else(|| EngineError::unknown_query(query))
    }

    /// Control kind of a query
    pub fn kind_of(&self, query: &str) -> EngineResult<ControlKind> {
        self.get(query).map(QuerySpec::kind)
    }

    /// Whether a query is registered
    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.index.contains_key(&query.to_lowercase())
    }

    /// Queries of one kind, in declaration order
    pub fn of_kind(&self, kind: ControlKind) -> impl Iterator<Item = &QuerySpec> {
        self.entries.iter().filter(move |spec| spec.kind() == kind)
    }

    /// All declarations
    pub fn iter(&self) -> impl Iterator<Item = &QuerySpec> {
        self.entries.iter()
    }

    /// Number of queries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<QuerySpec>> for Registry {
    type Error = EngineError;

    fn try_from(specs: Vec<QuerySpec>) -> EngineResult<Self> {
        Self::new(specs)
    }
}

/// Builder collecting query declarations
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    specs: Vec<QuerySpec>,
}

impl RegistryBuilder {
    /// Add a query
    #[must_use]
    pub fn query(mut self, spec: QuerySpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate and freeze
    pub fn build(self) -> EngineResult<Registry> {
        Registry::new(self.specs)
    }
}
