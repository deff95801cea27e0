//! Document Snapshot: an immutable parse of the page markup.
//!
//! Filter state is never cached by the engine. Every question about the
//! current option is answered from the latest snapshot, and a snapshot is
//! replaced wholesale (never patched) when the caller refreshes it.

use scraper::{ElementRef, Html};

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::profile::Markers;
use crate::registry::{ControlKind, LocatorSet, QuerySpec};
use crate::result::{EngineError, EngineResult};

/// Label reported by a toggle that carries its marker
pub const TRUE_LABEL: &str = "True";

/// Label reported by a toggle without its marker
pub const FALSE_LABEL: &str = "False";

/// Point-in-time parse of rendered markup
#[derive(Debug)]
pub struct DocumentSnapshot {
    html: Html,
    generation: u64,
}

impl Default for DocumentSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocumentSnapshot {
    /// Parse a full document
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            generation: 0,
        }
    }

    /// Snapshot of an empty document, used before the first capture
    #[must_use]
    pub fn empty() -> Self {
        Self::parse("")
    }

    /// Snapshot superseding this one
    #[must_use]
    pub fn successor(&self, markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            generation: self.generation + 1,
        }
    }

    /// Capture the driver's current markup as the successor of `self`
    pub async fn capture<D>(&self, driver: &D) -> EngineResult<Self>
    where
        D: PageDriver + ?Sized,
    {
        let markup = driver.content().await?;
        Ok(self.successor(&markup))
    }

    /// How many refreshes produced this snapshot
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// All matches, in document order
    pub fn select(&self, locator: &Locator) -> EngineResult<Vec<ElementRef<'_>>> {
        let selector = locator.compile()?;
        Ok(self.html.select(&selector).collect())
    }

    /// Number of matches
    pub fn count(&self, locator: &Locator) -> EngineResult<usize> {
        let selector = locator.compile()?;
        Ok(self.html.select(&selector).count())
    }

    /// Text of every match
    pub fn texts(&self, locator: &Locator) -> EngineResult<Vec<String>> {
        Ok(self.select(locator)?.into_iter().map(element_text).collect())
    }

    /// Option shown by a `<select>`: the `selected` option, else the first
    pub fn selected_label(&self, select: &Locator) -> EngineResult<Option<String>> {
        let selected = self.texts(&select.descendant("option[selected]"))?;
        if let Some(label) = selected.into_iter().next() {
            return Ok(Some(label));
        }
        Ok(self.texts(&select.descendant("option"))?.into_iter().next())
    }

    /// Option labels of a query, in index order
    ///
    /// Toggles always list `["True", "False"]` and presets list nothing.
    pub fn list_options(&self, spec: &QuerySpec) -> EngineResult<Vec<String>> {
        if spec.kind().is_toggle() {
            return Ok(vec![TRUE_LABEL.to_string(), FALSE_LABEL.to_string()]);
        }
        if spec.kind() == ControlKind::QuickPreset {
            return Ok(Vec::new());
        }
        Ok(self
            .option_elements(spec)?
            .into_iter()
            .map(element_text)
            .collect())
    }

    /// Currently marked option(s) of a query
    ///
    /// A selection must have exactly one active option. A dropdown without a
    /// highlighted option reports the none-selected sentinel.
    pub fn current_option(&self, spec: &QuerySpec, markers: &Markers) -> EngineResult<Vec<String>> {
        let marker = spec.marker().unwrap_or_else(|| markers.for_kind(spec.kind()));
        match spec.kind() {
            ControlKind::QuickPreset => Ok(Vec::new()),
            ControlKind::Checkbox | ControlKind::Switch => {
                let LocatorSet::Single(locator) = spec.locators() else {
                    return Err(EngineError::consistency(spec.name(), "toggle without a single locator"));
                };
                let element = self.select(locator)?.into_iter().next().ok_or_else(|| {
                    EngineError::consistency(spec.name(), format!("{locator} is not on the page"))
                })?;
                let label = if has_marker(element, marker) {
                    TRUE_LABEL
                } else {
                    FALSE_LABEL
                };
                Ok(vec![label.to_string()])
            }
            kind => {
                let marked: Vec<String> = self
                    .option_elements(spec)?
                    .into_iter()
                    .filter(|el| has_marker(*el, marker))
                    .map(element_text)
                    .collect();
                match kind {
                    ControlKind::Selection if marked.len() != 1 => Err(EngineError::consistency(
                        spec.name(),
                        format!("expected exactly one {marker} option, found {}", marked.len()),
                    )),
                    ControlKind::Dropdown if marked.is_empty() => {
                        Ok(vec![markers.none_selected.clone()])
                    }
                    _ => Ok(marked),
                }
            }
        }
    }

    fn option_elements(&self, spec: &QuerySpec) -> EngineResult<Vec<ElementRef<'_>>> {
        match spec.locators() {
            LocatorSet::Enumerated(list) => list
                .iter()
                .enumerate()
                .map(|(i, locator)| {
                    self.select(locator)?.into_iter().next().ok_or_else(|| {
                        EngineError::consistency(
                            spec.name(),
                            format!("option {i} ({locator}) is not on the page"),
                        )
                    })
                })
                .collect(),
            LocatorSet::Container { options, .. } => self.select(options),
            LocatorSet::Single(locator) => self.select(locator),
        }
    }
}

/// Element text with runs of whitespace collapsed
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the element has `marker` as a class or as an attribute
#[must_use]
pub fn has_marker(element: ElementRef<'_>, marker: &str) -> bool {
    let value = element.value();
    value.classes().any(|class| class == marker) || value.attr(marker).is_some()
}
