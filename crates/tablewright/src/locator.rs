//! Locator expressions for finding page elements.
//!
//! A locator is an opaque CSS selector handed to the automation backend and
//! to the document snapshot. Locators never resolve to a single element by
//! themselves: every interaction names the match position it targets, which
//! is how enumerated option lists are addressed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{EngineError, EngineResult};

/// Default descendant selector enumerating the options of a container control
pub const DEFAULT_OPTION_SELECTOR: &str = "ul li";

/// A CSS locator for one or more elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Create a locator from a CSS selector
    #[must_use]
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    /// The raw selector text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Locator for descendants of this locator's matches
    ///
    /// `Locator::new("#league").descendant("ul li")` selects `#league ul li`.
    /// Selector lists are combined part by part, so `"#a, #b"` with `"li"`
    /// becomes `"#a li, #b li"`.
    #[must_use]
    pub fn descendant(&self, child: &str) -> Self {
        let children = split_selector_list(child);
        if children.is_empty() {
            return self.clone();
        }
        let combined: Vec<String> = split_selector_list(&self.0)
            .into_iter()
            .flat_map(|root| children.iter().map(move |c| format!("{root} {c}")))
            .collect();
        Self(combined.join(", "))
    }

    /// Parse into a selector usable against a document snapshot
    pub fn compile(&self) -> EngineResult<scraper::Selector> {
        scraper::Selector::parse(&self.0).map_err(|e| EngineError::InvalidLocator {
            locator: self.0.clone(),
            message: format!("{e:?}"),
        })
    }

    /// JavaScript expression resolving the match at `index` (or `undefined`)
    #[must_use]
    pub fn to_query(&self, index: usize) -> String {
        format!("document.querySelectorAll({})[{index}]", self.js_literal())
    }

    /// JavaScript expression counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("document.querySelectorAll({}).length", self.js_literal())
    }

    fn js_literal(&self) -> String {
        // A JSON string literal is a valid JS string literal.
        serde_json::Value::String(self.0.clone()).to_string()
    }
}

/// Split a selector list on its top-level commas
///
/// Commas inside parentheses, brackets or quotes belong to a single
/// selector (`:is(a, b)`, `[title='a, b']`).
fn split_selector_list(css: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in css.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(css[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(css[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(css: &str) -> Self {
        Self::new(css)
    }
}

impl From<String> for Locator {
    fn from(css: String) -> Self {
        Self(css)
    }
}
