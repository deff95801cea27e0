//! Filter Controller: turns a `(query, option)` request into page interactions.
//!
//! Every interaction goes through one hook that first dismisses the overlay
//! when it is showing, and through one bounded retry loop that absorbs
//! intercepted or not-yet-interactable clicks. Filter state is always read
//! back from the snapshot; the controller caches nothing.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::driver::{Action, PageDriver};
use crate::locator::Locator;
use crate::profile::{OverlaySpec, PageProfile};
use crate::registry::{ControlKind, LocatorSet, QuerySpec};
use crate::result::{EngineError, EngineResult};
use crate::snapshot::{DocumentSnapshot, FALSE_LABEL, TRUE_LABEL};
use crate::wait::{with_deadline, Condition};

/// One driver interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Step {
    pub locator: Locator,
    pub index: usize,
    pub action: Action,
}

impl Step {
    pub fn new(locator: Locator, index: usize, action: Action) -> Self {
        Self {
            locator,
            index,
            action,
        }
    }
}

/// Interaction sequence that lands one option
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Gesture {
    reveal: Option<Step>,
    target: Step,
    expand: Option<Locator>,
}

impl Gesture {
    pub fn on(target: Step) -> Self {
        Self {
            reveal: None,
            target,
            expand: None,
        }
    }

    pub fn click(locator: Locator, index: usize) -> Self {
        Self::on(Step::new(locator, index, Action::Click))
    }

    fn revealed_by(mut self, reveal: Step) -> Self {
        self.reveal = Some(reveal);
        self
    }

    fn expanded_by(mut self, expand: Option<&Locator>) -> Self {
        self.expand = expand.cloned();
        self
    }
}

/// Position of `option` among `options`: exact match first, then ignoring case
pub(crate) fn resolve_index(options: &[String], option: &str) -> Option<usize> {
    let wanted = option.trim();
    options
        .iter()
        .position(|o| o == wanted)
        .or_else(|| {
            let lowered = wanted.to_lowercase();
            options.iter().position(|o| o.to_lowercase() == lowered)
        })
}

fn toggle_label(option: &str) -> Option<&'static str> {
    let option = option.trim();
    if option.eq_ignore_ascii_case(TRUE_LABEL) {
        Some(TRUE_LABEL)
    } else if option.eq_ignore_ascii_case(FALSE_LABEL) {
        Some(FALSE_LABEL)
    } else {
        None
    }
}

/// Drives one page for the duration of an operation
///
/// Borrows the session's driver, profile and configuration, and owns the
/// snapshot exclusively until the operation ends.
#[derive(Debug)]
pub struct FilterController<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    profile: &'a PageProfile,
    config: &'a EngineConfig,
    snapshot: &'a mut DocumentSnapshot,
}

impl<'a, D: PageDriver + ?Sized> FilterController<'a, D> {
    /// Controller over a live page and its current snapshot
    pub fn new(
        driver: &'a D,
        profile: &'a PageProfile,
        config: &'a EngineConfig,
        snapshot: &'a mut DocumentSnapshot,
    ) -> Self {
        Self {
            driver,
            profile,
            config,
            snapshot,
        }
    }

    /// The snapshot as of the last refresh
    pub fn snapshot(&self) -> &DocumentSnapshot {
        self.snapshot
    }

    pub(crate) const fn driver(&self) -> &'a D {
        self.driver
    }

    pub(crate) const fn profile(&self) -> &'a PageProfile {
        self.profile
    }

    pub(crate) const fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Wait for the page to be ready, then replace the snapshot
    pub async fn refresh(&mut self) -> EngineResult<()> {
        if let Some(ready) = &self.profile.ready {
            self.driver
                .wait_for(&Condition::Present(ready.clone()), &self.config.wait)
                .await?;
        }
        let next = with_deadline(
            self.config.action_timeout(),
            "page content",
            self.snapshot.capture(self.driver),
        )
        .await?;
        *self.snapshot = next;
        debug!(generation = self.snapshot.generation(), "snapshot refreshed");
        Ok(())
    }

    /// Close the overlay if it is showing. Never fails.
    pub async fn dismiss_overlay(&self) {
        let Some(overlay) = &self.profile.overlay else {
            return;
        };
        let showing = with_deadline(
            self.config.action_timeout(),
            "overlay visibility",
            self.overlay_showing(overlay),
        );
        match showing.await {
            Ok(false) => {}
            Ok(true) => match self.act(&overlay.close, 0, Action::Click).await {
                Ok(()) => debug!(close = %overlay.close, "overlay dismissed"),
                Err(err) => debug!(error = %err, "overlay dismissal failed"),
            },
            Err(err) => debug!(error = %err, "overlay check failed"),
        }
    }

    async fn overlay_showing(&self, overlay: &OverlaySpec) -> EngineResult<bool> {
        if let Some(hidden) = &overlay.hidden {
            if self.driver.count(hidden).await? > 0 {
                return Ok(false);
            }
        }
        self.driver.is_visible(&overlay.close, 0).await
    }

    async fn act(&self, locator: &Locator, index: usize, action: Action) -> EngineResult<()> {
        debug!(%locator, index, %action, "interact");
        with_deadline(
            self.config.action_timeout(),
            format!("{action} on {locator}[{index}]"),
            self.driver.interact(locator, index, action),
        )
        .await
    }

    async fn run(&self, gesture: &Gesture, expand_first: bool) -> EngineResult<()> {
        if expand_first {
            if let Some(expand) = &gesture.expand {
                self.act(expand, 0, Action::Click).await?;
            }
        }
        if let Some(reveal) = &gesture.reveal {
            self.act(&reveal.locator, reveal.index, reveal.action).await?;
        }
        let target = &gesture.target;
        self.act(&target.locator, target.index, target.action).await
    }

    /// Run a gesture, retrying transient failures within the retry budget
    ///
    /// Before each retry the overlay is dismissed and, when the option was
    /// reported not interactable, the gesture's expand control is clicked.
    pub(crate) async fn perform(&self, subject: &str, gesture: &Gesture) -> EngineResult<()> {
        let policy = self.config.retry;
        let mut attempts = 0;
        let mut expand_first = false;
        loop {
            attempts += 1;
            match self.run(gesture, expand_first).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() => {
                    if !policy.allows_retry(attempts) {
                        return Err(EngineError::InteractionBlocked {
                            target: subject.to_string(),
                            attempts,
                            last: err.to_string(),
                        });
                    }
                    warn!(subject, attempts, error = %err, "interaction obstructed, retrying");
                    expand_first = matches!(err, EngineError::NotInteractable { .. });
                    tokio::time::sleep(policy.delay_for(attempts)).await;
                    self.dismiss_overlay().await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Click the apply-filters control if the page shows one
    ///
    /// Returns whether the control was clicked.
    pub async fn apply_filters(&self) -> EngineResult<bool> {
        let Some(update) = &self.profile.update else {
            return Ok(false);
        };
        let present = with_deadline(
            self.config.action_timeout(),
            format!("presence of {update}"),
            self.driver.count(update),
        )
        .await?;
        if present == 0 {
            debug!(%update, "no apply-filters control on page");
            return Ok(false);
        }
        self.perform("update", &Gesture::click(update.clone(), 0)).await?;
        Ok(true)
    }

    /// Click the reset-filters control if the profile names one
    pub async fn reset_filters(&self) -> EngineResult<bool> {
        let Some(reset) = &self.profile.reset_filters else {
            return Ok(false);
        };
        self.dismiss_overlay().await;
        self.perform("reset_filters", &Gesture::click(reset.clone(), 0))
            .await?;
        Ok(true)
    }

    /// Set `query` to `option`, then refresh the snapshot
    ///
    /// Toggles and already-highlighted split options are left alone when
    /// they are in the requested state. Selections and dropdowns are always
    /// re-clicked. A quick preset ignores `option`.
    ///
    /// Once a plan exists the snapshot is refreshed even when an interaction
    /// fails; the first failure is returned after the refresh.
    pub async fn configure(&mut self, query: &str, option: &str, autoupdate: bool) -> EngineResult<()> {
        let profile = self.profile;
        let spec = profile.queries.get(query)?;
        debug!(query = spec.name(), kind = %spec.kind(), option, "configure");

        self.dismiss_overlay().await;
        let gesture = self.plan(spec, option)?;
        let landed = self.land(spec, gesture.as_ref(), autoupdate).await;
        let refreshed = self.refresh().await;
        if let (Err(_), Err(err)) = (&landed, &refreshed) {
            warn!(query = spec.name(), error = %err, "refresh after failed configure");
        }
        landed.and(refreshed)
    }

    /// Run the planned gesture and its follow-up steps
    ///
    /// Submit and apply-filters still run when an earlier follow-up fails,
    /// and the first error wins.
    async fn land(&self, spec: &QuerySpec, gesture: Option<&Gesture>, autoupdate: bool) -> EngineResult<()> {
        let mut first_err = None;
        match gesture {
            Some(gesture) => {
                self.perform(spec.name(), gesture).await?;
                if let Some(submit) = spec.submit() {
                    if let Err(err) = self
                        .perform(spec.name(), &Gesture::click(submit.clone(), 0))
                        .await
                    {
                        first_err = Some(err);
                    }
                }
            }
            None => debug!(query = spec.name(), "already in requested state"),
        }
        if autoupdate {
            if let Err(err) = self.apply_filters().await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn plan(&self, spec: &QuerySpec, option: &str) -> EngineResult<Option<Gesture>> {
        let invalid = || EngineError::InvalidOption {
            query: spec.name().to_string(),
            option: option.to_string(),
        };
        let kind = spec.kind();
        if kind == ControlKind::QuickPreset || kind.is_toggle() {
            let LocatorSet::Single(locator) = spec.locators() else {
                return Err(EngineError::consistency(spec.name(), "expected a single locator"));
            };
            if kind.is_toggle() {
                let wanted = toggle_label(option).ok_or_else(invalid)?;
                let current = self.snapshot.current_option(spec, &self.profile.markers)?;
                if current.first().map(String::as_str) == Some(wanted) {
                    return Ok(None);
                }
            }
            return Ok(Some(Gesture::click(locator.clone(), 0)));
        }

        let options = self.snapshot.list_options(spec)?;
        let index = resolve_index(&options, option).ok_or_else(invalid)?;
        if kind == ControlKind::MultiChoiceSplit {
            let current = self.snapshot.current_option(spec, &self.profile.markers)?;
            if current.contains(&options[index]) {
                return Ok(None);
            }
        }
        let gesture = match spec.locators() {
            LocatorSet::Enumerated(list) => list
                .get(index)
                .map(|locator| Gesture::click(locator.clone(), 0))
                .ok_or_else(invalid)?,
            LocatorSet::Container { options, .. } if kind == ControlKind::Selection => {
                Gesture::click(options.clone(), index)
            }
            LocatorSet::Container { root, options } => Gesture::click(options.clone(), index)
                .revealed_by(Step::new(root.clone(), 0, spec.reveal().action())),
            LocatorSet::Single(locator) => Gesture::click(locator.clone(), index),
        };
        Ok(Some(gesture.expanded_by(spec.expand())))
    }
}
