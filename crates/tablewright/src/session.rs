//! Session lifecycle: one live page, from navigation to teardown.
//!
//! A session owns the driver, the page profile and the single document
//! snapshot. Operations run one at a time (`&mut self`); after [`Session::quit`]
//! every operation fails with [`EngineError::SessionClosed`].

use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::controller::FilterController;
use crate::driver::PageDriver;
use crate::exporter::{self, ExportJob, Table};
use crate::profile::PageProfile;
use crate::registry::{ControlKind, QuerySpec};
use crate::result::{EngineError, EngineResult};
use crate::snapshot::DocumentSnapshot;
use crate::wait::with_deadline;

/// A live page driven through its profile
#[derive(Debug)]
pub struct Session<D: PageDriver> {
    driver: Option<D>,
    profile: PageProfile,
    config: EngineConfig,
    snapshot: DocumentSnapshot,
}

impl<D: PageDriver> Session<D> {
    /// Navigate to the profile's address, take the first snapshot and apply
    /// the profile's startup settings
    ///
    /// The driver is closed when any of this fails.
    pub async fn open(driver: D, profile: PageProfile, config: EngineConfig) -> EngineResult<Self> {
        let mut session = Self {
            driver: Some(driver),
            profile,
            config,
            snapshot: DocumentSnapshot::empty(),
        };
        if let Err(err) = session.start().await {
            if let Err(close_err) = session.quit().await {
                debug!(error = %close_err, "closing driver after failed open");
            }
            return Err(err);
        }
        Ok(session)
    }

    async fn start(&mut self) -> EngineResult<()> {
        self.profile.validate()?;
        self.config.validate()?;
        self.navigate_home().await?;

        let startup = self.profile.startup.clone();
        for setting in &startup {
            self.configure_with(&setting.query, &setting.option, setting.autoupdate)
                .await?;
        }
        Ok(())
    }

    async fn navigate_home(&mut self) -> EngineResult<()> {
        let address = self.profile.address.clone();
        let timeout = self.config.navigation_timeout();
        let driver = self.driver.as_mut().ok_or(EngineError::SessionClosed)?;
        with_deadline(
            timeout,
            format!("navigation to {address}"),
            driver.navigate(&address),
        )
        .await?;
        info!(page = %self.profile.name, %address, "navigated");
        self.controller()?.refresh().await
    }

    fn controller(&mut self) -> EngineResult<FilterController<'_, D>> {
        let driver = self.driver.as_ref().ok_or(EngineError::SessionClosed)?;
        Ok(FilterController::new(
            driver,
            &self.profile,
            &self.config,
            &mut self.snapshot,
        ))
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.driver.is_some() {
            Ok(())
        } else {
            Err(EngineError::SessionClosed)
        }
    }

    /// Whether [`Session::quit`] has run
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    /// The page profile
    #[must_use]
    pub const fn profile(&self) -> &PageProfile {
        &self.profile
    }

    /// Snapshot as of the last refresh
    #[must_use]
    pub const fn snapshot(&self) -> &DocumentSnapshot {
        &self.snapshot
    }

    /// Registered query identifiers, in declaration order
    pub fn list_queries(&self) -> EngineResult<Vec<&str>> {
        self.ensure_open()?;
        Ok(self.profile.queries.list_queries())
    }

    /// Control kind of a query
    pub fn kind_of(&self, query: &str) -> EngineResult<ControlKind> {
        self.ensure_open()?;
        self.profile.queries.kind_of(query)
    }

    /// Option labels a query offers on the current snapshot
    pub fn list_options(&self, query: &str) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        let spec = self.profile.queries.get(query)?;
        self.snapshot.list_options(spec)
    }

    /// Current option(s) of a query on the current snapshot
    pub fn current_option(&self, query: &str) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        let spec = self.profile.queries.get(query)?;
        self.snapshot.current_option(spec, &self.profile.markers)
    }

    /// Quick preset identifiers
    pub fn list_presets(&self) -> EngineResult<Vec<&str>> {
        self.ensure_open()?;
        Ok(self
            .profile
            .queries
            .of_kind(ControlKind::QuickPreset)
            .map(QuerySpec::name)
            .collect())
    }

    /// Set a query without applying filters
    pub async fn configure(&mut self, query: &str, option: &str) -> EngineResult<()> {
        self.configure_with(query, option, false).await
    }

    /// Set a query, optionally clicking the apply-filters control
    pub async fn configure_with(
        &mut self,
        query: &str,
        option: &str,
        autoupdate: bool,
    ) -> EngineResult<()> {
        self.controller()?.configure(query, option, autoupdate).await
    }

    /// Click a quick preset and apply it
    pub async fn apply_preset(&mut self, preset: &str) -> EngineResult<()> {
        if self.kind_of(preset)? != ControlKind::QuickPreset {
            return Err(EngineError::unknown_query(preset));
        }
        self.configure_with(preset, "", true).await
    }

    /// Click the apply-filters control when present, then refresh
    pub async fn update(&mut self) -> EngineResult<bool> {
        let mut ctl = self.controller()?;
        ctl.dismiss_overlay().await;
        let clicked = ctl.apply_filters().await?;
        ctl.refresh().await?;
        Ok(clicked)
    }

    /// Click the reset-filters control when the profile names one
    pub async fn reset_filters(&mut self) -> EngineResult<bool> {
        let mut ctl = self.controller()?;
        let clicked = ctl.reset_filters().await?;
        if clicked {
            ctl.refresh().await?;
        }
        Ok(clicked)
    }

    /// Replace the snapshot with the page's current markup
    pub async fn refresh(&mut self) -> EngineResult<()> {
        self.controller()?.refresh().await
    }

    /// Size, sort and read the result table
    pub async fn export(&mut self, job: &ExportJob) -> EngineResult<Table> {
        let mut ctl = self.controller()?;
        exporter::export(&mut ctl, job).await
    }

    /// Export and write the table as CSV, returning the file written
    pub async fn export_to(&mut self, job: &ExportJob) -> EngineResult<PathBuf> {
        let table = self.export(job).await?;
        let path = job.output_path();
        table.save(&path)?;
        info!(path = %path.display(), rows = table.len(), "table written");
        Ok(path)
    }

    /// Navigate back to the canonical address and refresh
    pub async fn reset(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        info!(page = %self.profile.name, "reset");
        self.navigate_home().await
    }

    /// Release the page and browser
    pub async fn quit(&mut self) -> EngineResult<()> {
        let mut driver = self.driver.take().ok_or(EngineError::SessionClosed)?;
        with_deadline(self.config.action_timeout(), "browser close", driver.close()).await?;
        info!(page = %self.profile.name, "session closed");
        Ok(())
    }
}
