//! Session lifecycle against the scripted leaderboard page.

#![allow(clippy::unwrap_used)]

mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{config, fixture_path, open, profile, FakePage, ADDRESS};
use tablewright::{
    init_tracing, Action, ControlKind, EngineConfig, EngineError, EngineResult, ExportJob,
    Locator, LoggingConfig, PageDriver, PageProfile, RetryPolicy, Session, WaitOptions,
};

/// Page that loads but never hands back its markup
#[derive(Debug, Default)]
struct StalledPage {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PageDriver for StalledPage {
    async fn navigate(&mut self, _url: &str) -> EngineResult<()> {
        Ok(())
    }

    async fn content(&self) -> EngineResult<String> {
        std::future::pending().await
    }

    async fn interact(&self, _: &Locator, _: usize, _: Action) -> EngineResult<()> {
        Ok(())
    }

    async fn current_url(&self) -> EngineResult<String> {
        Ok(ADDRESS.to_string())
    }

    async fn close(&mut self) -> EngineResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn open_navigates_and_applies_startup_settings() {
    let page = FakePage::new();
    let session = open(&page).await;

    assert_eq!(page.current_url().await.unwrap(), ADDRESS);
    assert_eq!(session.current_option("auto_pt").unwrap(), vec!["False"]);
    assert_eq!(page.state().updates, 1);
    assert!(session.snapshot().generation() >= 2);
}

#[tokio::test]
async fn queries_keep_declaration_order() {
    let page = FakePage::new();
    let session = open(&page).await;

    assert_eq!(
        session.list_queries().unwrap(),
        vec!["group", "league", "handedness", "auto_pt", "rookies", "vs_lhp", "home"]
    );
    assert_eq!(session.kind_of("league").unwrap(), ControlKind::Dropdown);
    assert_eq!(session.kind_of("handedness").unwrap(), ControlKind::MultiChoiceSplit);
    assert_eq!(session.kind_of("rookies").unwrap(), ControlKind::Checkbox);
}

#[tokio::test]
async fn reset_returns_to_canonical_address() {
    let page = FakePage::new();
    let mut session = open(&page).await;
    let before = session.snapshot().generation();
    page.state().url = "https://stats.example.test/elsewhere".to_string();

    session.reset().await.unwrap();

    assert_eq!(page.state().url, ADDRESS);
    assert!(session.snapshot().generation() > before);
    let navigations = page
        .state()
        .log
        .iter()
        .filter(|entry| entry.starts_with("navigate:"))
        .count();
    assert_eq!(navigations, 2);
}

#[tokio::test]
async fn quit_closes_page_and_session() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    session.quit().await.unwrap();

    assert!(page.state().closed);
    assert!(session.is_closed());
    assert!(matches!(
        session.configure("league", "NL").await,
        Err(EngineError::SessionClosed)
    ));
    assert!(matches!(
        session.export(&ExportJob::new()).await,
        Err(EngineError::SessionClosed)
    ));
    assert!(matches!(session.list_options("league"), Err(EngineError::SessionClosed)));
    assert!(matches!(session.list_presets(), Err(EngineError::SessionClosed)));
    assert!(matches!(session.update().await, Err(EngineError::SessionClosed)));
    assert!(matches!(session.reset().await, Err(EngineError::SessionClosed)));
    assert!(matches!(session.quit().await, Err(EngineError::SessionClosed)));
}

#[tokio::test]
async fn failed_startup_setting_fails_open() {
    let page = FakePage::new();
    let mut profile = profile();
    profile.startup[0].option = "Sometimes".to_string();

    let err = Session::open(page.clone(), profile, config(2)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOption { .. }));
    assert!(page.state().closed);
}

#[tokio::test]
async fn stalled_page_times_out_and_is_closed() {
    let page = StalledPage::default();
    let closed = Arc::clone(&page.closed);
    let config = EngineConfig::new()
        .with_retry(RetryPolicy::immediate(1))
        .with_wait(WaitOptions::new().with_timeout(100).with_poll_interval(5))
        .with_action_timeout(100)
        .with_navigation_timeout(100);

    let opened = tokio::time::timeout(
        Duration::from_secs(3),
        Session::open(page, profile(), config),
    )
    .await
    .unwrap();

    assert!(matches!(opened, Err(EngineError::Timeout { .. })));
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn fixture_profile_loads() {
    let profile = PageProfile::from_path(fixture_path()).unwrap();
    assert_eq!(profile.name, "splits-leaderboard");
    assert_eq!(profile.address, ADDRESS);
    assert_eq!(profile.queries.len(), 7);
    assert!(profile.overlay.is_some());
    profile.validate().unwrap();
}

#[test]
fn missing_profile_file_is_an_error() {
    let err = PageProfile::from_path(fixture_path().with_file_name("absent.yaml")).unwrap_err();
    assert!(matches!(err, EngineError::Io(_) | EngineError::Config { .. }));
}

#[test]
fn tracing_installs_once() {
    let config = LoggingConfig::default();
    let _ = init_tracing(&config);
    assert!(!init_tracing(&config));
}
