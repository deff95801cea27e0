//! Table export against the scripted leaderboard page.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use common::{by_column, open, FakePage, FakeState, HEADERS, PLAYERS};
use tablewright::{EngineError, ExportJob, SizeCap};

fn names(rows: &[Vec<String>]) -> Vec<String> {
    rows.iter().map(|row| row[1].clone()).collect()
}

#[tokio::test]
async fn unbounded_export_returns_every_row() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let table = session.export(&ExportJob::new()).await.unwrap();

    assert_eq!(table.headers, HEADERS.to_vec());
    assert_eq!(table.len(), PLAYERS.len());
    assert!(table.rows.iter().all(|row| row.len() == HEADERS.len()));
    assert_eq!(page.state().size, 2);
}

#[tokio::test]
async fn offered_size_cap_limits_rows() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let table = session.export(&ExportJob::new().with_size(4)).await.unwrap();
    assert_eq!(table.len(), 4);
}

#[tokio::test]
async fn size_cap_not_offered_falls_back_to_unbounded() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let table = session.export(&ExportJob::new().with_size(3)).await.unwrap();
    assert_eq!(table.len(), PLAYERS.len());

    let table = session
        .export(&ExportJob::new().with_size(SizeCap::from(0)))
        .await
        .unwrap();
    assert_eq!(table.len(), PLAYERS.len());
}

#[tokio::test]
async fn reverse_sort_is_ascending_order_reversed() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let ascending = session
        .export(&ExportJob::new().sorted_by("Name"))
        .await
        .unwrap();
    assert_eq!(names(&ascending.rows), names(&by_column(&ascending.rows, 1, false)));
    assert_eq!(page.clicks_on(".table-scroll thead tr th"), 1);

    session.reset().await.unwrap();
    let descending = session
        .export(&ExportJob::new().sorted_by("name").reversed(true))
        .await
        .unwrap();

    let mut expected = names(&ascending.rows);
    expected.reverse();
    assert_eq!(names(&descending.rows), expected);
    assert_eq!(page.clicks_on(".table-scroll thead tr th"), 3);
}

#[tokio::test]
async fn numeric_column_sorts_by_value() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let table = session
        .export(&ExportJob::new().sorted_by("HR").reversed(true))
        .await
        .unwrap();

    assert_eq!(table.rows[0][1], "Cal Raleigh");
    let mut expected = by_column(&table.rows, 3, true);
    expected.reverse();
    assert_eq!(names(&table.rows), names(&expected));
}

#[tokio::test]
async fn unknown_sort_column_lists_headers() {
    let page = FakePage::new();
    let mut session = open(&page).await;

    let err = session
        .export(&ExportJob::new().sorted_by("WAR"))
        .await
        .unwrap_err();

    match err {
        EngineError::UnknownColumn { column, available } => {
            assert_eq!(column, "WAR");
            assert_eq!(available, HEADERS.to_vec());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_result_set_keeps_headers() {
    let page = FakePage::with_state(FakeState {
        empty: true,
        ..FakeState::default()
    });
    let mut session = open(&page).await;

    let table = session.export(&ExportJob::new()).await.unwrap();
    assert_eq!(table.headers, HEADERS.to_vec());
    assert!(table.is_empty());
}

#[tokio::test]
async fn ragged_row_is_rejected() {
    let page = FakePage::with_state(FakeState {
        ragged: true,
        ..FakeState::default()
    });
    let mut session = open(&page).await;

    let err = session.export(&ExportJob::new()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::RowShapeMismatch { row: 1, expected: 4, found: 3 }
    ));
}

#[tokio::test]
async fn export_reflects_applied_filters() {
    let page = FakePage::new();
    let mut session = open(&page).await;
    session.configure_with("league", "NL", true).await.unwrap();

    let table = session.export(&ExportJob::new()).await.unwrap();

    let nl: Vec<&str> = PLAYERS
        .iter()
        .filter(|p| p.2 == "NL")
        .map(|p| p.1)
        .collect();
    assert_eq!(table.len(), nl.len());
    let teams = table.column("Team").unwrap();
    assert!(teams.iter().all(|team| nl.contains(team)));
}

#[tokio::test]
async fn export_dismisses_overlay() {
    let page = FakePage::new();
    let mut session = open(&page).await;
    page.state().overlay_open = true;

    let table = session
        .export(&ExportJob::new().sorted_by("Team"))
        .await
        .unwrap();

    assert_eq!(table.len(), PLAYERS.len());
    assert!(page.clicks_on(".ezmob-footer-close") >= 1);
    assert!(!page.state().overlay_open);
}

#[tokio::test]
async fn export_to_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("leaders.csv");
    let page = FakePage::new();
    let mut session = open(&page).await;

    let written = session
        .export_to(&ExportJob::new().with_destination(&target))
        .await
        .unwrap();

    assert_eq!(written, target);
    let text = std::fs::read_to_string(&written).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("#,Name,Team,HR"));
    assert_eq!(lines.count(), PLAYERS.len());
}

#[tokio::test]
async fn export_to_directory_uses_timestamp_name() {
    let dir = tempfile::tempdir().unwrap();
    let page = FakePage::new();
    let mut session = open(&page).await;

    let written = session
        .export_to(&ExportJob::new().with_size(2).with_destination(dir.path()))
        .await
        .unwrap();

    assert_eq!(written.parent(), Some(dir.path()));
    assert_eq!(written.extension().and_then(|e| e.to_str()), Some("csv"));
    let mut reader = csv::Reader::from_path(&written).unwrap();
    assert_eq!(reader.records().count(), 2);
}
