//! Scripted leaderboard page for integration tests.
//!
//! `FakePage` renders markup from its state and reacts to interactions the
//! way the real grid does: an open overlay intercepts clicks, dropdown
//! options are hidden until the dropdown is revealed, filters apply when
//! the update button is clicked, and a header click cycles the sort.

#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tablewright::{
    Action, DocumentSnapshot, EngineConfig, EngineError, EngineResult, Locator, PageDriver,
    PageProfile, RetryPolicy, Session, WaitOptions,
};

pub const ADDRESS: &str = "https://stats.example.test/leaders/splits";

pub const GROUPS: [&str; 2] = ["Batting", "Pitching"];
pub const LEAGUES: [&str; 3] = ["All Leagues", "AL", "NL"];
pub const HANDS: [&str; 3] = ["vs L", "vs R", "vs S"];
pub const SIZES: [&str; 3] = ["2", "4", "Infinity"];
pub const HEADERS: [&str; 4] = ["#", "Name", "Team", "HR"];

const CLOSE: &str = ".ezmob-footer-close";
const OVERLAY_BY: &str = "div#ezmob-wrapper.ezmob-footer";

/// (name, team, league, home runs)
pub const PLAYERS: [(&str, &str, &str, u32); 5] = [
    ("Cal Raleigh", "SEA", "AL", 60),
    ("Aaron Judge", "NYY", "AL", 53),
    ("Kyle Schwarber", "PHI", "NL", 56),
    ("Shohei Ohtani", "LAD", "NL", 55),
    ("Eugenio Suarez", "ARI", "NL", 49),
];

#[derive(Debug, Clone)]
pub struct FakeState {
    pub url: String,
    pub overlay_open: bool,
    /// Overlay ignores its close control
    pub sticky_overlay: bool,
    /// Next N clicks pop the overlay up and get intercepted by it
    pub ambush: u32,
    pub group: usize,
    pub league: usize,
    pub applied_league: usize,
    pub hands: [bool; 3],
    pub auto_pt: bool,
    pub rookies: bool,
    pub open_menu: Option<&'static str>,
    pub size: usize,
    /// (column, descending)
    pub sort: Option<(usize, bool)>,
    pub ragged: bool,
    pub empty: bool,
    pub updates: u32,
    pub preset: Option<&'static str>,
    pub closed: bool,
    pub log: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            overlay_open: false,
            sticky_overlay: false,
            ambush: 0,
            group: 0,
            league: 0,
            applied_league: 0,
            hands: [false; 3],
            auto_pt: true,
            rookies: false,
            open_menu: None,
            size: 0,
            sort: None,
            ragged: false,
            empty: false,
            updates: 0,
            preset: None,
            closed: false,
            log: Vec::new(),
        }
    }
}

impl FakeState {
    fn reset_filters(&mut self) {
        self.group = 0;
        self.league = 0;
        self.applied_league = 0;
        self.hands = [false; 3];
        self.auto_pt = true;
        self.rookies = false;
        self.preset = None;
    }

    /// Rows currently shown by the grid, in display order
    pub fn visible_rows(&self) -> Vec<Vec<String>> {
        if self.empty {
            return Vec::new();
        }
        let mut players: Vec<(usize, &(&str, &str, &str, u32))> = PLAYERS
            .iter()
            .enumerate()
            .filter(|(_, p)| self.applied_league == 0 || p.2 == LEAGUES[self.applied_league])
            .collect();
        if let Some((column, descending)) = self.sort {
            players.sort_by(|a, b| {
                let ord = match column {
                    1 => a.1 .0.cmp(b.1 .0),
                    2 => a.1 .1.cmp(b.1 .1),
                    3 => a.1 .3.cmp(&b.1 .3),
                    _ => a.0.cmp(&b.0),
                };
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        let cap = SIZES[self.size].parse::<usize>().unwrap_or(usize::MAX);
        players
            .into_iter()
            .take(cap)
            .enumerate()
            .map(|(pos, (_, p))| {
                vec![
                    (pos + 1).to_string(),
                    p.0.to_string(),
                    p.1.to_string(),
                    p.3.to_string(),
                ]
            })
            .collect()
    }

    fn render(&self) -> String {
        let mut html = String::from("<html><body>\n");
        if self.overlay_open {
            html.push_str(
                "<div id=\"ezmob-wrapper\"><div class=\"ezmob-footer\"><span class=\"ezmob-footer-close\">x</span></div></div>\n",
            );
        } else {
            html.push_str("<div id=\"ezmob-wrapper\"><div style=\"display: none;\"></div></div>\n");
        }
        html.push_str("<div class=\"fg-data-grid\">\n<div id=\"groups\" class=\"fgBin row-button\">");
        for (i, label) in GROUPS.iter().enumerate() {
            let class = if i == self.group { "fgButton isActive" } else { "fgButton" };
            let _ = write!(html, "<div class=\"{class}\">{label}</div>");
        }
        html.push_str("</div>\n<div id=\"league\" class=\"fg-dropdown\"><div class=\"fg-selection-box\">League</div><ul>");
        for (i, label) in LEAGUES.iter().enumerate() {
            let class = if i == self.league { " class=\"highlight-selection\"" } else { "" };
            let _ = write!(html, "<li{class}>{label}</li>");
        }
        html.push_str("</ul></div>\n<div id=\"handedness\" class=\"fg-dropdown splits multi-choice\"><div class=\"fg-selection-box\">Handedness</div><ul>");
        for (i, label) in HANDS.iter().enumerate() {
            let class = if self.hands[i] { " class=\"highlight-selection\"" } else { "" };
            let _ = write!(html, "<li{class}>\n  {label}\n</li>");
        }
        let auto = if self.auto_pt { "fgButton isActive" } else { "fgButton" };
        let checked = if self.rookies { " checked" } else { "" };
        let _ = write!(
            html,
            "</ul></div>\n<div id=\"switches\"><div class=\"{auto}\">Auto PT</div></div>\n\
             <label><input id=\"rookies\" type=\"checkbox\"{checked}> Rookies</label>\n\
             <div id=\"quick\"><div class=\"fgButton\">vs LHP</div><div class=\"fgButton\">Home</div></div>\n\
             <div id=\"stack-buttons\"><div class=\"fgButton\">Save</div><div class=\"fgButton small\">Reset Filters</div></div>\n\
             <div id=\"button-update\" class=\"fgButton button-green\">Update</div>\n"
        );
        html.push_str("<div class=\"table-page-control\"><select>");
        for (i, label) in SIZES.iter().enumerate() {
            let selected = if i == self.size { " selected" } else { "" };
            let _ = write!(html, "<option value=\"{label}\"{selected}>{label}</option>");
        }
        html.push_str("</select></div>\n<div class=\"table-scroll\"><table><thead><tr>");
        for header in HEADERS {
            let _ = write!(html, "<th>{header}</th>");
        }
        html.push_str("</tr></thead><tbody>\n");
        for (r, row) in self.visible_rows().iter().enumerate() {
            html.push_str("<tr>");
            let cells = if self.ragged && r == 1 { &row[..row.len() - 1] } else { &row[..] };
            for cell in cells {
                let _ = write!(html, "<td>{cell}</td>");
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</tbody></table></div>\n</div>\n</body></html>\n");
        html
    }

    fn apply(&mut self, locator: &str, index: usize, action: Action) -> EngineResult<()> {
        let not_interactable = || EngineError::NotInteractable {
            locator: locator.to_string(),
            index,
        };
        match (locator, action) {
            (CLOSE, Action::Click) => {
                if !self.sticky_overlay {
                    self.overlay_open = false;
                }
            }
            ("#league" | "#handedness", Action::Hover | Action::Click) => {
                self.open_menu = Some(if locator == "#league" { "#league" } else { "#handedness" });
            }
            ("#league ul li", Action::Click) => {
                if self.open_menu != Some("#league") {
                    return Err(not_interactable());
                }
                self.league = index;
                self.open_menu = None;
            }
            ("#handedness ul li", Action::Click) => {
                if self.open_menu != Some("#handedness") {
                    return Err(not_interactable());
                }
                self.hands[index] = !self.hands[index];
                self.open_menu = None;
            }
            ("#groups > div:nth-child(1)", Action::Click) => self.group = 0,
            ("#groups > div:nth-child(2)", Action::Click) => self.group = 1,
            ("#switches > div:nth-child(1)", Action::Click) => self.auto_pt = !self.auto_pt,
            ("#rookies", Action::Click) => self.rookies = !self.rookies,
            ("#quick > div:nth-child(1)", Action::Click) => {
                self.preset = Some("vs LHP");
                self.hands = [true, false, false];
            }
            ("#quick > div:nth-child(2)", Action::Click) => self.preset = Some("Home"),
            ("#button-update", Action::Click) => {
                self.updates += 1;
                self.applied_league = self.league;
            }
            ("#stack-buttons div[class='fgButton small']:nth-last-child(1)", Action::Click) => {
                self.reset_filters();
            }
            (".table-page-control select option", Action::Select) => self.size = index,
            (".table-scroll thead tr th", Action::Click) => {
                self.sort = match self.sort {
                    Some((column, false)) if column == index => Some((index, true)),
                    _ => Some((index, false)),
                };
            }
            _ => {}
        }
        Ok(())
    }
}

/// Shared handle to the scripted page
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: FakeState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn markup(&self) -> String {
        self.state().render()
    }

    pub fn clicks_on(&self, locator: &str) -> usize {
        let prefix = format!("click:{locator}[");
        self.state()
            .log
            .iter()
            .filter(|entry| entry.starts_with(&prefix))
            .count()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&mut self, url: &str) -> EngineResult<()> {
        let mut state = self.state();
        state.log.push(format!("navigate:{url}"));
        state.url = url.to_string();
        state.open_menu = None;
        state.sort = None;
        state.size = 0;
        Ok(())
    }

    async fn content(&self) -> EngineResult<String> {
        Ok(self.markup())
    }

    async fn interact(&self, locator: &Locator, index: usize, action: Action) -> EngineResult<()> {
        let mut state = self.state();
        state.log.push(format!("{action}:{locator}[{index}]"));
        let present = DocumentSnapshot::parse(&state.render()).count(locator)?;
        if present <= index {
            return Err(EngineError::ElementNotFound {
                locator: locator.to_string(),
                index,
            });
        }
        if action != Action::Select && locator.as_str() != CLOSE {
            if state.ambush > 0 {
                state.ambush -= 1;
                state.overlay_open = true;
            }
            if state.overlay_open {
                return Err(EngineError::Intercepted {
                    locator: locator.to_string(),
                    by: OVERLAY_BY.to_string(),
                });
            }
        }
        state.apply(locator.as_str(), index, action)
    }

    async fn current_url(&self) -> EngineResult<String> {
        Ok(self.state().url.clone())
    }

    async fn close(&mut self) -> EngineResult<()> {
        let mut state = self.state();
        state.closed = true;
        state.log.push("close".to_string());
        Ok(())
    }
}

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("leaderboard.yaml")
}

pub fn profile() -> PageProfile {
    PageProfile::from_path(fixture_path()).unwrap()
}

/// Fast retries and short waits
pub fn config(attempts: u32) -> EngineConfig {
    EngineConfig::new()
        .with_retry(RetryPolicy::immediate(attempts))
        .with_wait(WaitOptions::new().with_timeout(200).with_poll_interval(1))
}

pub async fn open(page: &FakePage) -> Session<FakePage> {
    Session::open(page.clone(), profile(), config(5)).await.unwrap()
}

/// Sort helper for comparing exported rows
pub fn by_column(rows: &[Vec<String>], column: usize, numeric: bool) -> Vec<Vec<String>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        if numeric {
            let x: u32 = a[column].parse().unwrap();
            let y: u32 = b[column].parse().unwrap();
            x.cmp(&y)
        } else {
            a[column].cmp(&b[column])
        }
    });
    sorted
}
