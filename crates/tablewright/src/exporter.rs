//! Table Exporter: row-count, sort and extraction of the result grid.

use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::controller::{FilterController, Gesture, Step};
use crate::driver::{Action, PageDriver};
use crate::locator::Locator;
use crate::profile::TableLayout;
use crate::result::{EngineError, EngineResult};
use crate::snapshot::{element_text, DocumentSnapshot};
use crate::wait::Condition;

/// Directory used when an export has no destination
pub const DEFAULT_OUTPUT_DIR: &str = "out";

/// `chrono` format of generated file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%d.%m.%y %H.%M.%S";

/// Row-count cap requested from the grid's size control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeCap {
    /// The "show all" option
    #[default]
    Unbounded,
    /// A fixed number of rows
    Rows(u32),
}

impl SizeCap {
    /// Option label to look for in the size control
    #[must_use]
    pub fn label(self, unbounded_label: &str) -> String {
        match self {
            Self::Unbounded => unbounded_label.to_string(),
            Self::Rows(n) => n.to_string(),
        }
    }
}

impl From<u32> for SizeCap {
    /// Zero means the default cap, not an empty export
    fn from(rows: u32) -> Self {
        if rows == 0 {
            Self::Unbounded
        } else {
            Self::Rows(rows)
        }
    }
}

impl FromStr for SizeCap {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("infinity") || s.eq_ignore_ascii_case("unbounded") {
            return Ok(Self::Unbounded);
        }
        s.parse::<u32>().map(Self::from).map_err(|_| EngineError::Config {
            message: format!("invalid row-count cap {s:?}"),
        })
    }
}

impl fmt::Display for SizeCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Rows(n) => write!(f, "{n}"),
        }
    }
}

/// Parameters of one export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportJob {
    /// Row-count cap
    pub size: SizeCap,
    /// Header to sort by
    pub sort_by: Option<String>,
    /// Sort descending (second header click)
    pub reverse: bool,
    /// CSV file or directory to write into
    pub destination: Option<PathBuf>,
}

impl ExportJob {
    /// Unbounded, unsorted export
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row-count cap
    #[must_use]
    pub fn with_size(mut self, size: impl Into<SizeCap>) -> Self {
        self.size = size.into();
        self
    }

    /// Sort by a header; an empty name means no sort
    #[must_use]
    pub fn sorted_by(mut self, column: &str) -> Self {
        let column = column.trim();
        self.sort_by = (!column.is_empty()).then(|| column.to_string());
        self
    }

    /// Request descending order
    #[must_use]
    pub const fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Set the output file or directory
    #[must_use]
    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// File the export is written to
    ///
    /// A `.csv` destination is used as is. Any other destination is a
    /// directory that receives a timestamp-named file; without one the
    /// file goes to `out/`.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        match &self.destination {
            Some(path) if has_csv_extension(path) => path.clone(),
            Some(dir) => dir.join(timestamp_file_name()),
            None => default_export_path(),
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn timestamp_file_name() -> String {
    format!("{}.csv", Local::now().format(FILE_TIMESTAMP_FORMAT))
}

/// `out/<dd.mm.yy HH.MM.SS>.csv`
#[must_use]
pub fn default_export_path() -> PathBuf {
    Path::new(DEFAULT_OUTPUT_DIR).join(timestamp_file_name())
}

/// Exported grid: header labels and rows of cell text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Header labels, in column order
    pub headers: Vec<String>,
    /// Rows, each with one cell per header
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the result set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of one column, by header label
    #[must_use]
    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(index).map(String::as_str))
                .collect(),
        )
    }

    /// Write headers and rows as CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> EngineResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(&self.headers)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush()?;
        Ok(())
    }

    /// Write a CSV file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

/// Read header and body cell texts from a snapshot
///
/// Every body row must have one cell per header.
pub fn read_table(snapshot: &DocumentSnapshot, layout: &TableLayout) -> EngineResult<Table> {
    let headers = snapshot.texts(&layout.header_cells)?;
    let cell = Locator::new(layout.cell.as_str()).compile()?;
    let mut rows = Vec::new();
    for (row, element) in snapshot.select(&layout.body_rows)?.into_iter().enumerate() {
        let cells: Vec<String> = element.select(&cell).map(element_text).collect();
        if cells.len() != headers.len() {
            return Err(EngineError::RowShapeMismatch {
                row,
                expected: headers.len(),
                found: cells.len(),
            });
        }
        rows.push(cells);
    }
    Ok(Table { headers, rows })
}

/// Size option to select: the requested one, else the unbounded one
pub(crate) fn resolve_size_label(
    options: &[String],
    size: SizeCap,
    unbounded_label: &str,
) -> EngineResult<String> {
    let wanted = size.label(unbounded_label);
    if options.iter().any(|o| *o == wanted) {
        return Ok(wanted);
    }
    if options.iter().any(|o| o == unbounded_label) {
        debug!(%size, fallback = unbounded_label, "row-count option not offered");
        return Ok(unbounded_label.to_string());
    }
    Err(EngineError::consistency(
        "row-count control",
        format!("neither {wanted:?} nor {unbounded_label:?} is offered (options: {options:?})"),
    ))
}

/// Header position by case-normalized text
pub(crate) fn resolve_column(headers: &[String], column: &str) -> EngineResult<usize> {
    let wanted = column.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase() == wanted)
        .ok_or_else(|| EngineError::UnknownColumn {
            column: column.to_string(),
            available: headers.to_vec(),
        })
}

/// Header clicks for a sort direction
///
/// The grid's header only cycles ascending then descending, so descending
/// order is reached by clicking the header twice.
pub(crate) const fn sort_clicks(reverse: bool) -> usize {
    if reverse {
        2
    } else {
        1
    }
}

/// Size, sort, refresh and read the grid
pub async fn export<D>(ctl: &mut FilterController<'_, D>, job: &ExportJob) -> EngineResult<Table>
where
    D: PageDriver + ?Sized,
{
    let layout = &ctl.profile().table;
    if let Some(hover) = &layout.hover {
        let gesture = Gesture::on(Step::new(hover.clone(), 0, Action::Hover));
        if let Err(err) = ctl.perform("export", &gesture).await {
            debug!(error = %err, "export hover failed");
        }
    }
    ctl.dismiss_overlay().await;

    apply_size(ctl, layout, job.size).await?;
    if let Some(column) = &job.sort_by {
        apply_sort(ctl, layout, column, job.reverse).await?;
    }

    ctl.refresh().await?;
    let table = read_table(ctl.snapshot(), layout)?;
    info!(
        rows = table.len(),
        columns = table.headers.len(),
        sort = ?job.sort_by,
        reverse = job.reverse,
        "table exported"
    );
    Ok(table)
}

async fn apply_size<D>(
    ctl: &FilterController<'_, D>,
    layout: &TableLayout,
    size: SizeCap,
) -> EngineResult<()>
where
    D: PageDriver + ?Sized,
{
    let (Some(select), Some(option_locator)) = (&layout.size_select, layout.size_option_locator())
    else {
        return Ok(());
    };
    let options = ctl.snapshot().texts(&option_locator)?;
    if options.is_empty() && ctl.snapshot().count(select)? == 0 {
        debug!(%select, "no row-count control on page");
        return Ok(());
    }
    let label = resolve_size_label(&options, size, &layout.unbounded_label)?;
    let index = options.iter().position(|o| *o == label).unwrap_or_default();
    debug!(%label, index, "selecting row count");

    ctl.perform(
        "row-count control",
        &Gesture::on(Step::new(option_locator, index, Action::Select)),
    )
    .await?;
    ctl.driver()
        .wait_for(
            &Condition::Selected {
                select: select.clone(),
                label,
            },
            &ctl.config().wait,
        )
        .await?;
    Ok(())
}

async fn apply_sort<D>(
    ctl: &FilterController<'_, D>,
    layout: &TableLayout,
    column: &str,
    reverse: bool,
) -> EngineResult<()>
where
    D: PageDriver + ?Sized,
{
    let headers = ctl.snapshot().texts(&layout.header_cells)?;
    let index = resolve_column(&headers, column)?;
    let ready = Condition::Present(layout.header_cells.clone());
    for _ in 0..sort_clicks(reverse) {
        ctl.perform(column, &Gesture::click(layout.header_cells.clone(), index))
            .await?;
        ctl.driver().wait_for(&ready, &ctl.config().wait).await?;
    }
    Ok(())
}
