//! Model A simulation lookup table
//!
//! The season lookup table has one row per simulation run: `NUMBER` (fire id),
//! `DURATION_HOURS`, `Sim_unique` (run folder) and `FORECAST_TIMESTAMP`. Extra
//! columns are ignored. The table is read from the first sheet of a spreadsheet
//! workbook, or from a CSV export.

use std::io;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::names::parse_forecast_timestamp;
use crate::error::{Result, VerifyError};

/// One candidate simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationCatalogEntry {
    pub fire_id: String,
    pub duration_hours: f64,
    /// Unique run identifier, also the run's folder name
    pub sim_unique: String,
    pub forecast_time: NaiveDateTime,
}

const REQUIRED_COLUMNS: [&str; 4] =
    ["NUMBER", "DURATION_HOURS", "Sim_unique", "FORECAST_TIMESTAMP"];

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "NUMBER")]
    number: String,
    #[serde(rename = "DURATION_HOURS")]
    duration_hours: String,
    #[serde(rename = "Sim_unique")]
    sim_unique: String,
    #[serde(rename = "FORECAST_TIMESTAMP")]
    forecast_timestamp: String,
}

impl CatalogRow {
    fn into_entry(self) -> std::result::Result<SimulationCatalogEntry, String> {
        let duration_hours = self
            .duration_hours
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("bad DURATION_HOURS '{}'", self.duration_hours))?;
        let forecast_time =
            parse_forecast_timestamp(&self.forecast_timestamp).map_err(|e| e.to_string())?;
        Ok(SimulationCatalogEntry {
            fire_id: self.number,
            duration_hours,
            sim_unique: self.sim_unique,
            forecast_time,
        })
    }
}

/// All rows of the lookup table, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationCatalog {
    entries: Vec<SimulationCatalogEntry>,
}

impl SimulationCatalog {
    pub fn from_entries(entries: Vec<SimulationCatalogEntry>) -> Self {
        Self { entries }
    }

    /// Read the lookup table, as a workbook or CSV depending on the extension
    ///
    /// # Errors
    /// Returns `VerifyError::Catalog` if the file cannot be opened or lacks the
    /// required header. Individual malformed rows are logged and skipped.
    pub fn load(path: &Path) -> Result<Self> {
        let is_spreadsheet = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        });

        let catalog = if is_spreadsheet {
            Self::load_workbook(path)?
        } else {
            let file = std::fs::File::open(path).map_err(|e| VerifyError::Catalog {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            Self::from_reader(file, path)?
        };
        debug!("Loaded {} catalog rows from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    fn load_workbook(path: &Path) -> Result<Self> {
        let catalog_error = |reason: String| VerifyError::Catalog {
            path: path.to_path_buf(),
            reason,
        };
        let mut workbook = open_workbook_auto(path).map_err(|e| catalog_error(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| catalog_error("workbook has no sheets".to_string()))?
            .map_err(|e| catalog_error(e.to_string()))?;
        Self::from_rows(range.rows(), path)
    }

    /// Read spreadsheet rows, header first; `path` is only used in messages
    ///
    /// Timestamps may be date cells, numeric date serials or text.
    ///
    /// # Errors
    /// Returns `VerifyError::Catalog` if the header row lacks a required column.
    pub fn from_rows<'a>(mut rows: impl Iterator<Item = &'a [Data]>, path: &Path) -> Result<Self> {
        let header: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(|c| cell_text(c).trim().to_string()).collect())
            .unwrap_or_default();

        let mut columns = [0usize; 4];
        for (slot, required) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = header.iter().position(|h| h == required).ok_or_else(|| {
                VerifyError::Catalog {
                    path: path.to_path_buf(),
                    reason: format!("missing column {required}"),
                }
            })?;
        }
        let [number, duration, sim_unique, forecast] = columns;

        let mut entries = Vec::new();
        for (index, cells) in rows.enumerate() {
            if cells.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }
            let text = |column: usize| cells.get(column).map(cell_text).unwrap_or_default();
            let row = CatalogRow {
                number: text(number).trim().to_string(),
                duration_hours: text(duration),
                sim_unique: text(sim_unique).trim().to_string(),
                forecast_timestamp: cells
                    .get(forecast)
                    .map(cell_timestamp_text)
                    .unwrap_or_default(),
            };
            match row.into_entry() {
                Ok(entry) => entries.push(entry),
                // +2: header row and 1-based numbering
                Err(reason) => {
                    warn!("Skipping catalog row {} of {}: {reason}", index + 2, path.display());
                }
            }
        }
        Ok(Self { entries })
    }

    /// Read CSV from any reader; `path` is only used in messages
    ///
    /// # Errors
    /// See [`SimulationCatalog::load`].
    pub fn from_reader<R: io::Read>(reader: R, path: &Path) -> Result<Self> {
        let catalog_error = |reason: String| VerifyError::Catalog {
            path: PathBuf::from(path),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers().map_err(|e| catalog_error(e.to_string()))?;
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(catalog_error(format!("missing column {required}")));
            }
        }

        let mut entries = Vec::new();
        for (line, row) in reader.deserialize::<CatalogRow>().enumerate() {
            match row.map_err(|e| e.to_string()).and_then(CatalogRow::into_entry) {
                Ok(entry) => entries.push(entry),
                // +2: header line and 1-based numbering
                Err(reason) => {
                    warn!("Skipping catalog row {} of {}: {reason}", line + 2, path.display());
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SimulationCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows for one fire, in file order
    pub fn for_fire<'a>(
        &'a self,
        fire_id: &'a str,
    ) -> impl Iterator<Item = &'a SimulationCatalogEntry> + 'a {
        self.entries.iter().filter(move |e| e.fire_id == fire_id)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format_serial(dt.as_f64()).unwrap_or_default(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Numeric cells in the timestamp column are date serials, not plain numbers
fn cell_timestamp_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) => format_serial(*f).unwrap_or_default(),
        Data::Int(i) => format_serial(*i as f64).unwrap_or_default(),
        other => cell_text(other),
    }
}

/// Render a 1900-system spreadsheet date serial as `YYYY-MM-DD HH:MM:SS`
///
/// Serials count days from 1899-12-30; the fraction is the time of day, rounded
/// to the second.
fn format_serial(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    let time = epoch.checked_add_signed(Duration::try_seconds(seconds)?)?;
    Some(time.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
NUMBER,FIRE_NAME,DURATION_HOURS,Sim_unique,FORECAST_TIMESTAMP
K52125,Inks Lake,12,K52125_a,2023-08-15 10:00:00
K52125,Inks Lake,6,K52125_b,2023-08-15 16:00:00
V82990,Other,24,V82990_a,2023-08-20T08:30:00
K52125,Inks Lake,not-a-number,K52125_c,2023-08-16 10:00:00
K52125,Inks Lake,12,K52125_d,sometime
";

    #[test]
    fn test_reads_rows_and_skips_malformed() {
        let catalog =
            SimulationCatalog::from_reader(TABLE.as_bytes(), Path::new("table.csv")).unwrap();
        assert_eq!(catalog.len(), 3);
        let ids: Vec<&str> = catalog.for_fire("K52125").map(|e| e.sim_unique.as_str()).collect();
        assert_eq!(ids, vec!["K52125_a", "K52125_b"]);
        assert_eq!(catalog.for_fire("V82990").next().unwrap().duration_hours, 24.0);
        assert_eq!(catalog.for_fire("X00000").count(), 0);
    }

    #[test]
    fn test_missing_column_is_catalog_error() {
        let err = SimulationCatalog::from_reader(
            "NUMBER,Sim_unique\nK52125,a\n".as_bytes(),
            Path::new("table.csv"),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::Catalog { .. }));
        assert!(err.to_string().contains("DURATION_HOURS"));
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_workbook_rows_with_date_serials() {
        let header = ["NUMBER", "FIRE_NAME", "DURATION_HOURS", "Sim_unique", "FORECAST_TIMESTAMP"];
        let row = |id: &str, duration: Data, sim: &str, time: Data| {
            vec![text(id), text("Inks Lake"), duration, text(sim), time]
        };
        let rows = vec![
            header.iter().map(|h| text(h)).collect(),
            // 45153.41666... is 2023-08-15 10:00
            row("K52125", Data::Float(12.0), "K52125_a", Data::Float(45_153.416_666_666_664)),
            vec![Data::Empty; 5],
            row("K52125", Data::Int(6), "K52125_b", text("2023-08-15 16:00:00")),
            row("K52125", text("n/a"), "K52125_c", Data::Float(45_154.0)),
            // Short row: missing timestamp cell
            vec![text("V82990"), text("Other"), Data::Float(24.0)],
        ];
        let path = Path::new("table.xlsx");
        let catalog = SimulationCatalog::from_rows(rows.iter().map(Vec::as_slice), path).unwrap();

        assert_eq!(catalog.len(), 2);
        let first = &catalog.entries()[0];
        assert_eq!(first.sim_unique, "K52125_a");
        assert_eq!(first.duration_hours, 12.0);
        assert_eq!(
            first.forecast_time,
            NaiveDate::from_ymd_opt(2023, 8, 15).unwrap().and_hms_opt(10, 0, 0).unwrap()
        );
        assert_eq!(catalog.entries()[1].duration_hours, 6.0);
    }

    #[test]
    fn test_workbook_missing_column() {
        let rows = vec![vec![text("NUMBER"), text("Sim_unique")]];
        let path = Path::new("table.xlsx");
        let err = SimulationCatalog::from_rows(rows.iter().map(Vec::as_slice), path).unwrap_err();
        assert!(err.to_string().contains("DURATION_HOURS"), "{err}");
    }

    #[test]
    fn test_unreadable_workbook_is_catalog_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.xlsx");
        std::fs::write(&path, "not a zip archive").unwrap();
        assert!(matches!(SimulationCatalog::load(&path), Err(VerifyError::Catalog { .. })));
    }

    #[test]
    fn test_serial_formatting() {
        assert_eq!(format_serial(45_153.5).as_deref(), Some("2023-08-15 12:00:00"));
        assert_eq!(format_serial(f64::NAN), None);
    }

    #[test]
    fn test_missing_file_is_catalog_error() {
        assert!(matches!(
            SimulationCatalog::load(Path::new("/nonexistent/table.csv")),
            Err(VerifyError::Catalog { .. })
        ));
    }
}
