//! Directory-backed catalogs
//!
//! Listing order from the filesystem is unspecified, so every listing here is
//! sorted by name before anything else looks at it.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::warn;

use super::names::{parse_run_dir_name, parse_snapshot_dir_name};
use crate::error::{ParseError, Result, VerifyError};

/// A Model B run directory and the start time encoded in its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRunDir {
    pub name: String,
    pub path: PathBuf,
    pub started: NaiveDateTime,
}

/// An observed-perimeter snapshot directory and its observation time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerimeterSnapshotDir {
    pub name: String,
    pub path: PathBuf,
    pub observed: NaiveDateTime,
}

/// Subdirectories of `root` as (name, path), sorted by name
///
/// # Errors
/// Returns `VerifyError::CatalogNotFound` if `root` is not a readable directory.
fn list_subdirectories(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        return Err(VerifyError::CatalogNotFound(root.to_path_buf()));
    }
    let entries =
        std::fs::read_dir(root).map_err(|_| VerifyError::CatalogNotFound(root.to_path_buf()))?;

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            Some((name, entry.path()))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Parse every subdirectory name, logging and skipping the ones that don't parse
fn scan_with<T>(
    root: &Path,
    parse: impl Fn(&str) -> std::result::Result<NaiveDateTime, ParseError>,
    build: impl Fn(String, PathBuf, NaiveDateTime) -> T,
) -> Result<Vec<T>> {
    let mut parsed = Vec::new();
    for (name, path) in list_subdirectories(root)? {
        match parse(&name) {
            Ok(time) => parsed.push(build(name, path, time)),
            Err(e) => warn!("Skipping {}: {e}", path.display()),
        }
    }
    Ok(parsed)
}

/// Model B run directories under a per-fire folder, in name order
///
/// # Errors
/// Returns `VerifyError::CatalogNotFound` if the folder does not exist.
pub fn scan_run_dirs(fire_dir: &Path) -> Result<Vec<SimulationRunDir>> {
    scan_with(fire_dir, parse_run_dir_name, |name, path, started| SimulationRunDir {
        name,
        path,
        started,
    })
}

/// Perimeter snapshot directories sorted ascending by observation time
///
/// # Errors
/// Returns `VerifyError::CatalogNotFound` if the archive root does not exist.
pub fn scan_snapshot_dirs(root: &Path) -> Result<Vec<PerimeterSnapshotDir>> {
    let mut snapshots = scan_with(root, parse_snapshot_dir_name, |name, path, observed| {
        PerimeterSnapshotDir {
            name,
            path,
            observed,
        }
    })?;
    // Stable: equal timestamps keep name order
    snapshots.sort_by_key(|s| s.observed);
    Ok(snapshots)
}

/// Regular files in `dir` with the given extension (case-insensitive), sorted by name
///
/// Unreadable directories yield an empty list; callers report the missing artifact.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_missing_root_is_catalog_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("BCWS_2023_X00000");
        assert!(matches!(
            scan_run_dirs(&missing),
            Err(VerifyError::CatalogNotFound(p)) if p == missing
        ));
        assert!(matches!(
            scan_snapshot_dirs(&missing),
            Err(VerifyError::CatalogNotFound(_))
        ));
    }

    #[test]
    fn test_unparseable_names_and_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("run_20230815120000")).unwrap();
        fs::create_dir(dir.path().join("run_20230815090000")).unwrap();
        fs::create_dir(dir.path().join("scratch")).unwrap();
        fs::write(dir.path().join("run_20230815100000"), "a file, not a run").unwrap();

        let runs = scan_run_dirs(dir.path()).unwrap();
        let names: Vec<&str> = runs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["run_20230815090000", "run_20230815120000"]);
    }

    #[test]
    fn test_snapshots_sorted_by_time_not_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b_polys_202308150900")).unwrap();
        fs::create_dir(dir.path().join("a_polys_202308151200")).unwrap();
        fs::create_dir(dir.path().join("c_polys_202308140600")).unwrap();

        let snapshots = scan_snapshot_dirs(dir.path()).unwrap();
        let names: Vec<&str> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["c_polys_202308140600", "b_polys_202308150900", "a_polys_202308151200"]
        );
    }

    #[test]
    fn test_files_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.geojson"), "{}").unwrap();
        fs::write(dir.path().join("a.GEOJSON"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.geojson")).unwrap();

        let files = files_with_extension(dir.path(), "geojson");
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.GEOJSON", "b.geojson"]);
        assert!(files_with_extension(&dir.path().join("absent"), "geojson").is_empty());
    }
}
