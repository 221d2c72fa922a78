//! Model B locator: run directory nearest in time to a target
//!
//! Layout: `<archive_root>/<prefix><fire_id>/<run dir with _YYYYMMDDHHMMSS>/<file>`.
//! The run directory's stamp only drives selection; the artifact time comes from
//! the `_YYYYMMDDHHMMSS_` stamp in the geometry file's own name.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::artifact::{ArtifactSource, TimedArtifact};
use crate::catalog::{files_with_extension, parse_run_file_name, scan_run_dirs, SimulationRunDir};
use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::geometry::{load_layer, SpatialRef};

/// Run with the smallest absolute time distance to `target`
///
/// Ties keep the earliest entry in `runs`.
pub fn nearest_run(runs: &[SimulationRunDir], target: NaiveDateTime) -> Option<&SimulationRunDir> {
    runs.iter().fold(None, |best: Option<(&SimulationRunDir, i64)>, run| {
        let distance = (run.started - target).num_seconds().abs();
        match best {
            Some((_, best_distance)) if best_distance <= distance => best,
            _ => Some((run, distance)),
        }
    })
    .map(|(run, _)| run)
}

/// Locates the Model B run for a fire
#[derive(Debug, Clone)]
pub struct ModelBLocator {
    archive_root: PathBuf,
    fire_folder_prefix: String,
    extension: String,
    target: SpatialRef,
}

impl ModelBLocator {
    pub fn new(
        archive_root: impl Into<PathBuf>,
        fire_folder_prefix: impl Into<String>,
        extension: impl Into<String>,
        target: SpatialRef,
    ) -> Self {
        Self {
            archive_root: archive_root.into(),
            fire_folder_prefix: fire_folder_prefix.into(),
            extension: extension.into(),
            target,
        }
    }

    /// # Errors
    /// Returns `VerifyError::Config` for an unsupported target CRS.
    pub fn from_config(config: &VerifyConfig) -> Result<Self> {
        Ok(Self::new(
            &config.model_b.archive_root,
            &config.model_b.fire_folder_prefix,
            &config.model_b.extension,
            config.target_ref()?,
        ))
    }

    /// Per-fire folder holding the run directories
    pub fn fire_dir(&self, fire_id: &str) -> PathBuf {
        self.archive_root
            .join(format!("{}{}", self.fire_folder_prefix, fire_id))
    }

    /// Pick the run nearest `target_time` and load its final perimeter
    ///
    /// # Errors
    /// - `CatalogNotFound` when the per-fire folder is missing
    /// - `NoMatch` when no run directory name carries a timestamp
    /// - `ArtifactMissing` when the chosen run has no timestamped geometry file
    /// - `GeometryLoad` when that file cannot be loaded
    pub fn locate(&self, fire_id: &str, target_time: NaiveDateTime) -> Result<TimedArtifact> {
        let fire_dir = self.fire_dir(fire_id);
        let runs = scan_run_dirs(&fire_dir)?;
        let run = nearest_run(&runs, target_time).ok_or_else(|| {
            VerifyError::no_match(
                fire_id,
                format!("no timestamped run directories in {}", fire_dir.display()),
            )
        })?;
        info!("Model B run {} (started {})", run.name, run.started);

        let (path, timestamp) = self.run_artifact(&run.path)?;
        let layer = load_layer(&path, self.target)?;
        // Records are in time order; the last one is the end state of the run
        let last = layer
            .records()
            .last()
            .map(|record| record.shape.clone())
            .ok_or_else(|| VerifyError::geometry_load(&path, "no records"))?;

        Ok(TimedArtifact::new(ArtifactSource::ModelB, last, timestamp, path))
    }

    /// First geometry file in `run_dir` whose name carries a timestamp
    fn run_artifact(&self, run_dir: &Path) -> Result<(PathBuf, NaiveDateTime)> {
        for path in files_with_extension(run_dir, &self.extension) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match parse_run_file_name(&name) {
                Ok(timestamp) => return Ok((path, timestamp)),
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
        }
        Err(VerifyError::ArtifactMissing {
            dir: run_dir.to_path_buf(),
            extension: self.extension.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::fs;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 8, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn run(name: &str, started: NaiveDateTime) -> SimulationRunDir {
        SimulationRunDir {
            name: name.to_string(),
            path: PathBuf::from(name),
            started,
        }
    }

    #[test]
    fn test_nearest_prefers_smallest_absolute_distance() {
        let t = t0();
        let runs = vec![
            run("minus3", t - Duration::hours(3)),
            run("minus1", t - Duration::hours(1)),
            run("plus5", t + Duration::hours(5)),
        ];
        assert_eq!(nearest_run(&runs, t).unwrap().name, "minus1");
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let t = t0();
        let runs = vec![
            run("after", t + Duration::hours(2)),
            run("before", t - Duration::hours(2)),
        ];
        assert_eq!(nearest_run(&runs, t).unwrap().name, "after");
        assert!(nearest_run(&[], t).is_none());
    }

    #[test]
    fn test_no_parseable_runs_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("BCWS_2023_K1").join("scratch")).unwrap();
        let loc = ModelBLocator::new(dir.path(), "BCWS_2023_", "geojson", SpatialRef::BC_ALBERS);
        assert!(matches!(loc.locate("K1", t0()), Err(VerifyError::NoMatch { .. })));
    }

    #[test]
    fn test_missing_fire_folder_is_catalog_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loc = ModelBLocator::new(dir.path(), "BCWS_2023_", "geojson", SpatialRef::BC_ALBERS);
        assert!(matches!(
            loc.locate("K1", t0()),
            Err(VerifyError::CatalogNotFound(p)) if p.ends_with("BCWS_2023_K1")
        ));
    }

    #[test]
    fn test_run_without_geometry_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = dir.path().join("BCWS_2023_K1").join("K1_20230815120000");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("readme.txt"), "").unwrap();
        fs::write(run_dir.join("no_stamp.geojson"), "{}").unwrap();
        let loc = ModelBLocator::new(dir.path(), "BCWS_2023_", "geojson", SpatialRef::BC_ALBERS);
        assert!(matches!(
            loc.locate("K1", t0()),
            Err(VerifyError::ArtifactMissing { .. })
        ));
    }
}
