//! Model A locator: catalog lookup by fire id and simulation duration
//!
//! Catalog rows are not totally ordered by preference, so when several runs
//! qualify the choice is delegated to a [`CandidateSelector`] supplied by the
//! caller (the CLI prompts the operator; tests pass a fixed index).

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::artifact::{ArtifactSource, TimedArtifact};
use crate::catalog::{SimulationCatalog, SimulationCatalogEntry};
use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::geometry::{load_layer, GeoShape, SpatialRef, VectorLayer};

/// Attribute holding the simulation hour of each Model A perimeter record
const HOUR_COLUMN: &str = "hour";

/// Picks one of several equally eligible catalog candidates
pub trait CandidateSelector {
    /// Index into `candidates`, or `None` to decline
    ///
    /// Only called with two or more candidates.
    fn select(&mut self, fire_id: &str, candidates: &[SimulationCatalogEntry]) -> Option<usize>;
}

/// Always picks the same 0-based index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChoice(pub usize);

impl CandidateSelector for FixedChoice {
    fn select(&mut self, _fire_id: &str, _candidates: &[SimulationCatalogEntry]) -> Option<usize> {
        Some(self.0)
    }
}

/// Declines whenever a choice is needed; for unattended runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleCandidateOnly;

impl CandidateSelector for SingleCandidateOnly {
    fn select(&mut self, _fire_id: &str, _candidates: &[SimulationCatalogEntry]) -> Option<usize> {
        None
    }
}

/// Locates the Model A run for a fire
#[derive(Debug, Clone)]
pub struct ModelALocator {
    catalog: SimulationCatalog,
    archive_root: PathBuf,
    geometry_file: String,
    target: SpatialRef,
}

impl ModelALocator {
    pub fn new(
        catalog: SimulationCatalog,
        archive_root: impl Into<PathBuf>,
        geometry_file: impl Into<String>,
        target: SpatialRef,
    ) -> Self {
        Self {
            catalog,
            archive_root: archive_root.into(),
            geometry_file: geometry_file.into(),
            target,
        }
    }

    /// Load the lookup table named in the config
    ///
    /// # Errors
    /// Propagates catalog and CRS configuration errors.
    pub fn from_config(config: &VerifyConfig) -> Result<Self> {
        Ok(Self::new(
            SimulationCatalog::load(&config.model_a.catalog)?,
            &config.model_a.archive_root,
            &config.model_a.geometry_file,
            config.target_ref()?,
        ))
    }

    /// Catalog rows for `fire_id` running at least `min_duration_hours`, in file order
    ///
    /// # Errors
    /// Returns `VerifyError::NoMatch` if the fire is absent or every row is shorter
    /// than the threshold.
    pub fn candidates(
        &self,
        fire_id: &str,
        min_duration_hours: f64,
    ) -> Result<Vec<SimulationCatalogEntry>> {
        let rows: Vec<&SimulationCatalogEntry> = self.catalog.for_fire(fire_id).collect();
        if rows.is_empty() {
            return Err(VerifyError::no_match(fire_id, "no Model A catalog rows"));
        }
        let long_enough: Vec<SimulationCatalogEntry> = rows
            .into_iter()
            .filter(|row| row.duration_hours >= min_duration_hours)
            .cloned()
            .collect();
        if long_enough.is_empty() {
            return Err(VerifyError::no_match(
                fire_id,
                format!("no Model A runs with DURATION_HOURS >= {min_duration_hours}"),
            ));
        }
        Ok(long_enough)
    }

    /// Select a run and load its geometry at `min_duration_hours`
    ///
    /// The artifact's timestamp is the run's forecast-issue time. If the run has
    /// no record for exactly that hour, the latest available hour is used and a
    /// warning is logged.
    ///
    /// # Errors
    /// - `NoMatch` when no candidate qualifies or the selector declines/picks out of range
    /// - `GeometryLoad` when the run's geometry is unreadable or carries no usable hour
    pub fn locate(
        &self,
        fire_id: &str,
        min_duration_hours: f64,
        selector: &mut dyn CandidateSelector,
    ) -> Result<TimedArtifact> {
        let candidates = self.candidates(fire_id, min_duration_hours)?;

        let chosen = if candidates.len() == 1 {
            &candidates[0]
        } else {
            let index = selector.select(fire_id, &candidates).ok_or_else(|| {
                VerifyError::no_match(
                    fire_id,
                    format!("{} Model A candidates and no selection made", candidates.len()),
                )
            })?;
            candidates.get(index).ok_or_else(|| {
                VerifyError::no_match(
                    fire_id,
                    format!("selection {index} out of range for {} candidates", candidates.len()),
                )
            })?
        };
        info!(
            "Model A run {} (forecast time {})",
            chosen.sim_unique, chosen.forecast_time
        );

        let path = self.run_geometry_path(chosen);
        let layer = load_layer(&path, self.target)?;
        let (shape, hour) = select_hour(&layer, min_duration_hours)?;

        Ok(
            TimedArtifact::new(ArtifactSource::ModelA, shape, chosen.forecast_time, path)
                .with_simulation_hour(hour),
        )
    }

    fn run_geometry_path(&self, entry: &SimulationCatalogEntry) -> PathBuf {
        Path::new(&self.archive_root)
            .join(&entry.sim_unique)
            .join(&self.geometry_file)
    }
}

/// Record for `wanted_hour`, falling back to the latest hour present
fn select_hour(layer: &VectorLayer, wanted_hour: f64) -> Result<(GeoShape, f64)> {
    let hours: Vec<(usize, f64)> = layer
        .records()
        .iter()
        .enumerate()
        .filter_map(|(i, record)| record.numeric_property(HOUR_COLUMN).map(|h| (i, h)))
        .collect();

    if let Some(&(index, hour)) = hours.iter().find(|(_, h)| *h == wanted_hour) {
        return Ok((layer.records()[index].shape.clone(), hour));
    }

    let latest = hours
        .iter()
        .copied()
        .reduce(|best, next| if next.1 > best.1 { next } else { best });
    match latest {
        Some((index, hour)) => {
            warn!(
                "No data for hour {wanted_hour} in {}. Using the latest available hour: {hour}",
                layer.path().display()
            );
            Ok((layer.records()[index].shape.clone(), hour))
        }
        None => Err(VerifyError::geometry_load(
            layer.path(),
            format!("no record has a numeric '{HOUR_COLUMN}' attribute"),
        )),
    }
}
