//! # Verification Configuration
//!
//! Parses the TOML config that points the pipeline at the three archives.
//! Every field has a default matching the 2023 season archive layout, so an
//! empty file (or no file at all) is a valid configuration.
//!
//! ## Table of Contents
//! 1. VerifyConfig - Top-level config
//! 2. Per-source sections
//! 3. Loading and path resolution

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VerifyError};
use crate::geometry::SpatialRef;

// ============================================================================
// 1. VerifyConfig - Top-level config
// ============================================================================

/// Top-level configuration for one verification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Minimum simulation duration (hours) for Model A candidates
    #[serde(default = "default_min_duration")]
    pub min_duration_hours: f64,
    /// Planar reference every geometry is projected into (e.g. "EPSG:3005")
    #[serde(default = "default_target_crs")]
    pub target_crs: String,
    /// Model A (issue-time catalog) archive
    #[serde(default)]
    pub model_a: ModelAConfig,
    /// Model B (timestamped run directories) archive
    #[serde(default)]
    pub model_b: ModelBConfig,
    /// Observed perimeter snapshot archive
    #[serde(default)]
    pub perimeter: PerimeterConfig,
}

fn default_min_duration() -> f64 {
    12.0
}

fn default_target_crs() -> String {
    "EPSG:3005".to_string()
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            min_duration_hours: default_min_duration(),
            target_crs: default_target_crs(),
            model_a: ModelAConfig::default(),
            model_b: ModelBConfig::default(),
            perimeter: PerimeterConfig::default(),
        }
    }
}

// ============================================================================
// 2. Per-source sections
// ============================================================================

/// Model A: lookup table (xlsx or CSV) plus one folder per `Sim_unique`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAConfig {
    /// Catalog with NUMBER, DURATION_HOURS, Sim_unique, FORECAST_TIMESTAMP columns;
    /// `.xlsx`/`.xls`/`.ods` are read as spreadsheets, anything else as CSV
    pub catalog: PathBuf,
    /// Folder holding one subfolder per simulation run
    pub archive_root: PathBuf,
    /// Geometry file name inside each run folder
    pub geometry_file: String,
}

impl Default for ModelAConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("data/2023_fire_season_lookup_table.xlsx"),
            archive_root: PathBuf::from("MODELS/TECHNOSYLVA/simulations"),
            geometry_file: "Perimeters.geojson".to_string(),
        }
    }
}

/// Model B: per-fire folder of timestamp-named run directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelBConfig {
    pub archive_root: PathBuf,
    /// Prefix joined with the fire id to name the per-fire folder
    pub fire_folder_prefix: String,
    /// Extension of the geometry file inside a run directory
    pub extension: String,
}

impl Default for ModelBConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("MODELS/FIRECAST/simulations"),
            fire_folder_prefix: "BCWS_2023_".to_string(),
            extension: "shp".to_string(),
        }
    }
}

/// Observed perimeters: one timestamp-named directory per snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerimeterConfig {
    pub archive_root: PathBuf,
    pub extension: String,
    /// Fire-identifier column names, in order of preference
    pub fire_id_columns: Vec<String>,
}

impl Default for PerimeterConfig {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from("data/2023_fire_perimeters/interrim_perims/polys"),
            extension: "shp".to_string(),
            fire_id_columns: vec!["FIRE_NUMBE".to_string(), "FIRE_NUM".to_string()],
        }
    }
}

// ============================================================================
// 3. Loading and path resolution
// ============================================================================

impl VerifyConfig {
    /// Load a config from a TOML file, resolving relative paths against its directory
    ///
    /// # Errors
    /// Returns `VerifyError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VerifyError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: VerifyConfig = toml::from_str(&content).map_err(|e| VerifyError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve(base))
    }

    /// Rebase every relative archive path onto `base`
    #[must_use]
    pub fn resolve(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.model_a.catalog);
        rebase(&mut self.model_a.archive_root);
        rebase(&mut self.model_b.archive_root);
        rebase(&mut self.perimeter.archive_root);
        self
    }

    /// Parsed planar reference
    ///
    /// # Errors
    /// Returns `VerifyError::Config` for a non-EPSG or geographic CRS string;
    /// areas are only meaningful in a projected reference.
    pub fn target_ref(&self) -> Result<SpatialRef> {
        let reject = |reason: &str| VerifyError::Config {
            path: PathBuf::from("target_crs"),
            reason: format!("{reason} '{}'", self.target_crs),
        };
        let target = SpatialRef::parse(&self.target_crs)
            .ok_or_else(|| reject("unsupported reference"))?;
        if target.is_geographic() {
            return Err(reject("target must be a projected reference, not"));
        }
        Ok(target)
    }
}
