//! The artifact a locator hands back

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geometry::GeoShape;

/// Which archive an artifact came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactSource {
    ModelA,
    ModelB,
    Perimeter,
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ModelA => "Model A",
            Self::ModelB => "Model B",
            Self::Perimeter => "Perimeter",
        };
        f.write_str(name)
    }
}

/// A chosen geometry and the wall-clock time it represents
///
/// Built once per source per run and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedArtifact {
    source: ArtifactSource,
    shape: GeoShape,
    timestamp: NaiveDateTime,
    path: PathBuf,
    simulation_hour: Option<f64>,
}

impl TimedArtifact {
    pub fn new(
        source: ArtifactSource,
        shape: GeoShape,
        timestamp: NaiveDateTime,
        path: PathBuf,
    ) -> Self {
        Self {
            source,
            shape,
            timestamp,
            path,
            simulation_hour: None,
        }
    }

    /// Record the simulation hour the geometry was taken from
    #[must_use]
    pub fn with_simulation_hour(mut self, hour: f64) -> Self {
        self.simulation_hour = Some(hour);
        self
    }

    pub fn source(&self) -> ArtifactSource {
        self.source
    }

    pub fn shape(&self) -> &GeoShape {
        &self.shape
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// File the geometry was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn simulation_hour(&self) -> Option<f64> {
        self.simulation_hour
    }
}
