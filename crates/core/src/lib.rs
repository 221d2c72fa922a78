//! Wildfire Forecast Verification Core Library
//!
//! Scores two fire-spread simulation systems against the observed fire perimeter.
//! For one fire the pipeline picks a Model A run from a tabular catalog, the
//! Model B run nearest to it in time, and the first observed perimeter taken
//! after both, then computes hit, miss and false-alarm areas in BC Albers and
//! derives categorical skill scores from them.
//!
//! ## Modules
//! - `catalog` - archive directory and file-name conventions, the Model A lookup table
//! - `geometry` - vector loading, reprojection, polygon shapes
//! - `locate` - the three temporal locators
//! - `overlap` - polygon-set areas
//! - `skill` - bias, hit rate, false alarm ratio, critical success index
//! - `pipeline` - end-to-end run and report

// Archive conventions and catalogs
pub mod catalog;

// Settings
pub mod config;

pub mod error;

// Vector data
pub mod geometry;

// Run selection
pub mod locate;

// Scoring
pub mod overlap;
pub mod skill;

pub mod pipeline;

// Re-export the pipeline surface
pub use config::VerifyConfig;
pub use error::{ParseError, Result, VerifyError};
pub use geometry::{GeoShape, SpatialRef};
pub use locate::{
    ArtifactSource, CandidateSelector, FixedChoice, SingleCandidateOnly, TimedArtifact,
};
pub use overlap::{compute_overlap, OverlapResult};
pub use pipeline::{
    ModelVerification, Pipeline, ReportSink, ReportSummary, RunError, Stage, VerificationReport,
};
pub use skill::{compute_skill, SkillScores};
