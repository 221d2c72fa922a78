//! # Verification Pipeline
//!
//! Runs one fire end to end: locate the Model A run, then the Model B run
//! nearest to Model A's issue time, then the first observed perimeter after both,
//! and score each model's geometry against that perimeter.
//!
//! ## Table of Contents
//! 1. **Stages and Errors** - `Stage`, `RunError`
//! 2. **Report** - `VerificationReport`, `ReportSummary`, `ReportSink`
//! 3. **Pipeline** - `Pipeline::run`, `Pipeline::run_with_sinks`

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span};

use crate::config::VerifyConfig;
use crate::error::VerifyError;
use crate::locate::{
    ArtifactSource, CandidateSelector, ModelALocator, ModelBLocator, PerimeterLocator,
    TimedArtifact,
};
use crate::overlap::{compute_overlap, OverlapResult};
use crate::skill::{compute_skill, SkillScores};

// ============================================================================
// 1. STAGES AND ERRORS
// ============================================================================

/// Step of a verification run, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Setup,
    LocateModelA,
    LocateModelB,
    LocatePerimeter,
    ScoreModelA,
    ScoreModelB,
    Deliver,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::LocateModelA => "locate Model A",
            Self::LocateModelB => "locate Model B",
            Self::LocatePerimeter => "locate perimeter",
            Self::ScoreModelA => "score Model A",
            Self::ScoreModelB => "score Model B",
            Self::Deliver => "deliver report",
        };
        f.write_str(name)
    }
}

/// A failed run: which fire, which stage, and the underlying error
#[derive(Debug, Error)]
#[error("Fire {fire_id}: {stage} failed: {source}")]
pub struct RunError {
    pub fire_id: String,
    pub stage: Stage,
    #[source]
    pub source: VerifyError,
}

impl RunError {
    pub fn new(fire_id: &str, stage: Stage, source: VerifyError) -> Self {
        Self {
            fire_id: fire_id.to_string(),
            stage,
            source,
        }
    }
}

// ============================================================================
// 2. REPORT
// ============================================================================

/// Overlap table and skill scores for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelVerification {
    pub overlap: OverlapResult,
    pub skill: SkillScores,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub fire_id: String,
    pub model_a: TimedArtifact,
    pub model_b: TimedArtifact,
    pub perimeter: TimedArtifact,
    pub model_a_scores: ModelVerification,
    pub model_b_scores: ModelVerification,
}

/// Serializable view of one selected artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub source: ArtifactSource,
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_hour: Option<f64>,
    pub area_m2: f64,
    pub parts: usize,
}

impl From<&TimedArtifact> for ArtifactSummary {
    fn from(artifact: &TimedArtifact) -> Self {
        Self {
            source: artifact.source(),
            path: artifact.path().to_path_buf(),
            timestamp: artifact.timestamp(),
            simulation_hour: artifact.simulation_hour(),
            area_m2: artifact.shape().area(),
            parts: artifact.shape().part_count(),
        }
    }
}

/// Geometry-free form of a report, for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub fire_id: String,
    pub perimeter: ArtifactSummary,
    pub model_a: ArtifactSummary,
    pub model_b: ArtifactSummary,
    pub model_a_scores: ModelVerification,
    pub model_b_scores: ModelVerification,
}

impl VerificationReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            fire_id: self.fire_id.clone(),
            perimeter: (&self.perimeter).into(),
            model_a: (&self.model_a).into(),
            model_b: (&self.model_b).into(),
            model_a_scores: self.model_a_scores,
            model_b_scores: self.model_b_scores,
        }
    }
}

fn write_scores(f: &mut fmt::Formatter<'_>, name: &str, scores: &SkillScores) -> fmt::Result {
    writeln!(f, "{name}:")?;
    writeln!(f, "  bias: {}", scores.bias)?;
    writeln!(f, "  hit rate: {}", scores.hit_rate)?;
    writeln!(f, "  false alarm ratio: {}", scores.false_alarm_ratio)?;
    writeln!(f, "  critical success index: {}", scores.critical_success_index)
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fire: {}", self.fire_id)?;
        writeln!(f, "perimeter time: {}", self.perimeter.timestamp())?;
        writeln!(f, "Model A time: {}", self.model_a.timestamp())?;
        writeln!(f, "Model B time: {}", self.model_b.timestamp())?;
        write_scores(f, "Model A", &self.model_a_scores.skill)?;
        write_scores(f, "Model B", &self.model_b_scores.skill)
    }
}

/// Receives finished reports (plotting, persistence, test capture)
pub trait ReportSink {
    /// # Errors
    /// Implementations report their own delivery failures.
    fn deliver(&mut self, report: &VerificationReport) -> Result<(), VerifyError>;
}

impl ReportSink for Vec<VerificationReport> {
    fn deliver(&mut self, report: &VerificationReport) -> Result<(), VerifyError> {
        self.push(report.clone());
        Ok(())
    }
}

// ============================================================================
// 3. PIPELINE
// ============================================================================

/// The three locators plus the Model A duration threshold
#[derive(Debug, Clone)]
pub struct Pipeline {
    model_a: ModelALocator,
    model_b: ModelBLocator,
    perimeter: PerimeterLocator,
    min_duration_hours: f64,
}

impl Pipeline {
    pub fn new(
        model_a: ModelALocator,
        model_b: ModelBLocator,
        perimeter: PerimeterLocator,
        min_duration_hours: f64,
    ) -> Self {
        Self {
            model_a,
            model_b,
            perimeter,
            min_duration_hours,
        }
    }

    /// Build every locator from `config`
    ///
    /// # Errors
    /// Returns a `RunError` tagged `Stage::Setup` if the catalog cannot be read or
    /// the target CRS is unsupported.
    pub fn from_config(fire_id: &str, config: &VerifyConfig) -> Result<Self, RunError> {
        let setup = |e| RunError::new(fire_id, Stage::Setup, e);
        Ok(Self::new(
            ModelALocator::from_config(config).map_err(setup)?,
            ModelBLocator::from_config(config).map_err(setup)?,
            PerimeterLocator::from_config(config).map_err(setup)?,
            config.min_duration_hours,
        ))
    }

    pub fn model_a(&self) -> &ModelALocator {
        &self.model_a
    }

    pub fn min_duration_hours(&self) -> f64 {
        self.min_duration_hours
    }

    /// Run all stages for `fire_id`
    ///
    /// # Arguments
    /// * `fire_id` - Fire identifier as it appears in the catalogs
    /// * `selector` - Chooses among several qualifying Model A runs
    ///
    /// # Errors
    /// The first failing stage ends the run; no partial report is produced.
    pub fn run(
        &self,
        fire_id: &str,
        selector: &mut dyn CandidateSelector,
    ) -> Result<VerificationReport, RunError> {
        let _span = info_span!("verify", fire_id).entered();
        let fail = |stage| move |e| RunError::new(fire_id, stage, e);

        let model_a = self
            .model_a
            .locate(fire_id, self.min_duration_hours, selector)
            .map_err(fail(Stage::LocateModelA))?;
        info!("Model A time: {}", model_a.timestamp());

        let model_b = self
            .model_b
            .locate(fire_id, model_a.timestamp())
            .map_err(fail(Stage::LocateModelB))?;
        info!("Model B time: {}", model_b.timestamp());

        let perimeter = self
            .perimeter
            .locate(fire_id, model_a.timestamp(), model_b.timestamp())
            .map_err(fail(Stage::LocatePerimeter))?;
        info!("Perimeter time: {}", perimeter.timestamp());

        // The two scorings only read the located shapes
        let (scored_a, scored_b) = rayon::join(
            || score(&perimeter, &model_a),
            || score(&perimeter, &model_b),
        );
        let model_a_scores = scored_a.map_err(fail(Stage::ScoreModelA))?;
        let model_b_scores = scored_b.map_err(fail(Stage::ScoreModelB))?;
        info!(
            "CSI: Model A {:.3}, Model B {:.3}",
            model_a_scores.skill.critical_success_index,
            model_b_scores.skill.critical_success_index
        );

        Ok(VerificationReport {
            fire_id: fire_id.to_string(),
            model_a,
            model_b,
            perimeter,
            model_a_scores,
            model_b_scores,
        })
    }

    /// [`Pipeline::run`], then hand the report to every sink in order
    ///
    /// # Errors
    /// Run failures as in [`Pipeline::run`]; the first sink failure is tagged
    /// `Stage::Deliver` and stops delivery to the remaining sinks.
    pub fn run_with_sinks(
        &self,
        fire_id: &str,
        selector: &mut dyn CandidateSelector,
        sinks: &mut [&mut dyn ReportSink],
    ) -> Result<VerificationReport, RunError> {
        let report = self.run(fire_id, selector)?;
        for sink in sinks.iter_mut() {
            sink.deliver(&report)
                .map_err(|e| RunError::new(fire_id, Stage::Deliver, e))?;
        }
        Ok(report)
    }
}

fn score(
    observed: &TimedArtifact,
    predicted: &TimedArtifact,
) -> Result<ModelVerification, VerifyError> {
    let overlap = compute_overlap(observed.shape(), predicted.shape())?;
    let skill = compute_skill(&overlap)?;
    Ok(ModelVerification { overlap, skill })
}
