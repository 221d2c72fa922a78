//! Error types for the verification pipeline
//!
//! Every failure here is a data-availability gap, so none of them are retried.
//! Catalog name parsing has its own [`ParseError`]: locators log it and skip the
//! entry instead of aborting.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type Result<T, E = VerifyError> = std::result::Result<T, E>;

/// Terminal failure of one verification stage.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Vector source is unreadable, malformed, or has no usable polygon records.
    #[error("Cannot load geometry from {path}: {reason}")]
    GeometryLoad { path: PathBuf, reason: String },

    /// An expected archive directory does not exist.
    #[error("Catalog directory not found: {0}")]
    CatalogNotFound(PathBuf),

    /// A filter or time-ordering constraint eliminated every candidate.
    #[error("No match for fire {fire_id}: {reason}")]
    NoMatch { fire_id: String, reason: String },

    /// A chosen directory holds no file of the expected vector type.
    #[error("No .{extension} artifact in {dir}")]
    ArtifactMissing { dir: PathBuf, extension: String },

    /// A skill-score denominator is zero.
    #[error("Skill score '{metric}' is undefined: {denominator} is zero")]
    DegenerateInput {
        metric: &'static str,
        denominator: &'static str,
    },

    /// Tabular catalog could not be read.
    #[error("Cannot read catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    /// Configuration file could not be read or parsed.
    #[error("Invalid configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// A report sink could not write the finished report.
    #[error("Cannot deliver report: {reason}")]
    Delivery { reason: String },
}

impl VerifyError {
    pub(crate) fn geometry_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::GeometryLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn no_match(fire_id: &str, reason: impl Into<String>) -> Self {
        Self::NoMatch {
            fire_id: fire_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// A catalog entry name that does not follow the archive's naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse timestamp from '{name}': {reason}")]
pub struct ParseError {
    pub name: String,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(name: &str, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_fire() {
        let err = VerifyError::no_match("K52125", "no rows with DURATION_HOURS >= 12");
        assert_eq!(
            err.to_string(),
            "No match for fire K52125: no rows with DURATION_HOURS >= 12"
        );
    }

    #[test]
    fn test_degenerate_message() {
        let err = VerifyError::DegenerateInput {
            metric: "false_alarm_ratio",
            denominator: "A+B",
        };
        assert!(err.to_string().contains("false_alarm_ratio"));
        assert!(err.to_string().contains("A+B"));
    }
}
