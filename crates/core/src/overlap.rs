//! Polygon-set overlap between an observed and a predicted shape
//!
//! Both operands are dissolved first so that overlapping parts within one shape
//! never count twice. The three areas then partition the union:
//! `intersection + observed_only = area(observed)` and
//! `intersection + predicted_only = area(predicted)`.

use geo::{Area, BooleanOps};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::geometry::GeoShape;

/// Contingency areas in square metres (under the planar reference)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlapResult {
    /// Area both observed and predicted (hits)
    pub intersection: f64,
    /// Area observed but not predicted (misses)
    pub observed_only: f64,
    /// Area predicted but not observed (false alarms)
    pub predicted_only: f64,
}

impl OverlapResult {
    pub fn observed_area(&self) -> f64 {
        self.intersection + self.observed_only
    }

    pub fn predicted_area(&self) -> f64 {
        self.intersection + self.predicted_only
    }

    /// Same table with the roles of observed and predicted exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            intersection: self.intersection,
            observed_only: self.predicted_only,
            predicted_only: self.observed_only,
        }
    }
}

/// Compute intersection and both set differences of `observed` and `predicted`
///
/// # Errors
/// Returns `VerifyError::GeometryLoad` if the shapes are in different spatial
/// references; areas are only comparable within one planar reference.
pub fn compute_overlap(observed: &GeoShape, predicted: &GeoShape) -> Result<OverlapResult> {
    if observed.spatial_ref() != predicted.spatial_ref() {
        return Err(VerifyError::GeometryLoad {
            path: "<overlap>".into(),
            reason: format!(
                "observed is {} but predicted is {}",
                observed.spatial_ref(),
                predicted.spatial_ref()
            ),
        });
    }

    let obs = observed.dissolved();
    let pred = predicted.dissolved();

    if obs.0.is_empty() || pred.0.is_empty() {
        return Ok(OverlapResult {
            intersection: 0.0,
            observed_only: obs.unsigned_area(),
            predicted_only: pred.unsigned_area(),
        });
    }

    let observed_only = obs.difference(&pred).unsigned_area();
    let predicted_only = pred.difference(&obs).unsigned_area();
    let intersection = pred.intersection(&obs).unsigned_area();

    // Round-off can leave slivers a hair below zero
    Ok(OverlapResult {
        intersection: intersection.max(0.0),
        observed_only: observed_only.max(0.0),
        predicted_only: predicted_only.max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SpatialRef;
    use approx::assert_relative_eq;
    use geo::{polygon, MultiPolygon, Polygon};

    fn rect(x0: f64, y0: f64, w: f64, h: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + w, y: y0),
            (x: x0 + w, y: y0 + h),
            (x: x0, y: y0 + h),
        ]
    }

    fn shape(parts: Vec<Polygon<f64>>) -> GeoShape {
        GeoShape::new(MultiPolygon::new(parts), SpatialRef::BC_ALBERS)
    }

    #[test]
    fn test_identical_squares() {
        let x = shape(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let result = compute_overlap(&x, &x).unwrap();
        assert_relative_eq!(result.intersection, 100.0, epsilon = 1e-6);
        assert_relative_eq!(result.observed_only, 0.0, epsilon = 1e-6);
        assert_relative_eq!(result.predicted_only, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_half_overlap() {
        let obs = shape(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let pred = shape(vec![rect(5.0, 0.0, 10.0, 10.0)]);
        let result = compute_overlap(&obs, &pred).unwrap();
        assert_relative_eq!(result.intersection, 50.0, epsilon = 1e-6);
        assert_relative_eq!(result.observed_only, 50.0, epsilon = 1e-6);
        assert_relative_eq!(result.predicted_only, 50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_disjoint() {
        let obs = shape(vec![rect(0.0, 0.0, 2.0, 2.0)]);
        let pred = shape(vec![rect(10.0, 10.0, 3.0, 3.0)]);
        let result = compute_overlap(&obs, &pred).unwrap();
        assert_relative_eq!(result.intersection, 0.0, epsilon = 1e-9);
        assert_relative_eq!(result.observed_only, 4.0, epsilon = 1e-9);
        assert_relative_eq!(result.predicted_only, 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_operands() {
        let obs = shape(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let empty = GeoShape::empty(SpatialRef::BC_ALBERS);

        let result = compute_overlap(&obs, &empty).unwrap();
        assert_eq!(result.intersection, 0.0);
        assert_relative_eq!(result.observed_only, 100.0, epsilon = 1e-9);
        assert_eq!(result.predicted_only, 0.0);

        let result = compute_overlap(&empty, &obs).unwrap();
        assert_eq!(result.observed_only, 0.0);
        assert_relative_eq!(result.predicted_only, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_multipart_against_single_part() {
        // Two observed islands, one predicted blob covering half of each
        let obs = shape(vec![rect(0.0, 0.0, 4.0, 4.0), rect(10.0, 0.0, 4.0, 4.0)]);
        let pred = shape(vec![rect(2.0, 0.0, 10.0, 4.0)]);
        let result = compute_overlap(&obs, &pred).unwrap();
        assert_relative_eq!(result.intersection, 16.0, epsilon = 1e-6);
        assert_relative_eq!(result.observed_only, 16.0, epsilon = 1e-6);
        assert_relative_eq!(result.predicted_only, 24.0, epsilon = 1e-6);
    }

    #[test]
    fn test_holes_are_respected() {
        let donut = Polygon::new(
            rect(0.0, 0.0, 10.0, 10.0).exterior().clone(),
            vec![rect(4.0, 4.0, 2.0, 2.0).exterior().clone()],
        );
        let obs = shape(vec![donut]);
        let pred = shape(vec![rect(0.0, 0.0, 10.0, 10.0)]);
        let result = compute_overlap(&obs, &pred).unwrap();
        assert_relative_eq!(result.intersection, 96.0, epsilon = 1e-6);
        assert_relative_eq!(result.predicted_only, 4.0, epsilon = 1e-6);
        assert_relative_eq!(result.observed_only, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mismatched_references_rejected() {
        let obs = shape(vec![rect(0.0, 0.0, 1.0, 1.0)]);
        let pred = GeoShape::from_polygon(rect(0.0, 0.0, 1.0, 1.0), SpatialRef::WGS84);
        assert!(matches!(
            compute_overlap(&obs, &pred),
            Err(VerifyError::GeometryLoad { .. })
        ));
    }

    #[test]
    fn test_swapped() {
        let result = OverlapResult {
            intersection: 3.0,
            observed_only: 1.0,
            predicted_only: 2.0,
        };
        let swapped = result.swapped();
        assert_eq!(swapped.observed_only, 2.0);
        assert_eq!(swapped.predicted_only, 1.0);
        assert_eq!(result.observed_area(), 4.0);
        assert_eq!(result.predicted_area(), 5.0);
    }
}
