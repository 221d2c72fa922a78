//! Observed-perimeter locator
//!
//! Forward-only search: a snapshot is eligible only if it was taken strictly
//! after both model times. Eligible snapshots are tried earliest first, and the
//! scan moves on when a snapshot has no record for the fire.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::artifact::{ArtifactSource, TimedArtifact};
use crate::catalog::{files_with_extension, scan_snapshot_dirs, PerimeterSnapshotDir};
use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::geometry::{load_layer, GeoShape, SpatialRef, VectorLayer};

/// Snapshots taken strictly after both `time_a` and `time_b`, keeping input order
pub fn eligible_snapshots(
    snapshots: &[PerimeterSnapshotDir],
    time_a: NaiveDateTime,
    time_b: NaiveDateTime,
) -> impl Iterator<Item = &PerimeterSnapshotDir> {
    let after = time_a.max(time_b);
    snapshots.iter().filter(move |s| s.observed > after)
}

/// Locates the observed perimeter for a fire
#[derive(Debug, Clone)]
pub struct PerimeterLocator {
    archive_root: PathBuf,
    extension: String,
    fire_id_columns: Vec<String>,
    target: SpatialRef,
}

impl PerimeterLocator {
    pub fn new(
        archive_root: impl Into<PathBuf>,
        extension: impl Into<String>,
        fire_id_columns: Vec<String>,
        target: SpatialRef,
    ) -> Self {
        Self {
            archive_root: archive_root.into(),
            extension: extension.into(),
            fire_id_columns,
            target,
        }
    }

    /// # Errors
    /// Returns `VerifyError::Config` for an unsupported target CRS.
    pub fn from_config(config: &VerifyConfig) -> Result<Self> {
        Ok(Self::new(
            &config.perimeter.archive_root,
            &config.perimeter.extension,
            config.perimeter.fire_id_columns.clone(),
            config.target_ref()?,
        ))
    }

    /// Earliest snapshot after both times that contains the fire
    ///
    /// # Errors
    /// - `CatalogNotFound` when the archive root is missing
    /// - `NoMatch` when no snapshot is late enough, or none of the late-enough
    ///   snapshots has a record for the fire
    pub fn locate(
        &self,
        fire_id: &str,
        time_a: NaiveDateTime,
        time_b: NaiveDateTime,
    ) -> Result<TimedArtifact> {
        let snapshots = scan_snapshot_dirs(&self.archive_root)?;
        let mut tried = 0usize;

        for snapshot in eligible_snapshots(&snapshots, time_a, time_b) {
            tried += 1;
            let files = files_with_extension(&snapshot.path, &self.extension);
            let Some(path) = files.into_iter().next() else {
                warn!("Snapshot {} has no .{} file", snapshot.name, self.extension);
                continue;
            };
            let layer = match load_layer(&path, self.target) {
                Ok(layer) => layer,
                Err(e) => {
                    warn!("Error processing snapshot '{}': {e}", snapshot.name);
                    continue;
                }
            };
            match self.fire_shape(&layer, fire_id) {
                Some(shape) => {
                    info!("Perimeter snapshot {} ({})", snapshot.name, snapshot.observed);
                    return Ok(TimedArtifact::new(
                        ArtifactSource::Perimeter,
                        shape,
                        snapshot.observed,
                        path,
                    ));
                }
                None => warn!("Snapshot {} has no perimeter for fire {fire_id}", snapshot.name),
            }
        }

        let reason = if tried == 0 {
            format!("no perimeter snapshot after both {time_a} and {time_b}")
        } else {
            format!(
                "none of {tried} perimeter snapshots after both {time_a} and {time_b} \
                 contain the fire"
            )
        };
        Err(VerifyError::no_match(fire_id, reason))
    }

    /// Records for `fire_id`, using the first id column the layer carries
    fn fire_shape(&self, layer: &VectorLayer, fire_id: &str) -> Option<GeoShape> {
        let Some(column) = self.fire_id_columns.iter().find(|c| layer.has_column(c)) else {
            warn!(
                "{} has none of the fire id columns {:?}",
                layer.path().display(),
                self.fire_id_columns
            );
            return None;
        };
        let matching: Vec<&GeoShape> = layer
            .records()
            .iter()
            .filter(|r| r.text_property(column).as_deref() == Some(fire_id))
            .map(|r| &r.shape)
            .collect();
        if matching.is_empty() {
            None
        } else {
            Some(GeoShape::merge(matching, layer.spatial_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};
    use std::fs;
    use std::path::Path;

    fn snap(name: &str, observed: NaiveDateTime) -> PerimeterSnapshotDir {
        PerimeterSnapshotDir {
            name: name.to_string(),
            path: PathBuf::from(name),
            observed,
        }
    }

    #[test]
    fn test_first_snapshot_after_both_times() {
        let ta = NaiveDate::from_ymd_opt(2023, 8, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let tb = ta + Duration::hours(3);
        let snapshots = vec![
            snap("early", ta - Duration::hours(1)),
            snap("between", ta + Duration::hours(2)),
            snap("late", tb + Duration::hours(6)),
        ];
        let first = eligible_snapshots(&snapshots, ta, tb).next().unwrap();
        assert_eq!(first.name, "late");
        // Order of the two times does not matter
        let first = eligible_snapshots(&snapshots, tb, ta).next().unwrap();
        assert_eq!(first.name, "late");
    }

    #[test]
    fn test_equal_time_is_not_eligible() {
        let ta = NaiveDate::from_ymd_opt(2023, 8, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let snapshots = vec![snap("same", ta)];
        assert_eq!(eligible_snapshots(&snapshots, ta, ta).count(), 0);
    }

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 8, 15)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// Planar square with one attribute
    fn write_snapshot(root: &Path, dir: &str, side: f64, properties: &str) {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        let doc = format!(
            r#"{{"type": "FeatureCollection",
            "crs": {{"type": "name", "properties": {{"name": "EPSG:3005"}}}},
            "features": [{{"type": "Feature", "properties": {{{properties}}},
            "geometry": {{"type": "Polygon", "coordinates":
            [[[0, 0], [{side}, 0], [{side}, {side}], [0, {side}], [0, 0]]]}}}}]}}"#
        );
        fs::write(dir.join("perims.geojson"), doc).unwrap();
    }

    fn locator(root: &Path) -> PerimeterLocator {
        PerimeterLocator::new(
            root,
            "geojson",
            vec!["FIRE_NUMBE".to_string(), "FIRE_NUM".to_string()],
            SpatialRef::BC_ALBERS,
        )
    }

    #[test]
    fn test_fallback_id_column() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), "polys_202308151500", 20.0, r#""FIRE_NUM": "K1""#);

        let found = locator(dir.path()).locate("K1", at(10), at(11)).unwrap();
        assert_eq!(found.source(), ArtifactSource::Perimeter);
        assert_eq!(found.timestamp(), at(15));
        assert_relative_eq!(found.shape().area(), 400.0, epsilon = 1e-6);
    }

    #[test]
    fn test_preferred_id_column_wins() {
        let dir = tempfile::tempdir().unwrap();
        // FIRE_NUMBE is checked first, so the stale FIRE_NUM value is ignored
        write_snapshot(
            dir.path(),
            "polys_202308151500",
            20.0,
            r#""FIRE_NUMBE": "K2", "FIRE_NUM": "K1""#,
        );
        let err = locator(dir.path()).locate("K1", at(10), at(11)).unwrap_err();
        assert!(matches!(err, VerifyError::NoMatch { .. }));
    }

    #[test]
    fn test_unusable_snapshots_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        // No file with the configured extension
        let empty = root.join("polys_202308151200");
        fs::create_dir_all(&empty).unwrap();
        fs::write(empty.join("readme.txt"), "pending upload").unwrap();

        // File present but not loadable
        let broken = root.join("polys_202308151300");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("perims.geojson"), "{ truncated").unwrap();

        // Neither id column
        write_snapshot(root, "polys_202308151400", 10.0, r#""FIRE_NAME": "Inks Lake""#);

        write_snapshot(root, "polys_202308151500", 30.0, r#""FIRE_NUMBE": "K1""#);

        let found = locator(root).locate("K1", at(10), at(11)).unwrap();
        assert_eq!(found.timestamp(), at(15));
        assert!(found.path().ends_with("polys_202308151500/perims.geojson"));
        assert_relative_eq!(found.shape().area(), 900.0, epsilon = 1e-6);
    }

    #[test]
    fn test_exhausted_scan_counts_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("polys_202308151200")).unwrap();
        write_snapshot(root, "polys_202308151400", 10.0, r#""FIRE_NAME": "Inks Lake""#);
        // Too early to count
        write_snapshot(root, "polys_202308150900", 10.0, r#""FIRE_NUMBE": "K1""#);

        let err = locator(root).locate("K1", at(10), at(11)).unwrap_err();
        assert!(matches!(err, VerifyError::NoMatch { .. }));
        assert!(err.to_string().contains("none of 2 perimeter snapshots"), "{err}");
    }

    #[test]
    fn test_missing_archive_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = locator(&dir.path().join("absent")).locate("K1", at(10), at(11)).unwrap_err();
        assert!(matches!(err, VerifyError::CatalogNotFound(_)));
    }
}
