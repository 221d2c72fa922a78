//! ESRI shapefile import
//!
//! Reads `.shp` geometry with its `.dbf` attribute table. The source reference
//! comes from the `.prj` sidecar's WKT. Attributes are converted to JSON values
//! so shapefile and GeoJSON records filter identically.

use std::collections::HashMap;
use std::path::Path;

use geo::{Coord, MultiPolygon, Polygon};
use geojson::{JsonObject, JsonValue};
use shapefile::dbase::FieldValue;
use shapefile::{Point, PointM, PointZ, PolygonRing, Shape};
use tracing::debug;

use super::projection::Transform;
use super::shape::{GeoShape, SpatialRef};
use super::vector::{assemble_polygon, project_ring, VectorLayer, VectorRecord};
use crate::error::{Result, VerifyError};

/// Load a shapefile as normalized records in `target`
///
/// # Errors
/// Returns `VerifyError::GeometryLoad` if the `.prj` sidecar is missing or
/// unrecognised, the `.shp`/`.dbf` pair cannot be read, or no record is polygonal.
pub fn load_shapefile(path: &Path, target: SpatialRef) -> Result<VectorLayer> {
    let source = prj_reference(path)?;
    let transform =
        Transform::between(source, target).map_err(|e| VerifyError::geometry_load(path, e))?;

    let mut reader =
        shapefile::Reader::from_path(path).map_err(|e| VerifyError::geometry_load(path, e))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(|e| VerifyError::geometry_load(path, e))?;
        let polygons =
            shape_polygons(&shape, &transform).map_err(|e| VerifyError::geometry_load(path, e))?;
        if polygons.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(VectorRecord {
            shape: GeoShape::new(MultiPolygon::new(polygons), target),
            properties: attributes(HashMap::from(record)),
        });
    }

    if skipped > 0 {
        debug!("Skipped {skipped} non-polygonal records in {}", path.display());
    }
    VectorLayer::from_records(path, target, records)
}

/// Reference declared by the `.prj` sidecar next to `path`
fn prj_reference(path: &Path) -> Result<SpatialRef> {
    let prj = path.with_extension("prj");
    let wkt = std::fs::read_to_string(&prj).map_err(|e| {
        VerifyError::geometry_load(path, format!("cannot read {}: {e}", prj.display()))
    })?;
    SpatialRef::from_wkt(&wkt).ok_or_else(|| {
        VerifyError::geometry_load(path, format!("unrecognised reference in {}", prj.display()))
    })
}

/// Polygonal parts of one shape; M and Z values are dropped
///
/// Shapefile polygons list their rings flat: every outer ring starts a new part
/// and the inner rings after it are its holes.
fn shape_polygons(
    shape: &Shape,
    transform: &Transform,
) -> std::result::Result<Vec<Polygon<f64>>, String> {
    let rings = match shape {
        Shape::Polygon(p) => ring_coords(p.rings(), |pt: &Point| (pt.x, pt.y)),
        Shape::PolygonM(p) => ring_coords(p.rings(), |pt: &PointM| (pt.x, pt.y)),
        Shape::PolygonZ(p) => ring_coords(p.rings(), |pt: &PointZ| (pt.x, pt.y)),
        _ => return Ok(Vec::new()),
    };

    let mut polygons = Vec::new();
    let mut current = Vec::new();
    for (is_outer, coords) in rings {
        if is_outer && !current.is_empty() {
            polygons.extend(assemble_polygon(std::mem::take(&mut current)));
        }
        current.push(project_ring(coords, transform)?);
    }
    polygons.extend(assemble_polygon(current));
    Ok(polygons)
}

/// Each ring's coordinates, flagged `true` for outer rings
fn ring_coords<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
) -> Vec<(bool, Vec<Coord<f64>>)> {
    rings
        .iter()
        .map(|ring| {
            let coords = ring
                .points()
                .iter()
                .map(|point| {
                    let (x, y) = xy(point);
                    Coord { x, y }
                })
                .collect();
            (matches!(ring, PolygonRing::Outer(_)), coords)
        })
        .collect()
}

fn attributes(fields: HashMap<String, FieldValue>) -> JsonObject {
    fields
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                FieldValue::Character(Some(s)) | FieldValue::Memo(s) => JsonValue::from(s),
                FieldValue::Numeric(Some(n)) => JsonValue::from(n),
                FieldValue::Float(Some(n)) => JsonValue::from(f64::from(n)),
                FieldValue::Integer(n) => JsonValue::from(n),
                FieldValue::Double(n) | FieldValue::Currency(n) => JsonValue::from(n),
                FieldValue::Logical(Some(b)) => JsonValue::from(b),
                _ => JsonValue::Null,
            };
            (name, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_conversion() {
        let fields = HashMap::from([
            ("FIRE_NUMBE".to_string(), FieldValue::Character(Some("K52125".to_string()))),
            ("FIRE_SIZE".to_string(), FieldValue::Numeric(Some(12.5))),
            ("EMPTY".to_string(), FieldValue::Character(None)),
        ]);
        let object = attributes(fields);
        assert_eq!(object["FIRE_NUMBE"], JsonValue::from("K52125"));
        assert_eq!(object["FIRE_SIZE"].as_f64(), Some(12.5));
        assert!(object["EMPTY"].is_null());
    }

    #[test]
    fn test_missing_prj_is_geometry_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perims.shp");
        let err = load_shapefile(&path, SpatialRef::BC_ALBERS).unwrap_err();
        assert!(matches!(err, VerifyError::GeometryLoad { .. }));
        assert!(err.to_string().contains("perims.prj"), "{err}");
    }

    #[test]
    fn test_unknown_prj_is_geometry_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("perims.prj"), r#"LOCAL_CS["site grid"]"#).unwrap();
        let path = dir.path().join("perims.shp");
        let err = load_shapefile(&path, SpatialRef::BC_ALBERS).unwrap_err();
        assert!(err.to_string().contains("unrecognised reference"), "{err}");
    }
}
