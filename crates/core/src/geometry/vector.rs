//! # Vector Data Import
//!
//! Parses GeoJSON sources into records of normalized shapes. Each feature's
//! polygonal content is reprojected into the target reference and coerced to a
//! multi-polygon; attributes are kept as raw JSON for the locators to filter on.
//! Shapefiles are read by [`super::shp`] into the same record type.
//!
//! ## Table of Contents
//! 1. VectorRecord / VectorLayer
//! 2. File loading
//! 3. Source reference detection
//! 4. Geometry conversion

use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue, Value};
use tracing::debug;

use super::projection::Transform;
use super::shape::{GeoShape, SpatialRef};
use super::shp::load_shapefile;
use crate::error::{Result, VerifyError};

// ============================================================================
// 1. VectorRecord / VectorLayer
// ============================================================================

/// One feature: its normalized shape plus attributes
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub shape: GeoShape,
    pub properties: JsonObject,
}

impl VectorRecord {
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Attribute coerced to a number
    ///
    /// Strings are trimmed first; archives sometimes carry stray newlines in
    /// numeric columns. Anything unparseable is `None`.
    pub fn numeric_property(&self, key: &str) -> Option<f64> {
        let value = match self.property(key)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Attribute as text, numbers rendered without quotes
    pub fn text_property(&self, key: &str) -> Option<String> {
        match self.property(key)? {
            JsonValue::String(s) => Some(s.trim().to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// All usable records of one vector source, in file order
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    path: PathBuf,
    spatial_ref: SpatialRef,
    records: Vec<VectorRecord>,
}

impl VectorLayer {
    /// Wrap already-normalized records
    ///
    /// # Errors
    /// Returns `VerifyError::GeometryLoad` when `records` is empty.
    pub(crate) fn from_records(
        path: &Path,
        spatial_ref: SpatialRef,
        records: Vec<VectorRecord>,
    ) -> Result<Self> {
        if records.is_empty() {
            return Err(VerifyError::geometry_load(path, "no usable polygon records"));
        }
        Ok(Self {
            path: path.to_path_buf(),
            spatial_ref,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spatial_ref(&self) -> SpatialRef {
        self.spatial_ref
    }

    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record carries the attribute
    pub fn has_column(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.properties.contains_key(name))
    }

    /// Every record's parts as one shape
    pub fn merged(&self) -> GeoShape {
        GeoShape::merge(self.records.iter().map(|r| &r.shape), self.spatial_ref)
    }

    /// Parse GeoJSON text; `path` is only used for error reporting
    ///
    /// # Errors
    /// Returns `VerifyError::GeometryLoad` for invalid GeoJSON, an unsupported source
    /// reference, or a document with no polygonal records.
    pub fn from_geojson_str(content: &str, path: &Path, target: SpatialRef) -> Result<Self> {
        let geojson: GeoJson = content
            .parse()
            .map_err(|e| VerifyError::geometry_load(path, e))?;

        let source =
            source_ref(&geojson).map_err(|reason| VerifyError::geometry_load(path, reason))?;
        let transform = Transform::between(source, target)
            .map_err(|reason| VerifyError::geometry_load(path, reason))?;

        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(g) => vec![Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        };

        let mut records = Vec::with_capacity(features.len());
        for (index, feature) in features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                debug!("Skipping feature {index} in {}: no geometry", path.display());
                continue;
            };
            let mut polygons = Vec::new();
            collect_polygons(&geometry.value, &transform, &mut polygons)
                .map_err(|reason| VerifyError::geometry_load(path, reason))?;
            if polygons.is_empty() {
                debug!("Skipping feature {index} in {}: no polygonal content", path.display());
                continue;
            }
            records.push(VectorRecord {
                shape: GeoShape::new(MultiPolygon::new(polygons), target),
                properties: feature.properties.unwrap_or_default(),
            });
        }

        Self::from_records(path, target, records)
    }
}

// ============================================================================
// 2. File loading
// ============================================================================

/// Load a vector file as normalized records in `target`
///
/// The reader is chosen by extension: `.shp` is read as an ESRI shapefile with
/// its `.dbf` attributes and `.prj` reference, `.geojson`/`.json` as GeoJSON.
///
/// # Errors
/// Returns `VerifyError::GeometryLoad` if the format is unknown, the file cannot
/// be read, or it holds no usable polygon records.
pub fn load_layer(path: &Path, target: SpatialRef) -> Result<VectorLayer> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let layer = match extension.as_str() {
        "shp" => load_shapefile(path, target)?,
        "geojson" | "json" => {
            let content =
                std::fs::read_to_string(path).map_err(|e| VerifyError::geometry_load(path, e))?;
            VectorLayer::from_geojson_str(&content, path, target)?
        }
        other => {
            return Err(VerifyError::geometry_load(
                path,
                format!("unsupported vector format '.{other}'"),
            ))
        }
    };
    debug!(
        "Loaded {} records from {} into {}",
        layer.len(),
        path.display(),
        target
    );
    Ok(layer)
}

/// Load a vector source and merge it into a single normalized shape
///
/// # Errors
/// Same as [`load_layer`].
pub fn normalize(path: &Path, target: SpatialRef) -> Result<GeoShape> {
    Ok(load_layer(path, target)?.merged())
}

// ============================================================================
// 3. Source reference detection
// ============================================================================

/// Reference named by the legacy `crs` member, WGS 84 when absent (RFC 7946)
fn source_ref(geojson: &GeoJson) -> std::result::Result<SpatialRef, String> {
    let foreign = match geojson {
        GeoJson::FeatureCollection(fc) => fc.foreign_members.as_ref(),
        GeoJson::Feature(f) => f.foreign_members.as_ref(),
        GeoJson::Geometry(g) => g.foreign_members.as_ref(),
    };
    let Some(crs) = foreign.and_then(|members| members.get("crs")) else {
        return Ok(SpatialRef::WGS84);
    };
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str)
        .ok_or_else(|| format!("unrecognised crs member {crs}"))?;
    SpatialRef::parse(name).ok_or_else(|| format!("unsupported source reference '{name}'"))
}

// ============================================================================
// 4. Geometry conversion
// ============================================================================

/// Append the polygonal parts of `value`, reprojected
///
/// Polygons become single parts, multi-polygons contribute every part and
/// collections are flattened. Points and lines contribute nothing.
fn collect_polygons(
    value: &Value,
    transform: &Transform,
    out: &mut Vec<Polygon<f64>>,
) -> std::result::Result<(), String> {
    match value {
        Value::Polygon(rings) => out.extend(polygon_from_rings(rings, transform)?),
        Value::MultiPolygon(polys) => {
            for rings in polys {
                out.extend(polygon_from_rings(rings, transform)?);
            }
        }
        Value::GeometryCollection(geoms) => {
            for geometry in geoms {
                collect_polygons(&geometry.value, transform, out)?;
            }
        }
        Value::Point(_)
        | Value::MultiPoint(_)
        | Value::LineString(_)
        | Value::MultiLineString(_) => {}
    }
    Ok(())
}

fn polygon_from_rings(
    rings: &[Vec<Vec<f64>>],
    transform: &Transform,
) -> std::result::Result<Option<Polygon<f64>>, String> {
    let mut converted = Vec::with_capacity(rings.len());
    for ring in rings {
        let coords = ring
            .iter()
            .filter(|position| position.len() >= 2)
            .map(|position| Coord {
                x: position[0],
                y: position[1],
            });
        converted.push(project_ring(coords, transform)?);
    }
    Ok(assemble_polygon(converted))
}

/// Reproject one ring's coordinates
pub(crate) fn project_ring(
    coords: impl IntoIterator<Item = Coord<f64>>,
    transform: &Transform,
) -> std::result::Result<LineString<f64>, String> {
    coords
        .into_iter()
        .map(|coord| transform.apply(coord))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(LineString::new)
}

/// Exterior ring first, then holes; degenerate rings are dropped
pub(crate) fn assemble_polygon(rings: Vec<LineString<f64>>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter();
    let exterior = rings.next()?;
    if exterior.0.len() < 3 {
        return None;
    }
    let interiors = rings.filter(|ring| ring.0.len() >= 3).collect();
    Some(Polygon::new(exterior, interiors))
}
