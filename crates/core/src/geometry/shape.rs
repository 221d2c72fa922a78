//! Uniform multi-polygon shape and its spatial reference

use std::fmt;
use std::sync::LazyLock;

use geo::{Area, BooleanOps, MultiPolygon, Polygon};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outermost authority code of a WKT definition (WKT1 `AUTHORITY`, WKT2 `ID`)
static WKT_EPSG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).expect("valid regex")
});

/// Leading CRS keyword and its quoted name
static WKT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(PROJCS|PROJCRS|GEOGCS|GEOGCRS)\[\s*"([^"]+)""#).expect("valid regex")
});

static UTM_ZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UTM[ _]ZONE[ _](\d{1,2})N").expect("valid regex"));

/// A coordinate reference system identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialRef(u32);

impl SpatialRef {
    /// WGS 84 geographic (lon/lat degrees), the GeoJSON default
    pub const WGS84: Self = Self(4326);
    /// NAD83 geographic (lon/lat degrees)
    pub const NAD83: Self = Self(4269);
    /// NAD83 / BC Albers, planar metres
    pub const BC_ALBERS: Self = Self(3005);

    pub const fn from_epsg(code: u32) -> Self {
        Self(code)
    }

    pub const fn epsg(self) -> u32 {
        self.0
    }

    /// Whether coordinates are lon/lat degrees on a datum treated as WGS 84
    ///
    /// Covers WGS 84, NAD83 and NAD83(CSRS).
    pub const fn is_geographic(self) -> bool {
        matches!(self.0, 4326 | 4269 | 4617)
    }

    /// Parse a CRS name as found in config files and legacy GeoJSON `crs` members
    ///
    /// Accepts `EPSG:3005`, `urn:ogc:def:crs:EPSG::26910`, `CRS84` and bare codes.
    /// Other authorities are rejected.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_uppercase();
        if name.ends_with("CRS84") {
            return Some(Self::WGS84);
        }
        if name.contains(':') && !name.contains("EPSG") {
            return None;
        }
        let code = name.rsplit(':').next()?.parse::<u32>().ok()?;
        (code > 0).then_some(Self(code))
    }

    /// Reference described by a WKT string, e.g. a shapefile `.prj` sidecar
    ///
    /// An explicit EPSG authority wins. ESRI-flavoured WKT carries no authority,
    /// so the common BC archive references are also recognised by name.
    pub fn from_wkt(wkt: &str) -> Option<Self> {
        if let Some(code) = WKT_EPSG
            .captures_iter(wkt)
            .last()
            .and_then(|c| c[1].parse::<u32>().ok())
        {
            return Some(Self(code));
        }

        let captures = WKT_NAME.captures(wkt)?;
        let name = captures[2].to_ascii_uppercase().replace(' ', "_");
        let is_nad83 = name.contains("NAD_1983") || name.contains("NAD83");
        let is_wgs84 = name.contains("WGS_1984") || name.contains("WGS_84");

        if captures[1].starts_with("PROJ") {
            if name.contains("BC_ENVIRONMENT_ALBERS") || name.contains("BC_ALBERS") {
                return Some(Self::BC_ALBERS);
            }
            let zone = UTM_ZONE.captures(&name)?[1].parse::<u32>().ok()?;
            return match (is_nad83, is_wgs84) {
                (true, _) => Some(Self(26900 + zone)),
                (_, true) => Some(Self(32600 + zone)),
                _ => None,
            };
        }
        if is_wgs84 {
            Some(Self::WGS84)
        } else if is_nad83 || name.contains("NORTH_AMERICAN_1983") {
            Some(Self::NAD83)
        } else {
            None
        }
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// An ordered multi-polygon tagged with its spatial reference
///
/// Single polygons are always wrapped into a one-element multi-polygon, so there is
/// no polygon/multi-polygon split once a shape exists.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoShape {
    polygons: MultiPolygon<f64>,
    spatial_ref: SpatialRef,
}

impl GeoShape {
    pub fn new(polygons: MultiPolygon<f64>, spatial_ref: SpatialRef) -> Self {
        Self {
            polygons,
            spatial_ref,
        }
    }

    /// Wrap one polygon as a one-element multi-polygon
    pub fn from_polygon(polygon: Polygon<f64>, spatial_ref: SpatialRef) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]), spatial_ref)
    }

    pub fn empty(spatial_ref: SpatialRef) -> Self {
        Self::new(MultiPolygon::new(Vec::new()), spatial_ref)
    }

    /// Concatenate the parts of several shapes sharing one reference
    pub fn merge<'a>(
        shapes: impl IntoIterator<Item = &'a GeoShape>,
        spatial_ref: SpatialRef,
    ) -> Self {
        let polygons = shapes
            .into_iter()
            .flat_map(|shape| shape.polygons.0.iter().cloned())
            .collect();
        Self::new(MultiPolygon::new(polygons), spatial_ref)
    }

    pub fn spatial_ref(&self) -> SpatialRef {
        self.spatial_ref
    }

    pub fn part_count(&self) -> usize {
        self.polygons.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.0.is_empty()
    }

    /// Union of all parts, so overlapping parts cover their area once
    pub fn dissolved(&self) -> MultiPolygon<f64> {
        match self.polygons.0.as_slice() {
            [] | [_] => self.polygons.clone(),
            [first, rest @ ..] => rest
                .iter()
                .fold(MultiPolygon::new(vec![first.clone()]), |acc, part| {
                    acc.union(part)
                }),
        }
    }

    /// Covered area in the square of the reference's linear unit
    pub fn area(&self) -> f64 {
        self.dissolved().unsigned_area()
    }
}
