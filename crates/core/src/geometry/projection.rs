//! Coordinate transforms into the planar reference
//!
//! With the `proj-transforms` feature every EPSG pair goes through PROJ
//! (requires libproj). Without it, only geographic lon/lat into BC Albers is
//! available, through the built-in ellipsoidal Albers equal-area conic (Snyder,
//! *Map Projections: A Working Manual*, eqs. 14-3 to 14-12).

use std::fmt;

use geo::Coord;

use super::shape::SpatialRef;

/// GRS 80 semi-major axis (m)
const GRS80_A: f64 = 6_378_137.0;
/// GRS 80 first eccentricity squared
const GRS80_E2: f64 = 0.006_694_380_022_90;

/// Ellipsoidal Albers equal-area conic projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbersEqualArea {
    a: f64,
    e: f64,
    e2: f64,
    n: f64,
    c: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl AlbersEqualArea {
    /// Build a projection from its defining parameters (angles in degrees)
    ///
    /// # Arguments
    /// * `a`, `e2` - Ellipsoid semi-major axis (m) and eccentricity squared
    /// * `lat0`, `lon0` - Latitude and longitude of origin
    /// * `lat1`, `lat2` - Standard parallels
    /// * `false_easting`, `false_northing` - Offsets in metres
    #[expect(clippy::too_many_arguments, reason = "Mirrors the EPSG parameter list")]
    pub fn new(
        a: f64,
        e2: f64,
        lat0: f64,
        lon0: f64,
        lat1: f64,
        lat2: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let e = e2.sqrt();
        let (phi0, phi1, phi2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());

        let m1 = m(phi1, e2);
        let m2 = m(phi2, e2);
        let q0 = q(phi0, e, e2);
        let q1 = q(phi1, e, e2);
        let q2 = q(phi2, e, e2);

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = a * (c - n * q0).sqrt() / n;

        Self {
            a,
            e,
            e2,
            n,
            c,
            rho0,
            lon0: lon0.to_radians(),
            false_easting,
            false_northing,
        }
    }

    /// NAD83 / BC Albers (EPSG:3005)
    pub fn bc_albers() -> Self {
        Self::new(
            GRS80_A,
            GRS80_E2,
            45.0,
            -126.0,
            50.0,
            58.5,
            1_000_000.0,
            0.0,
        )
    }

    /// Project geographic degrees to easting/northing in metres
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let q = q(phi, self.e, self.e2);
        // Clamp guards the pole where C - nq can dip below zero by round-off
        let rho = self.a * (self.c - self.n * q).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon.to_radians() - self.lon0);
        (
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }
}

fn m(phi: f64, e2: f64) -> f64 {
    let sin = phi.sin();
    phi.cos() / (1.0 - e2 * sin * sin).sqrt()
}

fn q(phi: f64, e: f64, e2: f64) -> f64 {
    let sin = phi.sin();
    let es = e * sin;
    (1.0 - e2) * (sin / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// Transform from a source reference into the target reference
pub enum Transform {
    /// Coordinates are already in the target reference
    Identity,
    /// Geographic lon/lat to BC Albers metres, built in
    Albers(AlbersEqualArea),
    /// Any EPSG pair through PROJ
    #[cfg(feature = "proj-transforms")]
    Proj(Box<proj::Proj>),
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Albers(albers) => f.debug_tuple("Albers").field(albers).finish(),
            #[cfg(feature = "proj-transforms")]
            Self::Proj(_) => f.write_str("Proj"),
        }
    }
}

impl Transform {
    /// Transform from `from` to `to`
    ///
    /// WGS 84 and NAD83 differ by well under a metre in BC, so geographic
    /// references are treated as the same datum.
    ///
    /// # Errors
    /// Returns a message when no transform between the two references is available.
    pub fn between(from: SpatialRef, to: SpatialRef) -> Result<Self, String> {
        if from == to || (from.is_geographic() && to.is_geographic()) {
            return Ok(Self::Identity);
        }
        Self::reproject(from, to)
    }

    /// PROJ first; the built-in Albers covers lon/lat sources if PROJ has no
    /// usable database
    #[cfg(feature = "proj-transforms")]
    fn reproject(from: SpatialRef, to: SpatialRef) -> Result<Self, String> {
        match proj::Proj::new_known_crs(&from.to_string(), &to.to_string(), None) {
            Ok(p) => Ok(Self::Proj(Box::new(p))),
            Err(e) => Self::built_in(from, to)
                .map_err(|_| format!("PROJ cannot reproject {from} to {to}: {e}")),
        }
    }

    #[cfg(not(feature = "proj-transforms"))]
    fn reproject(from: SpatialRef, to: SpatialRef) -> Result<Self, String> {
        Self::built_in(from, to)
    }

    fn built_in(from: SpatialRef, to: SpatialRef) -> Result<Self, String> {
        if from.is_geographic() && to == SpatialRef::BC_ALBERS {
            Ok(Self::Albers(AlbersEqualArea::bc_albers()))
        } else {
            Err(format!(
                "cannot reproject {from} to {to}: build with the `proj-transforms` feature"
            ))
        }
    }

    /// # Errors
    /// Returns a message if PROJ rejects the coordinate.
    pub fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, String> {
        match self {
            Self::Identity => Ok(coord),
            Self::Albers(albers) => {
                let (x, y) = albers.forward(coord.x, coord.y);
                Ok(Coord { x, y })
            }
            #[cfg(feature = "proj-transforms")]
            Self::Proj(p) => p
                .convert((coord.x, coord.y))
                .map(|(x, y)| Coord { x, y })
                .map_err(|e| e.to_string()),
        }
    }
}
