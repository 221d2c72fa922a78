//! Geometry normalization
//!
//! Loads vector sources, reprojects them into a single planar reference and
//! coerces every polygon into a multi-polygon so downstream code only ever sees
//! one geometry shape.

pub mod projection;
pub mod shape;
pub mod shp;
pub mod vector;

pub use projection::{AlbersEqualArea, Transform};
pub use shape::{GeoShape, SpatialRef};
pub use shp::load_shapefile;
pub use vector::{load_layer, normalize, VectorLayer, VectorRecord};
