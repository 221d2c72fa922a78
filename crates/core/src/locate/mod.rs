//! Temporal locators
//!
//! One locator per data source. Each picks exactly one artifact for a fire using
//! its own time rule:
//!
//! - [`ModelALocator`]: catalog filter by fire and minimum duration, caller picks
//!   among ties
//! - [`ModelBLocator`]: run directory nearest in time to a target
//! - [`PerimeterLocator`]: earliest snapshot strictly after both model times

pub mod artifact;
pub mod model_a;
pub mod model_b;
pub mod perimeter;

pub use artifact::{ArtifactSource, TimedArtifact};
pub use model_a::{CandidateSelector, FixedChoice, ModelALocator, SingleCandidateOnly};
pub use model_b::{nearest_run, ModelBLocator};
pub use perimeter::{eligible_snapshots, PerimeterLocator};
