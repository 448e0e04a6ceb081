pub mod curve;
pub mod region;
pub mod surface;

pub use curve::{Curve, CurveDomain, Polyline};
pub use region::Region;
pub use surface::{HeightField, HeightGrid, TrimmedSurface};
