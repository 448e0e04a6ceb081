mod closest_points;
mod curve_surface_distance;

pub use closest_points::{ClosestPoints, ClosestPointsResult};
pub use curve_surface_distance::CurveSurfaceDistance;
