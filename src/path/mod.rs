mod speed_range;
mod spray_curve;
mod spray_path;

pub use speed_range::SpeedRange;
pub use spray_curve::SprayCurve;
pub use spray_path::SprayPath;
