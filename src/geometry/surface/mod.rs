mod height_field;
mod trimmed;

pub use height_field::{HeightField, HeightGrid};
pub use trimmed::TrimmedSurface;
