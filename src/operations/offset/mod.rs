mod offset_on_surface;

pub use offset_on_surface::OffsetOnSurface;
