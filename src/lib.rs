pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod path;
pub mod planning;
pub mod tessellation;

pub use error::{Result, SprayError};
