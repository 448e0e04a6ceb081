//! The planning engine: raster passes over a trimmed surface, their
//! connection into continuous spray paths, and the thickness slicing loop
//! that layers those paths up to a target profile.

mod boundary_offset;
mod connect;
mod geodesic_field;
mod isolines;
mod normals;
mod raster;
mod slicer;
mod speed;
mod targets;
mod trim;

pub use boundary_offset::{OffsetBoundary, OffsetHoles};
pub use connect::{shortest_arc, AvoidHoles, ConnectNearestNeighbor, ConnectThroughBoundary, Fragment};
pub use geodesic_field::{Geodesics, RAIL_BOXES};
pub use isolines::OrthoGeodesics;
pub use normals::{unsafe_normal, AlignNormal};
pub use raster::{boundary_edges, BoundaryEdge, EdgePath, FilterCurvesByDistance, RasterPass, RasterPlan, RasterPlanner};
pub use slicer::{Slice, SlicerState, SlicingOutcome, SlicingResult, StepOutcome, ThicknessSlicer};
pub use speed::{AssignSpeeds, SpeedRegion};
pub use targets::{ExtractTargets, Target};
pub use trim::{TrimCurve, TrimPiece, TrimRegion, TrimResult};
