use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::{OperationError, Result};
use crate::geometry::curve::Polyline;
use crate::geometry::surface::{HeightField, TrimmedSurface};
use crate::math::Vector3;
use crate::operations::modification::SplitByCutter;
use crate::path::{SpeedRange, SprayCurve, SprayPath};

use super::boundary_offset::OffsetHoles;
use super::connect::{AvoidHoles, ConnectThroughBoundary, Fragment};
use super::raster::RasterPass;
use super::speed::{AssignSpeeds, SpeedRegion};
use super::trim::{TrimCurve, TrimRegion};

/// One layer of deposited material.
#[derive(Debug, Clone)]
pub struct Slice {
    /// The sprayed piece, moved up to the height the layer starts at.
    pub surface: TrimmedSurface,
    /// Thickness this layer adds.
    pub depth: f64,
    /// Cumulative thickness at the top of the layer.
    pub thickness: f64,
}

/// How a slicing run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicingOutcome {
    /// No target surface: a single layer was planned.
    NoTarget,
    /// Every piece of the surface reached the target.
    Converged,
    /// No further material could be added.
    Stalled,
}

/// Result of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Stalled,
    Converged,
}

/// State of the slicing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlicerState {
    Iterating,
    Finished(SlicingOutcome),
}

/// Paths and layers produced by a slicing run.
#[derive(Debug, Clone)]
pub struct SlicingResult {
    pub paths: Vec<SprayPath>,
    pub slices: Vec<Slice>,
    pub outcome: SlicingOutcome,
    pub speed_range: Option<SpeedRange>,
}

impl SlicingResult {
    /// Cumulative thickness reached by the last layer.
    #[must_use]
    pub fn thickness(&self) -> f64 {
        self.slices.last().map_or(0.0, |s| s.thickness)
    }
}

#[derive(Debug, Default)]
struct Progress {
    thickness: f64,
    pass_index: usize,
    paths: Vec<SprayPath>,
    slices: Vec<Slice>,
    speed_range: Option<SpeedRange>,
}

impl Progress {
    fn emit(&mut self, path: SprayPath) {
        self.speed_range = SpeedRange::merge(self.speed_range, path.speed_range());
        self.paths.push(path);
    }
}

/// Forward and repeat segments of a pass that fall on one piece.
struct PieceSegments {
    pass: usize,
    forward: Vec<SprayCurve>,
    repeat: Vec<SprayCurve>,
}

/// Layers raster passes until the deposited profile reaches a target surface.
///
/// Each iteration lowers the target by the thickness deposited so far and
/// splits the surface by it. Pieces still below the lowered target are
/// sprayed with the current raster pass trimmed to the piece (falling back to
/// the following passes when it leaves too little on the piece), and the
/// deposited volume is spread evenly over the sprayed area. Successive
/// iterations rotate through the passes. Without a target a single layer of
/// the first pass is planned.
pub struct ThicknessSlicer<'a> {
    surface: &'a TrimmedSurface,
    extended: &'a HeightField,
    passes: &'a [RasterPass],
    config: &'a PlannerConfig,
    target: Option<&'a HeightField>,
    speed_regions: &'a [SpeedRegion],
}

impl<'a> ThicknessSlicer<'a> {
    /// Creates a new `ThicknessSlicer`.
    #[must_use]
    pub fn new(
        surface: &'a TrimmedSurface,
        extended: &'a HeightField,
        passes: &'a [RasterPass],
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            surface,
            extended,
            passes,
            config,
            target: None,
            speed_regions: &[],
        }
    }

    /// Sets the top surface to build up to.
    #[must_use]
    pub fn with_target(mut self, target: &'a HeightField) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the speed regions used to re-tag trimmed paths. Without regions,
    /// trimmed segments keep the speeds of their pass.
    #[must_use]
    pub fn with_speed_regions(mut self, regions: &'a [SpeedRegion]) -> Self {
        self.speed_regions = regions;
        self
    }

    /// Executes the slicing run.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] when there are no raster
    /// passes, and propagates configuration and geometry failures.
    pub fn execute(&self) -> Result<SlicingResult> {
        self.config.validate()?;
        if self.passes.is_empty() {
            return Err(OperationError::InvalidInput("at least one raster pass is required".into()).into());
        }
        let Some(target) = self.target else {
            return Ok(self.single_layer());
        };

        let holes = OffsetHoles::new(self.surface, self.extended, self.config.raster.expand_distance)
            .with_tolerance(self.config.tolerance)
            .execute()?;
        let mut progress = Progress::default();
        let mut state = SlicerState::Iterating;
        let mut iteration = 0_usize;
        let outcome = loop {
            state = match state {
                SlicerState::Finished(outcome) => break outcome,
                SlicerState::Iterating if iteration >= self.config.spray.max_iterations => {
                    warn!(iteration, thickness = progress.thickness, "iteration limit reached");
                    SlicerState::Finished(SlicingOutcome::Stalled)
                }
                SlicerState::Iterating => {
                    let step = self.step(target, &holes, &mut progress)?;
                    debug!(iteration, ?step, thickness = progress.thickness, "slicing step");
                    iteration += 1;
                    match step {
                        StepOutcome::Continue => SlicerState::Iterating,
                        StepOutcome::Stalled => SlicerState::Finished(SlicingOutcome::Stalled),
                        StepOutcome::Converged => SlicerState::Finished(SlicingOutcome::Converged),
                    }
                }
            };
        };

        info!(?outcome, layers = progress.slices.len(), thickness = progress.thickness, "slicing finished");
        Ok(SlicingResult {
            paths: progress.paths,
            slices: progress.slices,
            outcome,
            speed_range: progress.speed_range,
        })
    }

    fn single_layer(&self) -> SlicingResult {
        let spray = &self.config.spray;
        let pass = &self.passes[0];
        let area = self.surface.area();
        let mut progress = Progress::default();
        for i in 0..spray.path_repeat {
            let path = if i % 2 == 0 { &pass.path } else { &pass.repeat_path };
            if area > 0.0 {
                progress.thickness += path.duration() * spray.flow_rate / area;
            }
            progress.emit(path.clone());
        }
        progress.slices.push(Slice {
            surface: self.surface.clone(),
            depth: progress.thickness,
            thickness: progress.thickness,
        });
        info!(thickness = progress.thickness, "planned single layer");
        SlicingResult {
            paths: progress.paths,
            slices: progress.slices,
            outcome: SlicingOutcome::NoTarget,
            speed_range: progress.speed_range,
        }
    }

    fn step(&self, target: &HeightField, holes: &[Polyline], progress: &mut Progress) -> Result<StepOutcome> {
        let spray = &self.config.spray;
        let tol = self.config.tolerance.distance;
        let cutter = target.translated(&Vector3::new(0.0, 0.0, -progress.thickness / spray.thickness_factor));

        let mut pieces: Vec<TrimmedSurface> = SplitByCutter::new(self.surface, &cutter)
            .execute()?
            .into_iter()
            .map(|p| p.surface)
            .filter(|s| s.area() > tol)
            .collect();
        if pieces.is_empty() {
            pieces.push(self.surface.clone());
        }
        pieces.retain(|piece| needs_material(piece, &cutter));
        if pieces.is_empty() {
            return Ok(StepOutcome::Converged);
        }

        let lift = Vector3::new(0.0, 0.0, progress.thickness);
        let mut volume = 0.0;
        let mut sprayed: Vec<TrimmedSurface> = Vec::new();
        for piece in pieces {
            let Some(segments) = self.segments_on(&piece, progress.pass_index)? else {
                debug!("no raster pass covers piece");
                continue;
            };
            let boundary = &self.passes[segments.pass].boundary;
            let forward = self.reconnect(&segments.forward, boundary, holes)?;
            let repeat = self.reconnect(&segments.repeat, boundary, holes)?;
            let repeat_length = if spray.path_repeat > 1 { repeat.length() } else { 0.0 };
            if forward.length() + repeat_length <= self.config.raster.pitch {
                continue;
            }

            let (primary, secondary) = if forward.is_empty() { (&repeat, &forward) } else { (&forward, &repeat) };
            let alternate = if secondary.is_empty() { primary } else { secondary };
            for i in 0..spray.path_repeat {
                let path = if i % 2 == 0 { primary } else { alternate };
                progress.emit(path.translated(&lift));
            }
            volume += primary.duration() * spray.flow_rate * spray.path_repeat as f64;
            sprayed.push(piece);
        }
        if sprayed.is_empty() {
            return Ok(StepOutcome::Stalled);
        }

        let area: f64 = sprayed.iter().map(TrimmedSurface::area).sum();
        let added = if area > 0.0 { volume / area } else { 0.0 };
        if added <= 0.0 {
            return Ok(StepOutcome::Stalled);
        }
        for piece in sprayed {
            progress.slices.push(Slice {
                surface: piece.translated(&lift),
                depth: added,
                thickness: progress.thickness + added,
            });
        }
        progress.thickness += added;
        progress.pass_index = (progress.pass_index + 1) % self.passes.len();
        Ok(StepOutcome::Continue)
    }

    /// Trims passes to `piece`, starting at `first` and moving on to the
    /// next pass while the trimmed segments are no longer than the pitch.
    fn segments_on(&self, piece: &TrimmedSurface, first: usize) -> Result<Option<PieceSegments>> {
        let pitch = self.config.raster.pitch;
        let with_repeat = self.config.spray.path_repeat > 1;
        let mut pass = first;
        loop {
            let forward = self.trim_to_piece(&self.passes[pass].path, piece)?;
            let repeat = if with_repeat {
                self.trim_to_piece(&self.passes[pass].repeat_path, piece)?
            } else {
                Vec::new()
            };
            let length: f64 = forward.iter().chain(&repeat).map(SprayCurve::length).sum();
            if length > pitch {
                return Ok(Some(PieceSegments { pass, forward, repeat }));
            }
            pass = (pass + 1) % self.passes.len();
            if pass == first {
                return Ok(None);
            }
            debug!(pass, "retrying piece with next raster pass");
        }
    }

    fn trim_to_piece(&self, path: &SprayPath, piece: &TrimmedSurface) -> Result<Vec<SprayCurve>> {
        let mut path = path.clone();
        path.trim_connectors();
        let mut segments = Vec::new();
        for curve in &path {
            let trimmed = TrimCurve::new(&curve.curve, TrimRegion::Surface(piece))
                .with_margin(self.config.raster.expand_distance)
                .with_tolerance(self.config.tolerance)
                .execute()?;
            segments.extend(trimmed.inside().into_iter().map(|c| curve.with_curve(c)));
        }
        Ok(segments)
    }

    fn reconnect(&self, segments: &[SprayCurve], boundary: &Polyline, holes: &[Polyline]) -> Result<SprayPath> {
        let tolerance = self.config.tolerance;
        let fragments: Vec<Fragment> = segments.iter().cloned().map(Fragment::from).collect();
        let connected = ConnectThroughBoundary::new(&fragments, boundary)
            .with_tolerance(tolerance)
            .execute()?;
        let routed = AvoidHoles::new(holes).with_tolerance(tolerance).execute(&connected)?;
        Ok(AssignSpeeds::new(self.speed_regions, self.config.spray.connector_speed)
            .with_tolerance(tolerance)
            .execute(&routed))
    }
}

/// Whether the cutter lies above the piece at the sample point farthest from
/// it.
fn needs_material(piece: &TrimmedSurface, cutter: &HeightField) -> bool {
    piece
        .sample_points()
        .iter()
        .map(|p| cutter.height_above(p))
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .is_some_and(|gap| gap > 0.0)
}
