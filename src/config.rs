//! Planner configuration.
//!
//! All parameter blocks deserialize from JSON with per-field defaults, so a
//! configuration file only needs to name what it changes.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Tolerances threaded through every geometric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Distance below which two points are considered coincident.
    pub distance: f64,
    /// Angle (radians) below which two directions are considered parallel.
    pub angle: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            distance: 1e-6,
            angle: 0.01_f64.to_radians(),
        }
    }
}

impl Tolerance {
    /// Creates a tolerance with the given distance and the default angle.
    #[must_use]
    pub fn with_distance(distance: f64) -> Self {
        Self {
            distance,
            ..Self::default()
        }
    }

    /// Squared distance tolerance.
    #[must_use]
    pub fn distance_sq(&self) -> f64 {
        self.distance * self.distance
    }
}

/// Parameters for raster pass generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Spacing between adjacent isolines.
    pub pitch: f64,
    /// Signed distance to offset the surface boundary by before trimming.
    pub expand_distance: f64,
    /// Number of geodesic rails spanning the surface.
    pub geodesic_count: usize,
    /// Boundary edges to build passes for; all edges when `None`.
    pub source_edges: Option<Vec<usize>>,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            pitch: 100.0,
            expand_distance: 0.0,
            geodesic_count: 10,
            source_edges: None,
        }
    }
}

/// Process parameters for spraying and thickness matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprayParams {
    /// Speed used on coverage curves when no speed regions are given.
    pub spray_speed: f64,
    /// Speed used on connector segments.
    pub connector_speed: f64,
    /// Volumetric flow rate.
    pub flow_rate: f64,
    /// Number of times each path is sprayed per layer.
    pub path_repeat: usize,
    /// Divisor applied to the accumulated thickness when lowering the cutter.
    pub thickness_factor: f64,
    /// Upper bound on slicing iterations.
    pub max_iterations: usize,
    /// Tilt (radians) applied to the tool normal along edges.
    pub edge_angle: f64,
}

impl Default for SprayParams {
    fn default() -> Self {
        Self {
            spray_speed: 200.0,
            connector_speed: 300.0,
            flow_rate: 1.0,
            path_repeat: 1,
            thickness_factor: 1.0,
            max_iterations: 1000,
            edge_angle: 10.0_f64.to_radians(),
        }
    }
}

/// Full planner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub tolerance: Tolerance,
    pub raster: RasterParams,
    pub spray: SprayParams,
}

impl PlannerConfig {
    /// Parses and validates a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.tolerance.distance <= 0.0 || self.tolerance.angle <= 0.0 {
            return invalid("tolerances must be positive");
        }
        if self.raster.pitch <= 0.0 {
            return invalid("raster pitch must be positive");
        }
        if self.raster.geodesic_count < 2 {
            return invalid("at least 2 geodesics are required");
        }
        if self.spray.flow_rate < 0.0 {
            return invalid("flow rate must not be negative");
        }
        if self.spray.spray_speed <= 0.0 || self.spray.connector_speed <= 0.0 {
            return invalid("spray and connector speeds must be positive");
        }
        if self.spray.path_repeat == 0 {
            return invalid("path repeat must be at least 1");
        }
        if self.spray.thickness_factor <= 0.0 {
            return invalid("thickness factor must be positive");
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Result<()> {
    Err(ConfigError::Invalid(msg.to_owned()).into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SprayError;

    #[test]
    fn defaults_are_valid() {
        PlannerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            PlannerConfig::from_json(r#"{ "raster": { "pitch": 25.0 }, "spray": { "flow_rate": 0.5 } }"#)
                .unwrap();
        assert!((config.raster.pitch - 25.0).abs() < 1e-12);
        assert_eq!(config.raster.geodesic_count, 10);
        assert!((config.spray.flow_rate - 0.5).abs() < 1e-12);
        assert_eq!(config.spray.path_repeat, 1);
    }

    #[test]
    fn rejects_non_positive_pitch() {
        let err = PlannerConfig::from_json(r#"{ "raster": { "pitch": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, SprayError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = PlannerConfig::from_json("{ raster: ").unwrap_err();
        assert!(matches!(err, SprayError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn source_edges_round_trip() {
        let mut config = PlannerConfig::default();
        config.raster.source_edges = Some(vec![0, 2]);
        let json = serde_json::to_string(&config).unwrap();
        let back = PlannerConfig::from_json(&json).unwrap();
        assert_eq!(back.raster.source_edges, Some(vec![0, 2]));
    }
}
