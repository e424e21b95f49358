use serde::{Deserialize, Serialize};

use crate::geom::Tolerance;

/// Options controlling sample routing, reduction and reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftOptions {
    /// Order statistic used when reducing samples (0.5 = median)
    pub percentile: f64,
    /// Samples within this planar distance of a vertex are recorded for it
    pub vertex_radius: f64,
    /// Flat features pool samples inside the footprint or within this distance of a vertex
    pub flat_buffer: f64,
    /// Absolute distance under which vertices of two features are the same location
    pub edge_tolerance: f64,
    /// Bottom of base walls for features without a neighbour (centimeters)
    pub base_height_cm: i32,
    /// Seed for TIN sample thinning; mixed with each feature's creation counter
    pub seed: u64,
    /// Neighbour-averaging passes applied to boundary-lifted rings after reduction
    pub smooth_passes: usize,
}

impl Default for LiftOptions {
    fn default() -> Self {
        Self {
            percentile: 0.5,
            vertex_radius: 3.0,
            flat_buffer: 3.0,
            edge_tolerance: Tolerance::EDGE_MATCH.eps,
            base_height_cm: 0,
            seed: 0,
            smooth_passes: 0,
        }
    }
}

impl LiftOptions {
    /// Options reducing to the given percentile.
    #[must_use]
    pub fn with_percentile(percentile: f64) -> Self {
        Self {
            percentile,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.edge_tolerance)
    }

    /// Largest distance at which a sample can still affect a feature.
    #[must_use]
    pub fn sample_reach(&self) -> f64 {
        self.vertex_radius.max(self.flat_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = LiftOptions::default();
        assert!((opts.percentile - 0.5).abs() < f64::EPSILON);
        assert!((opts.tolerance().eps - 0.001).abs() < f64::EPSILON);
        assert!((opts.sample_reach() - 3.0).abs() < f64::EPSILON);
        assert_eq!(opts.smooth_passes, 0);
    }

    #[test]
    fn test_reach_uses_larger_distance() {
        let opts = LiftOptions {
            vertex_radius: 1.5,
            flat_buffer: 4.0,
            ..LiftOptions::with_percentile(0.9)
        };
        assert!((opts.sample_reach() - 4.0).abs() < f64::EPSILON);
        assert!((opts.percentile - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts: LiftOptions =
            serde_json::from_str(r#"{ "percentile": 0.9, "base_height_cm": -150 }"#).unwrap();
        assert!((opts.percentile - 0.9).abs() < f64::EPSILON);
        assert_eq!(opts.base_height_cm, -150);
        assert!((opts.vertex_radius - 3.0).abs() < f64::EPSILON);
    }
}
