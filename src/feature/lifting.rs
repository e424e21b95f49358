//! Lifting strategies: how a feature turns recorded samples into vertex heights.
//!
//! [`LiftKind`] is the declared strategy; [`LiftSamples`] is the matching sample
//! store. Both the store variants and the enum itself implement [`VertexLifter`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::elevation::{ElevationTable, FlatSamples, VertexSamples};
use crate::config::LiftOptions;
use crate::geom::{Footprint, Point2, Point3};

/// Declared lifting strategy of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LiftKind {
    /// One height for the whole footprint.
    Flat,
    /// Each boundary vertex lifted from its own nearby samples.
    #[default]
    Boundary,
    /// Boundary lifting plus thinned interior samples for the triangulator.
    Tin {
        simplification: u32,
        inner_buffer: f64,
    },
}

/// Records samples and reduces them to an [`ElevationTable`].
pub trait VertexLifter {
    /// Offer one sample (planar position, elevation in centimeters).
    ///
    /// Returns true when the sample was used.
    fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, options: &LiftOptions) -> bool;

    /// Reduce the recorded samples. Every cell of the returned table is defined.
    fn reduce(&mut self, footprint: &Footprint, options: &LiftOptions) -> ElevationTable;

    /// Interior points kept for triangulation.
    fn interior_points(&self) -> &[Point3] {
        &[]
    }
}

impl VertexLifter for FlatSamples {
    fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, options: &LiftOptions) -> bool {
        FlatSamples::record(self, footprint, point, z_cm, options.flat_buffer)
    }

    fn reduce(&mut self, footprint: &Footprint, options: &LiftOptions) -> ElevationTable {
        self.reduce_percentile(footprint, options.percentile)
    }
}

impl VertexLifter for VertexSamples {
    fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, options: &LiftOptions) -> bool {
        VertexSamples::record(self, footprint, point, z_cm, options.vertex_radius) > 0
    }

    fn reduce(&mut self, _footprint: &Footprint, options: &LiftOptions) -> ElevationTable {
        let mut table = self.reduce_percentile(options.percentile);
        table.smooth(options.smooth_passes);
        table
    }
}

/// Boundary samples plus a randomly thinned set of interior points.
#[derive(Debug, Clone)]
pub struct TinSamples {
    boundary: VertexSamples,
    interior: Vec<Point3>,
    simplification: u32,
    inner_buffer: f64,
    rng: StdRng,
}

impl TinSamples {
    #[must_use]
    pub fn new(footprint: &Footprint, simplification: u32, inner_buffer: f64, seed: u64) -> Self {
        Self {
            boundary: VertexSamples::for_footprint(footprint),
            interior: Vec::new(),
            simplification,
            inner_buffer,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One draw per offered sample: kept with probability `1 / simplification`.
    fn draw(&mut self) -> bool {
        self.simplification <= 1 || self.rng.random_range(1..=self.simplification) == 1
    }

    fn accepts_interior(&self, footprint: &Footprint, point: Point2) -> bool {
        footprint.contains(point)
            && (self.inner_buffer <= 0.0 || footprint.distance_to_boundary(point) > self.inner_buffer)
    }
}

impl VertexLifter for TinSamples {
    fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, options: &LiftOptions) -> bool {
        let on_boundary = self.boundary.record(footprint, point, z_cm, options.vertex_radius) > 0;
        let kept = self.draw();
        if kept && self.accepts_interior(footprint, point) {
            self.interior.push(Point3::lifted(point, z_cm));
            return true;
        }
        on_boundary
    }

    fn reduce(&mut self, footprint: &Footprint, options: &LiftOptions) -> ElevationTable {
        VertexLifter::reduce(&mut self.boundary, footprint, options)
    }

    fn interior_points(&self) -> &[Point3] {
        &self.interior
    }
}

/// Sample store for one feature, tagged by strategy.
#[derive(Debug, Clone)]
pub enum LiftSamples {
    Flat(FlatSamples),
    Boundary(VertexSamples),
    Tin(TinSamples),
}

impl LiftSamples {
    #[must_use]
    pub fn new(kind: LiftKind, footprint: &Footprint, seed: u64) -> Self {
        match kind {
            LiftKind::Flat => Self::Flat(FlatSamples::default()),
            LiftKind::Boundary => Self::Boundary(VertexSamples::for_footprint(footprint)),
            LiftKind::Tin {
                simplification,
                inner_buffer,
            } => Self::Tin(TinSamples::new(footprint, simplification, inner_buffer, seed)),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Flat(_) => "flat",
            Self::Boundary(_) => "boundary",
            Self::Tin(_) => "tin",
        }
    }
}

impl VertexLifter for LiftSamples {
    fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, options: &LiftOptions) -> bool {
        match self {
            Self::Flat(s) => VertexLifter::record(s, footprint, point, z_cm, options),
            Self::Boundary(s) => VertexLifter::record(s, footprint, point, z_cm, options),
            Self::Tin(s) => s.record(footprint, point, z_cm, options),
        }
    }

    fn reduce(&mut self, footprint: &Footprint, options: &LiftOptions) -> ElevationTable {
        match self {
            Self::Flat(s) => VertexLifter::reduce(s, footprint, options),
            Self::Boundary(s) => VertexLifter::reduce(s, footprint, options),
            Self::Tin(s) => s.reduce(footprint, options),
        }
    }

    fn interior_points(&self) -> &[Point3] {
        match self {
            Self::Tin(s) => s.interior_points(),
            Self::Flat(_) | Self::Boundary(_) => &[],
        }
    }
}
