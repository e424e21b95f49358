//! Constrained triangulation of lifted footprints.
//!
//! The [`Triangulator`] trait is the seam the rest of the crate meshes through.
//! [`EarClipTriangulator`] is the default implementation. Holes are bridged into
//! the outer ring and the merged ring is ear-clipped. Interior sample points are
//! then inserted one by one with the boundary edges locked, and unlocked edges
//! are flipped towards a Delaunay mesh.
//!
//! Output vertices are in ring-major order (outer ring, then holes), followed by
//! the accepted interior points, so per-vertex elevations map one-to-one.

use crate::feature::ElevationTable;

use super::core::{Point3, Tolerance};
use super::earclip::{clip_footprint, orient};
use super::footprint::Footprint;
use super::mesh::TriangleMesh;
use super::refine::ConstrainedMesh;

/// Failures from triangulating a footprint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TriangulationError {
    #[error("triangulation vertices must be finite")]
    NonFinite,
    #[error("footprint ring {ring} degenerates after filtering")]
    DegenerateRing { ring: usize },
    #[error("triangulation produced no triangles")]
    NoTriangles,
    #[error("triangulation failed: {0}")]
    Failed(String),
}

/// Meshes a lifted footprint.
///
/// Implementations must keep the footprint boundary as constraint edges and may
/// only fail on degenerate input.
pub trait Triangulator: Send + Sync {
    fn triangulate(
        &self,
        footprint: &Footprint,
        elevations: &ElevationTable,
        interior: &[Point3],
    ) -> Result<TriangleMesh, TriangulationError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangulationOptions {
    pub tolerance: Tolerance,
    pub min_triangle_area: f64,
}

impl TriangulationOptions {
    #[must_use]
    pub fn for_tolerance(tol: Tolerance) -> Self {
        Self {
            tolerance: tol,
            min_triangle_area: tol.eps_squared(),
        }
    }
}

impl Default for TriangulationOptions {
    fn default() -> Self {
        Self::for_tolerance(Tolerance::DEFAULT)
    }
}

/// Ear-clipping triangulator with hole bridging and constrained point insertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarClipTriangulator {
    pub options: TriangulationOptions,
}

impl EarClipTriangulator {
    #[must_use]
    pub fn new(options: TriangulationOptions) -> Self {
        Self { options }
    }
}

impl Triangulator for EarClipTriangulator {
    fn triangulate(
        &self,
        footprint: &Footprint,
        elevations: &ElevationTable,
        interior: &[Point3],
    ) -> Result<TriangleMesh, TriangulationError> {
        if elevations.ring_lengths() != footprint.ring_lengths() {
            return Err(TriangulationError::Failed(
                "elevation table does not match footprint layout".to_string(),
            ));
        }

        let mut vertices: Vec<Point3> = footprint
            .vertices()
            .map(|(v, p)| Point3::lifted(p, elevations.get(v).unwrap_or_default()))
            .collect();
        if vertices.iter().any(|p| !p.xy().is_finite()) {
            return Err(TriangulationError::NonFinite);
        }

        let tol = self.options.tolerance;
        let clipped = clip_footprint(footprint, tol)?;
        let before = clipped.len();
        let triangles: Vec<[u32; 3]> = clipped
            .into_iter()
            .filter(|&tri| self.has_area(&vertices, tri))
            .collect();
        if triangles.is_empty() {
            return Err(TriangulationError::NoTriangles);
        }
        if triangles.len() < before {
            log::trace!("culled {} flat triangles", before - triangles.len());
        }

        if interior.is_empty() {
            return Ok(TriangleMesh::new(vertices, triangles));
        }

        let mut refined = ConstrainedMesh::new(
            vertices.iter().map(|p| p.xy()).collect(),
            triangles,
            boundary_edges(footprint),
            tol,
        );
        refined.make_delaunay();

        let mut skipped = 0usize;
        for p in interior {
            if !p.xy().is_finite() {
                skipped += 1;
                continue;
            }
            match refined.insert(p.xy()) {
                Some(_) => vertices.push(*p),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::trace!("{skipped} interior points fell outside or on the boundary");
        }
        Ok(TriangleMesh::new(vertices, refined.into_triangles()))
    }
}

impl EarClipTriangulator {
    fn has_area(&self, vertices: &[Point3], [a, b, c]: [u32; 3]) -> bool {
        let (a, b, c) = (
            vertices[a as usize].xy(),
            vertices[b as usize].xy(),
            vertices[c as usize].xy(),
        );
        let area = 0.5 * orient(a, b, c);
        area.is_finite() && area > self.options.min_triangle_area
    }
}

/// Ring edges as ring-major vertex index pairs.
#[allow(clippy::cast_possible_truncation)]
fn boundary_edges(footprint: &Footprint) -> Vec<(u32, u32)> {
    footprint
        .edges()
        .filter_map(|e| {
            let a = footprint.vertex_index(e.a)?;
            let b = footprint.vertex_index(e.b)?;
            Some((a as u32, b as u32))
        })
        .collect()
}
