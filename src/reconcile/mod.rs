//! Cross-feature passes run after every feature has been lifted.
//!
//! [`resolve_bowties`] may write to neighbouring features and therefore takes the
//! whole set mutably. [`wall_mesh_for`] only reads neighbours and returns a mesh
//! for the caller to store.

mod bowtie;
mod node_columns;
mod walls;

pub use bowtie::{BowtieFix, BowtieReport, Endpoint, Side, bowtie_fix, detect_bowties, is_bowtie, resolve_bowties};
pub use node_columns::NodeColumns;
pub use walls::{WallReport, wall_ladder, wall_mesh_for};
pub(crate) use walls::build_walls;

use crate::drape::{FeatureId, FeatureSet};
use crate::geom::{RingEdge, Tolerance, VertexRef};

/// The neighbour's copy of an edge `a -> b`, stored there as `b -> a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MirrorEdge {
    pub neighbour: FeatureId,
    /// Neighbour vertex at the edge's `a`
    pub a: VertexRef,
    /// Neighbour vertex at the edge's `b`
    pub b: VertexRef,
}

/// First adjacent feature, in adjacency order, owning the reversed edge.
pub(crate) fn find_mirror(
    set: &FeatureSet,
    id: FeatureId,
    edge: &RingEdge,
    tol: Tolerance,
) -> Option<MirrorEdge> {
    let feature = set.get(id)?;
    feature.adjacent().iter().find_map(|&adj| {
        let neighbour = set.get(adj)?;
        let (b, a) = neighbour.footprint().find_segment(edge.pb, edge.pa, tol)?;
        Some(MirrorEdge {
            neighbour: adj,
            a,
            b,
        })
    })
}

/// Own and neighbour elevations at both ends of a shared edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeHeights {
    pub az: i32,
    pub bz: i32,
    pub fadj_az: i32,
    pub fadj_bz: i32,
}

impl EdgeHeights {
    #[must_use]
    pub const fn new(az: i32, bz: i32, fadj_az: i32, fadj_bz: i32) -> Self {
        Self {
            az,
            bz,
            fadj_az,
            fadj_bz,
        }
    }

    /// Current heights, or `None` when either feature is unlifted.
    pub(crate) fn read(set: &FeatureSet, id: FeatureId, edge: &RingEdge, mirror: &MirrorEdge) -> Option<Self> {
        let own = set.get(id)?;
        let adj = set.get(mirror.neighbour)?;
        Some(Self {
            az: own.vertex_elevation(edge.a)?,
            bz: own.vertex_elevation(edge.b)?,
            fadj_az: adj.vertex_elevation(mirror.a)?,
            fadj_bz: adj.vertex_elevation(mirror.b)?,
        })
    }
}
