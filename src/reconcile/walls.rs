//! Vertical connector walls along shared edges with a height step.
//!
//! For each edge of a wall-eligible feature that sits above its neighbour, a
//! strip of triangles is emitted between the neighbour's heights (bottom) and the
//! feature's own heights (top). Node columns add intermediate rungs at each
//! endpoint so walls meet breaklines from other features.
//!
//! Walls are computed from a shared borrow of the whole set and written to a
//! separate buffer; the footprint surface never sees them.

use super::{EdgeHeights, NodeColumns, find_mirror};
use crate::drape::{FeatureId, FeatureSet};
use crate::geom::{Point2, Point3, RingEdge, Tolerance, TriangleMesh};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallReport {
    pub features: usize,
    pub edges_walled: usize,
    pub triangles: usize,
    pub skipped_unlifted: usize,
}

impl WallReport {
    pub(crate) fn add_feature(&mut self, edges_walled: usize, triangles: usize) {
        if edges_walled > 0 {
            self.features += 1;
        }
        self.edges_walled += edges_walled;
        self.triangles += triangles;
    }
}

/// Rungs of one endpoint: `low`, the column values strictly between, then `high`.
///
/// Returns just `[low]` when the endpoint has no gap.
#[must_use]
pub fn wall_ladder(low: i32, high: i32, column: &[i32]) -> Vec<i32> {
    let mut rungs = vec![low];
    if high > low {
        rungs.extend(column.iter().copied().filter(|&z| z > low && z < high));
        rungs.dedup();
        rungs.push(high);
    }
    rungs
}

/// Wall triangles for one feature, reading neighbour heights from `set`.
///
/// Features without wall eligibility, unlifted features and unknown ids give an
/// empty mesh.
#[must_use]
pub fn wall_mesh_for(
    set: &FeatureSet,
    id: FeatureId,
    columns: &NodeColumns,
    base_height: i32,
    tol: Tolerance,
) -> TriangleMesh {
    build_walls(set, id, columns, base_height, tol).0
}

/// Mesh plus the number of edges that produced triangles.
pub(crate) fn build_walls(
    set: &FeatureSet,
    id: FeatureId,
    columns: &NodeColumns,
    base_height: i32,
    tol: Tolerance,
) -> (TriangleMesh, usize) {
    let mut mesh = TriangleMesh::default();
    let Some(feature) = set.get(id) else {
        return (mesh, 0);
    };
    if !feature.has_vertical_walls() || !feature.is_lifted() {
        return (mesh, 0);
    }
    let base_walls = feature.class().builds_base_walls();

    let mut walled = 0;
    for edge in feature.footprint().edges() {
        let anc = columns.column(edge.pa);
        let bnc = columns.column(edge.pb);
        let mirror = find_mirror(set, id, &edge, tol);

        let heights = match &mirror {
            Some(m) => EdgeHeights::read(set, id, &edge, m),
            None if base_walls && !(anc.is_empty() && bnc.is_empty()) => own_heights(set, id, &edge)
                .map(|(az, bz)| EdgeHeights::new(az, bz, base_height, base_height)),
            None => None,
        };
        let Some(h) = heights else {
            continue;
        };

        if h.az < h.fadj_az || h.bz < h.fadj_bz {
            continue;
        }
        if h.az == h.fadj_az && h.bz == h.fadj_bz {
            continue;
        }

        let a_rungs = wall_ladder(h.fadj_az, h.az, anc);
        let b_rungs = wall_ladder(h.fadj_bz, h.bz, bnc);
        if push_strip(&mut mesh, edge.pa, &a_rungs, edge.pb, &b_rungs) > 0 {
            walled += 1;
        }
    }

    if walled > 0 {
        log::trace!(
            "feature '{}': {} wall triangles on {} edges",
            feature.id(),
            mesh.triangle_count(),
            walled
        );
    }
    (mesh, walled)
}

fn own_heights(set: &FeatureSet, id: FeatureId, edge: &RingEdge) -> Option<(i32, i32)> {
    let f = set.get(id)?;
    Some((f.vertex_elevation(edge.a)?, f.vertex_elevation(edge.b)?))
}

/// Emit the strip between two ladders, advancing `a` and `b` in turn.
///
/// Advancing `a` emits `(B[j], A[i], A[i+1])`; advancing `b` emits
/// `(B[j], A[i], B[j+1])`. Returns the number of triangles added.
fn push_strip(mesh: &mut TriangleMesh, pa: Point2, a_rungs: &[i32], pb: Point2, b_rungs: &[i32]) -> usize {
    let a_idx: Vec<u32> = a_rungs
        .iter()
        .map(|&z| mesh.push_vertex(Point3::lifted(pa, z)))
        .collect();
    let b_idx: Vec<u32> = b_rungs
        .iter()
        .map(|&z| mesh.push_vertex(Point3::lifted(pb, z)))
        .collect();

    let (mut i, mut j) = (0usize, 0usize);
    let mut advance_a = true;
    let mut emitted = 0;
    loop {
        let a_left = i + 1 < a_idx.len();
        let b_left = j + 1 < b_idx.len();
        if !a_left && !b_left {
            break;
        }

        if a_left && (advance_a || !b_left) {
            mesh.push_triangle([b_idx[j], a_idx[i], a_idx[i + 1]]);
            i += 1;
        } else {
            mesh.push_triangle([b_idx[j], a_idx[i], b_idx[j + 1]]);
            j += 1;
        }
        advance_a = !advance_a;
        emitted += 1;
    }
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiftOptions;
    use crate::feature::{FeatureClass, FeatureInput, FeatureOptions};
    use crate::geom::VertexRef;

    fn set_with(left: FeatureOptions, right: Option<FeatureOptions>) -> (FeatureSet, FeatureId, Option<FeatureId>) {
        let mut set = FeatureSet::new(LiftOptions::default());
        let l = set
            .insert(FeatureInput::from_wkt("left", "POLYGON((0 0,1 0,1 1,0 1,0 0))", left).unwrap())
            .unwrap();
        let r = right.map(|opts| {
            set.insert(FeatureInput::from_wkt("right", "POLYGON((1 0,2 0,2 1,1 1,1 0))", opts).unwrap())
                .unwrap()
        });
        if let Some(r) = r {
            set.link_adjacent(l, r).unwrap();
        }
        set.lift_all();
        (set, l, r)
    }

    fn fill(set: &mut FeatureSet, id: FeatureId, z: i32) {
        let f = set.get_mut(id).unwrap();
        for i in 0..4 {
            f.set_vertex_elevation(VertexRef::new(0, i), z);
        }
    }

    fn z_range_at(mesh: &TriangleMesh, p: Point2) -> (i32, i32) {
        let zs: Vec<i32> = mesh
            .triangles
            .iter()
            .flatten()
            .map(|&i| mesh.vertices[i as usize])
            .filter(|v| v.xy() == p)
            .map(|v| v.z_cm)
            .collect();
        (*zs.iter().min().unwrap(), *zs.iter().max().unwrap())
    }

    #[test]
    fn test_ladder() {
        assert_eq!(wall_ladder(100, 400, &[50, 100, 200, 300, 400, 500]), vec![100, 200, 300, 400]);
        assert_eq!(wall_ladder(100, 400, &[]), vec![100, 400]);
        assert_eq!(wall_ladder(250, 250, &[100, 300]), vec![250]);
    }

    #[test]
    fn test_strip_alternates_endpoints() {
        let mut mesh = TriangleMesh::default();
        let pa = Point2::new(0.0, 0.0);
        let pb = Point2::new(1.0, 0.0);
        let n = push_strip(&mut mesh, pa, &[0, 10, 20], pb, &[0, 5, 15, 20]);
        assert_eq!(n, 5);
        assert_eq!(mesh.vertex_count(), 7);
        // a rungs are 0..3, b rungs are 3..7
        assert_eq!(
            mesh.triangles,
            vec![[3, 0, 1], [3, 1, 4], [4, 1, 2], [4, 2, 5], [5, 2, 6]]
        );
    }

    #[test]
    fn test_wall_against_lower_neighbour() {
        let opts = FeatureOptions::for_class(FeatureClass::Water);
        let (mut set, l, r) = set_with(opts, Some(FeatureOptions::for_class(FeatureClass::Road)));
        let r = r.unwrap();
        fill(&mut set, l, 300);
        fill(&mut set, r, 100);

        let mut columns = NodeColumns::new();
        columns.insert(Point2::new(1.0, 0.0), 200);
        columns.insert(Point2::new(1.0, 0.0), 900);

        let mesh = wall_mesh_for(&set, l, &columns, 0, Tolerance::EDGE_MATCH);
        // a = (1,0): 100, 200, 300; b = (1,1): 100, 300
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(z_range_at(&mesh, Point2::new(1.0, 0.0)), (100, 300));
        assert_eq!(z_range_at(&mesh, Point2::new(1.0, 1.0)), (100, 300));

        // the lower side never builds walls looking up
        set.get_mut(r).unwrap().add_vertical_wall();
        let up = wall_mesh_for(&set, r, &columns, 0, Tolerance::EDGE_MATCH);
        assert!(up.is_empty());
    }

    #[test]
    fn test_equal_heights_skip() {
        let opts = FeatureOptions::for_class(FeatureClass::Water);
        let (mut set, l, r) = set_with(opts.clone(), Some(opts));
        fill(&mut set, l, 300);
        fill(&mut set, r.unwrap(), 300);
        assert!(wall_mesh_for(&set, l, &NodeColumns::new(), 0, Tolerance::EDGE_MATCH).is_empty());
    }

    #[test]
    fn test_building_walls_to_base_height() {
        let (mut set, l, _) = set_with(FeatureOptions::for_class(FeatureClass::Building), None);
        fill(&mut set, l, 800);

        // no neighbour and no columns: nothing to connect
        assert!(wall_mesh_for(&set, l, &NodeColumns::new(), -100, Tolerance::EDGE_MATCH).is_empty());

        let columns: NodeColumns = [(Point2::new(0.0, 0.0), 200)].into_iter().collect();
        let mesh = wall_mesh_for(&set, l, &columns, -100, Tolerance::EDGE_MATCH);
        // edges touching (0,0): 3 -> 0 and 0 -> 1
        assert_eq!(mesh.triangle_count(), 6);
        assert_eq!(z_range_at(&mesh, Point2::new(0.0, 0.0)), (-100, 800));
    }

    #[test]
    fn test_terrain_without_neighbour_gets_no_walls() {
        let opts = FeatureOptions::for_class(FeatureClass::Terrain).with_vertical_walls(true);
        let (mut set, l, _) = set_with(opts, None);
        fill(&mut set, l, 800);
        let columns: NodeColumns = [(Point2::new(0.0, 0.0), 200)].into_iter().collect();
        assert!(wall_mesh_for(&set, l, &columns, 0, Tolerance::EDGE_MATCH).is_empty());
    }

    #[test]
    fn test_not_eligible_gives_empty_mesh() {
        let (mut set, l, r) = set_with(
            FeatureOptions::for_class(FeatureClass::Road),
            Some(FeatureOptions::for_class(FeatureClass::Road)),
        );
        fill(&mut set, l, 500);
        fill(&mut set, r.unwrap(), 0);
        assert!(wall_mesh_for(&set, l, &NodeColumns::new(), 0, Tolerance::EDGE_MATCH).is_empty());
    }
}
