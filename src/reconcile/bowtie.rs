//! Bow-tie detection and repair between adjacent features.
//!
//! A bow-tie is a shared edge whose two endpoints disagree about which feature
//! is higher; triangulated as-is, the two surfaces would cross along the edge.
//! Repairs snap one endpoint so the ordering no longer flips. Every fix is
//! written immediately, so later edges and features see earlier repairs.

use super::{EdgeHeights, find_mirror};
use crate::drape::{FeatureId, FeatureSet};
use crate::geom::{RingEdge, Tolerance, VertexRef};

/// Which feature a fix writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Own,
    Neighbour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    A,
    B,
}

/// One elevation overwrite that removes a bow-tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BowtieFix {
    pub side: Side,
    pub endpoint: Endpoint,
    pub z_cm: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BowtieReport {
    /// Shared edges with lifted features on both sides
    pub edges_checked: usize,
    pub bowties: usize,
    pub fixed_own: usize,
    pub fixed_neighbour: usize,
    pub skipped_unlifted: usize,
}

#[must_use]
pub fn is_bowtie(h: EdgeHeights) -> bool {
    (h.az > h.fadj_az && h.bz < h.fadj_bz) || (h.az < h.fadj_az && h.bz > h.fadj_bz)
}

/// Decide how to repair a bow-tie, or `None` when the edge is consistent.
///
/// The endpoint with the strictly smaller difference is repaired; ties repair `b`.
/// A hard side is never written when the other side is soft. With equal
/// hardness the higher side is pulled down to the lower.
#[must_use]
pub fn bowtie_fix(h: EdgeHeights, own_hard: bool, adj_hard: bool) -> Option<BowtieFix> {
    if !is_bowtie(h) {
        return None;
    }

    let diff_a = (i64::from(h.az) - i64::from(h.fadj_az)).abs();
    let diff_b = (i64::from(h.bz) - i64::from(h.fadj_bz)).abs();
    let (endpoint, own, adj) = if diff_a < diff_b {
        (Endpoint::A, h.az, h.fadj_az)
    } else {
        (Endpoint::B, h.bz, h.fadj_bz)
    };

    let (side, z_cm) = match (own_hard, adj_hard) {
        (true, false) => (Side::Neighbour, own),
        (false, true) => (Side::Own, adj),
        _ if own < adj => (Side::Neighbour, own),
        _ => (Side::Own, adj),
    };
    Some(BowtieFix {
        side,
        endpoint,
        z_cm,
    })
}

/// Repair bow-ties in feature order, then ring order, then edge order.
pub fn resolve_bowties(set: &mut FeatureSet, tol: Tolerance) -> BowtieReport {
    let mut report = BowtieReport::default();

    for id in set.ids() {
        let Some(feature) = set.get(id) else {
            continue;
        };
        if !feature.is_lifted() {
            log::warn!("skipping bow-tie check for unlifted feature '{}'", feature.id());
            report.skipped_unlifted += 1;
            continue;
        }
        let own_hard = feature.is_hard();
        let edges: Vec<RingEdge> = feature.footprint().edges().collect();

        for edge in &edges {
            let Some(mirror) = find_mirror(set, id, edge, tol) else {
                continue;
            };
            let Some(heights) = EdgeHeights::read(set, id, edge, &mirror) else {
                continue;
            };
            report.edges_checked += 1;

            let adj_hard = set.get(mirror.neighbour).is_some_and(|f| f.is_hard());
            let Some(fix) = bowtie_fix(heights, own_hard, adj_hard) else {
                continue;
            };
            report.bowties += 1;

            let (target, vertex): (FeatureId, VertexRef) = match (fix.side, fix.endpoint) {
                (Side::Own, Endpoint::A) => (id, edge.a),
                (Side::Own, Endpoint::B) => (id, edge.b),
                (Side::Neighbour, Endpoint::A) => (mirror.neighbour, mirror.a),
                (Side::Neighbour, Endpoint::B) => (mirror.neighbour, mirror.b),
            };
            if let Some(f) = set.get_mut(target) {
                log::debug!(
                    "bow-tie {:?}: feature '{}' vertex {:?} set to {} cm",
                    heights,
                    f.id(),
                    vertex,
                    fix.z_cm
                );
                f.set_vertex_elevation(vertex, fix.z_cm);
            }
            match fix.side {
                Side::Own => report.fixed_own += 1,
                Side::Neighbour => report.fixed_neighbour += 1,
            }
        }
    }

    log::debug!(
        "bow-tie pass: {} shared edges, {} repaired",
        report.edges_checked,
        report.bowties
    );
    report
}

/// Count bow-ties without changing anything.
#[must_use]
pub fn detect_bowties(set: &FeatureSet, tol: Tolerance) -> usize {
    let mut count = 0;
    for (id, feature) in set.iter() {
        if !feature.is_lifted() {
            continue;
        }
        for edge in feature.footprint().edges() {
            let found = find_mirror(set, id, &edge, tol)
                .and_then(|m| EdgeHeights::read(set, id, &edge, &m))
                .is_some_and(is_bowtie);
            if found {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LiftOptions;
    use crate::geom::Point2;
    use crate::feature::{FeatureClass, FeatureInput, FeatureOptions};

    const A_SHARED: VertexRef = VertexRef::new(0, 1);
    const B_SHARED: VertexRef = VertexRef::new(0, 2);
    // neighbour square stores the shared edge as its last edge, reversed
    const NB_AT_A: VertexRef = VertexRef::new(0, 0);
    const NB_AT_B: VertexRef = VertexRef::new(0, 3);

    fn two_squares(left: FeatureOptions, right: FeatureOptions) -> (FeatureSet, FeatureId, FeatureId) {
        let mut set = FeatureSet::new(LiftOptions::default());
        let l = set
            .insert(FeatureInput::from_wkt("left", "POLYGON((0 0,1 0,1 1,0 1,0 0))", left).unwrap())
            .unwrap();
        let r = set
            .insert(FeatureInput::from_wkt("right", "POLYGON((1 0,2 0,2 1,1 1,1 0))", right).unwrap())
            .unwrap();
        set.link_adjacent(l, r).unwrap();
        set.lift_all();
        (set, l, r)
    }

    fn set_z(set: &mut FeatureSet, id: FeatureId, v: VertexRef, z: i32) {
        assert!(set.get_mut(id).unwrap().set_vertex_elevation(v, z));
    }

    fn z(set: &FeatureSet, id: FeatureId, v: VertexRef) -> i32 {
        set.get(id).unwrap().vertex_elevation(v).unwrap()
    }

    fn soft() -> FeatureOptions {
        FeatureOptions::for_class(FeatureClass::Road)
    }

    #[test]
    fn test_policy_tie_picks_b() {
        let fix = bowtie_fix(EdgeHeights::new(400, 600, 600, 400), false, false).unwrap();
        assert_eq!(
            fix,
            BowtieFix {
                side: Side::Own,
                endpoint: Endpoint::B,
                z_cm: 400
            }
        );
        assert!(bowtie_fix(EdgeHeights::new(400, 400, 400, 300), false, false).is_none());
    }

    #[test]
    fn test_policy_hard_side_is_never_written() {
        let h = EdgeHeights::new(500, 500, 300, 700);
        let fix = bowtie_fix(h, true, false).unwrap();
        assert_eq!(fix.side, Side::Neighbour);
        assert_eq!(fix.z_cm, 500);

        let fix = bowtie_fix(EdgeHeights::new(300, 700, 500, 500), false, true).unwrap();
        assert_eq!(fix.side, Side::Own);
        assert_eq!(fix.z_cm, 500);
    }

    #[test]
    fn test_hard_vs_soft_snaps_soft_endpoint() {
        let (mut set, l, r) = two_squares(FeatureOptions::for_class(FeatureClass::Water), soft());
        for i in 0..4 {
            set_z(&mut set, l, VertexRef::new(0, i), 500);
        }
        set_z(&mut set, r, NB_AT_A, 300);
        set_z(&mut set, r, NB_AT_B, 700);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 2);

        let report = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(report.bowties, 1);
        assert_eq!(report.fixed_neighbour, 1);
        for i in 0..4 {
            assert_eq!(z(&set, l, VertexRef::new(0, i)), 500);
        }
        assert_eq!(z(&set, r, NB_AT_B), 500);
        assert_eq!(z(&set, r, NB_AT_A), 300);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 0);
    }

    #[test]
    fn test_equal_hardness_pulls_down() {
        let (mut set, l, r) = two_squares(soft(), soft());
        set_z(&mut set, l, A_SHARED, 400);
        set_z(&mut set, l, B_SHARED, 600);
        set_z(&mut set, r, NB_AT_A, 600);
        set_z(&mut set, r, NB_AT_B, 400);

        resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(z(&set, l, B_SHARED), 400);
        assert_eq!(z(&set, r, NB_AT_B), 400);
        assert_eq!(z(&set, l, A_SHARED), 400);
        assert_eq!(z(&set, r, NB_AT_A), 600);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 0);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let (mut set, l, r) = two_squares(soft(), soft());
        set_z(&mut set, l, A_SHARED, 120);
        set_z(&mut set, l, B_SHARED, 90);
        set_z(&mut set, r, NB_AT_A, 80);
        set_z(&mut set, r, NB_AT_B, 150);

        let first = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(first.bowties, 1);
        let snapshot: Vec<_> = set.iter().map(|(_, f)| f.elevations().cloned()).collect();

        let second = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(second.bowties, 0);
        assert_eq!(second.edges_checked, 2);
        let after: Vec<_> = set.iter().map(|(_, f)| f.elevations().cloned()).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn test_earlier_fix_is_seen_by_later_edges() {
        // square, then two triangles meeting it at (1, 1)
        let mut set = FeatureSet::new(LiftOptions::default());
        let l = set.insert_wkt("left", "POLYGON((0 0,1 0,1 1,0 1,0 0))", soft()).unwrap();
        let m = set.insert_wkt("middle", "POLYGON((1 0,2 0,1 1,1 0))", soft()).unwrap();
        let r = set.insert_wkt("right", "POLYGON((2 0,2 1,1 1,2 0))", soft()).unwrap();
        set.link_adjacent(l, m).unwrap();
        set.link_adjacent(m, r).unwrap();
        set.lift_all();

        for i in 0..4 {
            set_z(&mut set, l, VertexRef::new(0, i), 500);
        }
        let m_low = VertexRef::new(0, 0);
        let m_right = VertexRef::new(0, 1);
        let m_top = VertexRef::new(0, 2);
        set_z(&mut set, m, m_low, 200);
        set_z(&mut set, m, m_right, 400);
        set_z(&mut set, m, m_top, 700);
        set_z(&mut set, r, VertexRef::new(0, 0), 450);
        set_z(&mut set, r, VertexRef::new(0, 2), 600);
        // both shared edges cross before any repair
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 4);

        let report = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(report.edges_checked, 4);
        // pulling (1, 1) down to 500 on the first edge also clears the second
        assert_eq!(report.bowties, 1);
        assert_eq!(report.fixed_neighbour, 1);
        assert_eq!(z(&set, m, m_top), 500);
        assert_eq!(z(&set, m, m_right), 400);
        assert_eq!(z(&set, r, VertexRef::new(0, 0)), 450);
        assert_eq!(z(&set, r, VertexRef::new(0, 2)), 600);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 0);
    }

    #[test]
    fn test_island_in_hole_repairs_hole_ring() {
        let mut set = FeatureSet::new(LiftOptions::default());
        let host = set
            .insert_wkt(
                "host",
                "POLYGON((0 0,10 0,10 10,0 10,0 0),(4 4,6 4,6 6,4 6,4 4))",
                soft(),
            )
            .unwrap();
        let island = set.insert_wkt("island", "POLYGON((4 4,6 4,6 6,4 6,4 4))", soft()).unwrap();
        set.link_adjacent(host, island).unwrap();
        set.lift_all();

        // the hole is stored clockwise: (4 6), (6 6), (6 4), (4 4)
        let host_se = VertexRef::new(1, 2);
        let host_sw = VertexRef::new(1, 3);
        let fp = set.get(host).unwrap().footprint();
        assert_eq!(fp.vertex(host_se), Some(Point2::new(6.0, 4.0)));
        assert_eq!(fp.vertex(host_sw), Some(Point2::new(4.0, 4.0)));
        let island_sw = VertexRef::new(0, 0);
        let island_se = VertexRef::new(0, 1);

        set_z(&mut set, host, host_se, 300);
        set_z(&mut set, host, host_sw, 100);
        set_z(&mut set, island, island_se, 200);
        set_z(&mut set, island, island_sw, 150);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 2);

        let report = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(report.edges_checked, 8);
        assert_eq!(report.bowties, 1);
        assert_eq!(report.fixed_neighbour, 1);
        assert_eq!(z(&set, island, island_sw), 100);
        assert_eq!(z(&set, island, island_se), 200);
        assert_eq!(z(&set, host, host_se), 300);
        assert_eq!(detect_bowties(&set, Tolerance::EDGE_MATCH), 0);
    }

    #[test]
    fn test_unlinked_features_are_ignored() {
        let mut set = FeatureSet::new(LiftOptions::default());
        set.insert(FeatureInput::from_wkt("a", "POLYGON((0 0,1 0,1 1,0 1,0 0))", soft()).unwrap())
            .unwrap();
        set.insert(FeatureInput::from_wkt("b", "POLYGON((1 0,2 0,2 1,1 1,1 0))", soft()).unwrap())
            .unwrap();
        let report = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(report.skipped_unlifted, 2);

        set.lift_all();
        let report = resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        assert_eq!(report.edges_checked, 0);
    }
}
