//! Property-based tests for lifting and reconciliation.
//!
//! Run with: cargo test --test proptest_lifting

use drape_engine::feature::{VertexSamples, percentile_select};
use drape_engine::geom::Tolerance;
use drape_engine::reconcile::{NodeColumns, detect_bowties, resolve_bowties, wall_mesh_for};
use drape_engine::{
    FeatureClass, FeatureId, FeatureOptions, FeatureSet, Footprint, LiftOptions, Point2, VertexRef,
};
use proptest::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

const LEFT: &str = "POLYGON((0 0,1 0,1 1,0 1,0 0))";
const RIGHT: &str = "POLYGON((1 0,2 0,2 1,1 1,1 0))";

// shared edge (1,0) -> (1,1) as seen from each square
const LEFT_A: VertexRef = VertexRef::new(0, 1);
const LEFT_B: VertexRef = VertexRef::new(0, 2);
const RIGHT_A: VertexRef = VertexRef::new(0, 0);
const RIGHT_B: VertexRef = VertexRef::new(0, 3);

fn two_squares(left: FeatureOptions, right: FeatureOptions) -> (FeatureSet, FeatureId, FeatureId) {
    let mut set = FeatureSet::new(LiftOptions::default());
    let l = set.insert_wkt("left", LEFT, left).unwrap();
    let r = set.insert_wkt("right", RIGHT, right).unwrap();
    set.link_adjacent(l, r).unwrap();
    set.lift_all();
    (set, l, r)
}

fn set_heights(set: &mut FeatureSet, id: FeatureId, heights: &[i32]) {
    let f = set.get_mut(id).unwrap();
    for (i, &z) in heights.iter().enumerate() {
        assert!(f.set_vertex_elevation(VertexRef::new(0, i), z));
    }
}

fn z(set: &FeatureSet, id: FeatureId, v: VertexRef) -> i32 {
    set.get(id).unwrap().vertex_elevation(v).unwrap()
}

fn class_options(hard: bool) -> FeatureOptions {
    FeatureOptions::for_class(FeatureClass::Road).with_hard(hard)
}

fn arb_heights() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-2_000..2_000i32, 4)
}

// =============================================================================
// Percentile
// =============================================================================

proptest! {
    #[test]
    fn percentile_ignores_input_order(
        values in prop::collection::vec(-10_000..10_000i32, 1..64),
        p in 0.0..=1.0f64,
    ) {
        let mut forward = values.clone();
        let mut reversed: Vec<i32> = values.iter().rev().copied().collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();

        let picked = percentile_select(&mut forward, p).unwrap();
        prop_assert_eq!(percentile_select(&mut reversed, p), Some(picked));
        prop_assert_eq!(percentile_select(&mut sorted.clone(), p), Some(picked));
        prop_assert!(sorted.contains(&picked));
    }

    #[test]
    fn percentile_is_monotone_in_p(
        values in prop::collection::vec(-10_000..10_000i32, 1..64),
        p in 0.0..=1.0f64,
        q in 0.0..=1.0f64,
    ) {
        let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
        let a = percentile_select(&mut values.clone(), lo).unwrap();
        let b = percentile_select(&mut values.clone(), hi).unwrap();
        prop_assert!(a <= b);
    }
}

// =============================================================================
// Per-vertex reduction
// =============================================================================

proptest! {
    #[test]
    fn reduced_table_covers_every_vertex(
        samples in prop::collection::vec((0.0..10.0f64, 0.0..10.0f64, -500..500i32), 0..40),
        p in 0.0..=1.0f64,
    ) {
        let fp = Footprint::from_wkt(
            "POLYGON((0 0,10 0,10 10,0 10,0 0),(4 4,6 4,6 6,4 6,4 4))",
        )
        .unwrap();
        let mut acc = VertexSamples::for_footprint(&fp);
        let mut recorded = Vec::new();
        for &(x, y, z) in &samples {
            if acc.record(&fp, Point2::new(x, y), z, 1.5) > 0 {
                recorded.push(z);
            }
        }

        let table = acc.reduce_percentile(p);
        prop_assert_eq!(table.ring_lengths(), fp.ring_lengths());
        match (recorded.iter().min(), recorded.iter().max()) {
            (Some(&lo), Some(&hi)) => {
                for (_, z) in table.iter() {
                    prop_assert!(z >= lo && z <= hi);
                }
            }
            _ => {
                for (_, z) in table.iter() {
                    prop_assert!(z == 0);
                }
            }
        }
    }
}

// =============================================================================
// Bow-ties
// =============================================================================

proptest! {
    #[test]
    fn resolving_leaves_no_bowties(
        left in arb_heights(),
        right in arb_heights(),
        left_hard in any::<bool>(),
        right_hard in any::<bool>(),
    ) {
        let (mut set, l, r) = two_squares(class_options(left_hard), class_options(right_hard));
        set_heights(&mut set, l, &left);
        set_heights(&mut set, r, &right);
        let tol = Tolerance::EDGE_MATCH;
        let before = detect_bowties(&set, tol);

        let first = resolve_bowties(&mut set, tol);
        prop_assert_eq!(first.bowties > 0, before > 0);
        prop_assert_eq!(detect_bowties(&set, tol), 0);

        let snapshot: Vec<_> = set.iter().map(|(_, f)| f.elevations().cloned()).collect();
        let second = resolve_bowties(&mut set, tol);
        prop_assert_eq!(second.bowties, 0);
        let after: Vec<_> = set.iter().map(|(_, f)| f.elevations().cloned()).collect();
        prop_assert_eq!(snapshot, after);
    }

    #[test]
    fn hard_side_keeps_its_heights_against_soft(
        left in arb_heights(),
        right in arb_heights(),
    ) {
        let (mut set, l, r) = two_squares(class_options(true), class_options(false));
        set_heights(&mut set, l, &left);
        set_heights(&mut set, r, &right);

        resolve_bowties(&mut set, Tolerance::EDGE_MATCH);
        for (i, &expected) in left.iter().enumerate() {
            prop_assert_eq!(z(&set, l, VertexRef::new(0, i)), expected);
        }
    }
}

// =============================================================================
// Walls
// =============================================================================

proptest! {
    #[test]
    fn walls_stay_between_neighbour_and_own_heights(
        left in arb_heights(),
        right in arb_heights(),
        column in prop::collection::vec(-3_000..3_000i32, 0..8),
    ) {
        let (mut set, l, r) = two_squares(
            FeatureOptions::for_class(FeatureClass::Water),
            FeatureOptions::for_class(FeatureClass::Road),
        );
        set_heights(&mut set, l, &left);
        set_heights(&mut set, r, &right);

        let shared_a = Point2::new(1.0, 0.0);
        let shared_b = Point2::new(1.0, 1.0);
        let columns: NodeColumns = column
            .iter()
            .flat_map(|&z| [(shared_a, z), (shared_b, z)])
            .collect();

        let mesh = wall_mesh_for(&set, l, &columns, 0, Tolerance::EDGE_MATCH);
        prop_assert!(mesh.validate().is_ok());
        if mesh.is_empty() {
            return Ok(());
        }

        let (own_a, own_b) = (z(&set, l, LEFT_A), z(&set, l, LEFT_B));
        let (adj_a, adj_b) = (z(&set, r, RIGHT_A), z(&set, r, RIGHT_B));
        prop_assert!(own_a >= adj_a && own_b >= adj_b);

        for v in &mesh.vertices {
            let (low, high) = if v.xy() == shared_a {
                (adj_a, own_a)
            } else {
                prop_assert_eq!(v.xy(), shared_b);
                (adj_b, own_b)
            };
            prop_assert!(v.z_cm >= low && v.z_cm <= high);
        }
    }
}
