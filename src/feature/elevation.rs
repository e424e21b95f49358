//! Per-vertex elevation tables and the sample accumulators that reduce into them.
//!
//! Elevations are integer centimeters throughout. Accumulators collect raw
//! candidate heights; reduction selects a percentile per vertex (or per pool for
//! flat features) and then fills any vertex without samples, so a reduced
//! [`ElevationTable`] never contains a missing cell.

use serde::Serialize;

use crate::geom::{Footprint, Point2, VertexRef};

/// Selects the order statistic at `floor(len * p)` (clamped to the last index).
///
/// Uses partial selection, so `values` is reordered. Returns `None` for an empty slice.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn percentile_select(values: &mut [i32], p: f64) -> Option<i32> {
    if values.is_empty() {
        return None;
    }
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.5 };
    let idx = ((values.len() as f64 * p).floor() as usize).min(values.len() - 1);
    let (_, nth, _) = values.select_nth_unstable(idx);
    Some(*nth)
}

// ─────────────────────────────────────────────────────────────────────────────
// ElevationTable
// ─────────────────────────────────────────────────────────────────────────────

/// One elevation per footprint vertex, shaped like the footprint's rings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ElevationTable {
    rings: Vec<Vec<i32>>,
}

impl ElevationTable {
    #[must_use]
    pub fn from_rings(rings: Vec<Vec<i32>>) -> Self {
        Self { rings }
    }

    /// A table with every vertex of `footprint` set to `z_cm`.
    #[must_use]
    pub fn for_footprint(footprint: &Footprint, z_cm: i32) -> Self {
        Self::filled(&footprint.ring_lengths(), z_cm)
    }

    #[must_use]
    pub fn filled(ring_lengths: &[usize], z_cm: i32) -> Self {
        Self {
            rings: ring_lengths.iter().map(|&n| vec![z_cm; n]).collect(),
        }
    }

    #[must_use]
    pub fn ring_lengths(&self) -> Vec<usize> {
        self.rings.iter().map(Vec::len).collect()
    }

    #[must_use]
    pub fn rings(&self) -> &[Vec<i32>] {
        &self.rings
    }

    #[must_use]
    pub fn get(&self, v: VertexRef) -> Option<i32> {
        self.rings.get(v.ring).and_then(|r| r.get(v.index)).copied()
    }

    /// Overwrite one cell. Returns false if `v` is out of range.
    pub fn set(&mut self, v: VertexRef, z_cm: i32) -> bool {
        match self.rings.get_mut(v.ring).and_then(|r| r.get_mut(v.index)) {
            Some(cell) => {
                *cell = z_cm;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexRef, i32)> + '_ {
        self.rings.iter().enumerate().flat_map(|(ri, ring)| {
            ring.iter()
                .enumerate()
                .map(move |(i, z)| (VertexRef::new(ri, i), *z))
        })
    }

    #[must_use]
    pub fn min(&self) -> Option<i32> {
        self.rings.iter().flatten().copied().min()
    }

    #[must_use]
    pub fn max(&self) -> Option<i32> {
        self.rings.iter().flatten().copied().max()
    }

    /// Neighbour-averaging passes: each vertex becomes `(prev + next) / 2` within its ring.
    ///
    /// All vertices of a ring are updated from the previous pass's values.
    pub fn smooth(&mut self, passes: usize) {
        for _ in 0..passes {
            for ring in &mut self.rings {
                let n = ring.len();
                if n < 3 {
                    continue;
                }
                let smoothed: Vec<i32> = (0..n)
                    .map(|i| {
                        let prev = i64::from(ring[(i + n - 1) % n]);
                        let next = i64::from(ring[(i + 1) % n]);
                        mean_cm(prev + next, 2)
                    })
                    .collect();
                *ring = smoothed;
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn mean_cm(sum: i64, count: usize) -> i32 {
    if count == 0 {
        return 0;
    }
    (sum / count as i64) as i32
}

// ─────────────────────────────────────────────────────────────────────────────
// Accumulators
// ─────────────────────────────────────────────────────────────────────────────

/// Per-vertex sample lists for boundary-lifted features.
#[derive(Debug, Clone, Default)]
pub struct VertexSamples {
    lists: Vec<Vec<Vec<i32>>>,
}

impl VertexSamples {
    #[must_use]
    pub fn for_footprint(footprint: &Footprint) -> Self {
        Self {
            lists: footprint
                .ring_lengths()
                .into_iter()
                .map(|n| vec![Vec::new(); n])
                .collect(),
        }
    }

    /// Append `z_cm` to every vertex within `radius` of `point`; returns how many matched.
    pub fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, radius: f64) -> usize {
        let mut matched = 0;
        for (v, q) in footprint.vertices() {
            if point.distance(q) > radius {
                continue;
            }
            if let Some(list) = self.lists.get_mut(v.ring).and_then(|r| r.get_mut(v.index)) {
                list.push(z_cm);
                matched += 1;
            }
        }
        matched
    }

    #[must_use]
    pub fn sample_count(&self, v: VertexRef) -> usize {
        self.lists
            .get(v.ring)
            .and_then(|r| r.get(v.index))
            .map_or(0, Vec::len)
    }

    /// Select the `p` percentile per vertex, then fill vertices without samples
    /// with the truncated mean of the outer ring's selected values (0 if none).
    ///
    /// The sample lists are released afterwards.
    pub fn reduce_percentile(&mut self, p: f64) -> ElevationTable {
        let selected: Vec<Vec<Option<i32>>> = self
            .lists
            .iter_mut()
            .map(|ring| ring.iter_mut().map(|l| percentile_select(l, p)).collect())
            .collect();

        let (sum, count) = selected
            .first()
            .map(|outer| {
                outer
                    .iter()
                    .flatten()
                    .fold((0i64, 0usize), |(s, c), z| (s + i64::from(*z), c + 1))
            })
            .unwrap_or_default();
        let fallback = mean_cm(sum, count);

        let missing: usize = selected.iter().flatten().filter(|z| z.is_none()).count();
        if missing > 0 {
            log::trace!("filling {missing} vertices without samples with {fallback} cm");
        }

        self.lists = Vec::new();
        ElevationTable::from_rings(
            selected
                .into_iter()
                .map(|ring| ring.into_iter().map(|z| z.unwrap_or(fallback)).collect())
                .collect(),
        )
    }
}

/// A single pool of samples for flat features.
#[derive(Debug, Clone, Default)]
pub struct FlatSamples {
    pool: Vec<i32>,
}

impl FlatSamples {
    /// Pool `z_cm` if `point` lies inside the footprint or within `buffer` of a vertex.
    pub fn record(&mut self, footprint: &Footprint, point: Point2, z_cm: i32, buffer: f64) -> bool {
        if footprint.within_range(point, buffer) {
            self.pool.push(z_cm);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// One height for the whole footprint; an empty pool gives 0. Clears the pool.
    pub fn reduce_percentile(&mut self, footprint: &Footprint, p: f64) -> ElevationTable {
        let z = percentile_select(&mut self.pool, p).unwrap_or(0);
        self.pool = Vec::new();
        ElevationTable::for_footprint(footprint, z)
    }
}
