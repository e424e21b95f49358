//! Footprint rings and polygons-with-holes.
//!
//! A [`Footprint`] is the plan-view shape of one feature: an outer [`Ring`]
//! plus zero or more hole rings. Construction cleans every ring (closing point
//! and consecutive duplicates removed) and corrects orientation so the outer
//! ring is counter-clockwise and holes are clockwise. The result is immutable,
//! which keeps the `(ring, index)` addressing stable for every per-vertex
//! array built on top of it.
//!
//! # Example
//! ```ignore
//! use drape_engine::geom::{Footprint, Point2};
//!
//! let fp = Footprint::from_wkt("POLYGON((0 0,0 1,1 1,1 0,0 0))")?;
//! assert!(fp.outer().is_ccw());
//! assert!(fp.contains(Point2::new(0.5, 0.5)));
//! ```

use super::core::{BBox2, Point2, Tolerance};
use super::wkt;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building footprint geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("unreadable polygon geometry: {0}")]
    InvalidWkt(String),
    #[error("polygon has no vertices")]
    Empty,
    #[error("polygon points must be finite")]
    NonFinitePoints,
    #[error("ring {ring} requires at least 3 distinct points, got {count}")]
    InsufficientPoints { ring: usize, count: usize },
}

// ============================================================================
// VertexRef
// ============================================================================

/// Address of one footprint vertex: ring 0 is the outer ring, ring `i + 1` the i-th hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexRef {
    pub ring: usize,
    pub index: usize,
}

impl VertexRef {
    #[must_use]
    pub const fn new(ring: usize, index: usize) -> Self {
        Self { ring, index }
    }
}

/// A directed boundary edge `a -> b` following ring order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingEdge {
    pub a: VertexRef,
    pub b: VertexRef,
    pub pa: Point2,
    pub pb: Point2,
}

// ============================================================================
// Ring
// ============================================================================

/// A closed ring of planar points, stored without the repeated closing point.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    points: Vec<Point2>,
}

impl Ring {
    /// Create a ring, removing the closing point and consecutive duplicates.
    ///
    /// # Errors
    /// Returns `GeometryError` if points are non-finite or fewer than 3 remain.
    pub fn new(points: Vec<Point2>) -> Result<Self, GeometryError> {
        Self::cleaned(points, 0)
    }

    fn cleaned(mut points: Vec<Point2>, ring: usize) -> Result<Self, GeometryError> {
        if points.iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinitePoints);
        }

        let tol = Tolerance::DEFAULT;
        if points.len() > 1 {
            if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
                if tol.approx_eq_point2(first, last) {
                    points.pop();
                }
            }
        }

        let mut cleaned: Vec<Point2> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned
                .last()
                .copied()
                .is_some_and(|prev| tol.approx_eq_point2(prev, p))
            {
                continue;
            }
            cleaned.push(p);
        }
        // the wrap-around pair can still repeat after popping a single closing point
        while cleaned.len() > 1
            && tol.approx_eq_point2(cleaned[0], cleaned[cleaned.len() - 1])
        {
            cleaned.pop();
        }

        if cleaned.len() < 3 {
            return Err(GeometryError::InsufficientPoints {
                ring,
                count: cleaned.len(),
            });
        }

        Ok(Self { points: cleaned })
    }

    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the vertex following `index`, wrapping to 0.
    #[must_use]
    pub fn next_index(&self, index: usize) -> usize {
        if index + 1 >= self.points.len() {
            0
        } else {
            index + 1
        }
    }

    /// Shoelace signed area; positive for counter-clockwise rings.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let mut area = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            area += a.x * b.y - b.x * a.y;
        }
        0.5 * area
    }

    #[must_use]
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Even-odd ray test. Points exactly on the boundary are not guaranteed either way.
    #[must_use]
    pub fn contains(&self, p: Point2) -> bool {
        let pts = &self.points;
        let n = pts.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = pts[i];
            let b = pts[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// First vertex within `tol` of `p`, if any.
    #[must_use]
    pub fn locate(&self, p: Point2, tol: Tolerance) -> Option<usize> {
        self.points.iter().position(|q| tol.approx_eq_point2(p, *q))
    }
}

// ============================================================================
// Footprint
// ============================================================================

/// An orientation-corrected polygon with holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    outer: Ring,
    holes: Vec<Ring>,
}

impl Footprint {
    /// Build a footprint from an outer ring and holes, in that order.
    ///
    /// # Errors
    /// Returns `GeometryError` when the outer ring is missing, non-finite, or any
    /// ring has fewer than 3 distinct points.
    pub fn new(outer: Vec<Point2>, holes: Vec<Vec<Point2>>) -> Result<Self, GeometryError> {
        if outer.is_empty() {
            return Err(GeometryError::Empty);
        }

        let outer = Ring::cleaned(outer, 0)?;
        let outer = if outer.is_ccw() { outer } else { outer.reversed() };

        let mut cleaned_holes = Vec::with_capacity(holes.len());
        for (i, hole) in holes.into_iter().enumerate() {
            let hole = Ring::cleaned(hole, i + 1)?;
            cleaned_holes.push(if hole.is_ccw() { hole.reversed() } else { hole });
        }

        Ok(Self {
            outer,
            holes: cleaned_holes,
        })
    }

    /// Parse a `POLYGON` well-known-text string.
    ///
    /// # Errors
    /// Returns `GeometryError::InvalidWkt` for unreadable text, or any
    /// construction error from [`Footprint::new`].
    pub fn from_wkt(text: &str) -> Result<Self, GeometryError> {
        let mut rings = wkt::parse_polygon(text)?.into_iter();
        let outer = rings.next().ok_or(GeometryError::Empty)?;
        Self::new(outer, rings.collect())
    }

    #[must_use]
    pub fn outer(&self) -> &Ring {
        &self.outer
    }

    #[must_use]
    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    #[must_use]
    pub fn ring(&self, ring: usize) -> Option<&Ring> {
        if ring == 0 {
            Some(&self.outer)
        } else {
            self.holes.get(ring - 1)
        }
    }

    /// Outer ring first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.holes.len() + 1
    }

    #[must_use]
    pub fn ring_lengths(&self) -> Vec<usize> {
        self.rings().map(Ring::len).collect()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.rings().map(Ring::len).sum()
    }

    #[must_use]
    pub fn vertex(&self, v: VertexRef) -> Option<Point2> {
        self.ring(v.ring).and_then(|r| r.points().get(v.index).copied())
    }

    /// Position of `v` in ring-major order, the order of [`Footprint::vertices`].
    #[must_use]
    pub fn vertex_index(&self, v: VertexRef) -> Option<usize> {
        let ring = self.ring(v.ring)?;
        if v.index >= ring.len() {
            return None;
        }
        let offset: usize = self.rings().take(v.ring).map(Ring::len).sum();
        Some(offset + v.index)
    }

    /// All vertices in ring-major order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexRef, Point2)> + '_ {
        self.rings().enumerate().flat_map(|(ri, ring)| {
            ring.points()
                .iter()
                .enumerate()
                .map(move |(i, p)| (VertexRef::new(ri, i), *p))
        })
    }

    /// Every boundary edge, feature order: ring by ring, then along each ring.
    pub fn edges(&self) -> impl Iterator<Item = RingEdge> + '_ {
        self.rings().enumerate().flat_map(|(ri, ring)| {
            let pts = ring.points();
            (0..pts.len()).map(move |i| {
                let j = ring.next_index(i);
                RingEdge {
                    a: VertexRef::new(ri, i),
                    b: VertexRef::new(ri, j),
                    pa: pts[i],
                    pb: pts[j],
                }
            })
        })
    }

    #[must_use]
    pub fn bbox(&self) -> BBox2 {
        // the outer ring is never empty after construction
        BBox2::from_points(self.outer.points())
            .unwrap_or_else(|| BBox2::new(Point2::default(), Point2::default()))
    }

    /// Point strictly inside the outer ring and outside every hole.
    #[must_use]
    pub fn contains(&self, p: Point2) -> bool {
        self.outer.contains(p) && !self.holes.iter().any(|h| h.contains(p))
    }

    /// Distance from `p` to the closest boundary segment of any ring.
    #[must_use]
    pub fn distance_to_boundary(&self, p: Point2) -> f64 {
        self.edges()
            .map(|e| p.distance_to_segment(e.pa, e.pb))
            .fold(f64::INFINITY, f64::min)
    }

    /// True when `p` is within `radius` of any vertex, or inside the polygon.
    #[must_use]
    pub fn within_range(&self, p: Point2, radius: f64) -> bool {
        self.vertices().any(|(_, q)| p.distance(q) <= radius) || self.contains(p)
    }

    /// The first vertex matching `p` in each ring that has one.
    #[must_use]
    pub fn locate_vertices(&self, p: Point2, tol: Tolerance) -> Vec<VertexRef> {
        self.rings()
            .enumerate()
            .filter_map(|(ri, ring)| ring.locate(p, tol).map(|i| VertexRef::new(ri, i)))
            .collect()
    }

    /// Find the directed edge `a -> b` in ring order.
    ///
    /// Returns the vertex references of `a` and `b` when some ring has a vertex at
    /// `a` whose successor lies at `b`, both within `tol`.
    #[must_use]
    pub fn find_segment(
        &self,
        a: Point2,
        b: Point2,
        tol: Tolerance,
    ) -> Option<(VertexRef, VertexRef)> {
        self.locate_vertices(a, tol).into_iter().find_map(|va| {
            let ring = self.ring(va.ring)?;
            let next = ring.next_index(va.index);
            let pb = ring.points()[next];
            tol.approx_eq_point2(pb, b)
                .then_some((va, VertexRef::new(va.ring, next)))
        })
    }
}
