use serde::{Deserialize, Serialize};

/// Converts an elevation in meters to integer centimeters, truncating toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn meters_to_cm(z: f64) -> i32 {
    (z * 100.0) as i32
}

/// Converts integer centimeters back to meters.
#[must_use]
pub fn cm_to_meters(z_cm: i32) -> f64 {
    f64::from(z_cm) / 100.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Point2
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Planar Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Shortest distance from this point to the segment `a`-`b`.
    #[must_use]
    pub fn distance_to_segment(self, a: Self, b: Self) -> f64 {
        let abx = b.x - a.x;
        let aby = b.y - a.y;
        let len2 = abx * abx + aby * aby;
        if !len2.is_finite() || len2 <= 0.0 {
            return self.distance(a);
        }
        let t = (((self.x - a.x) * abx + (self.y - a.y) * aby) / len2).clamp(0.0, 1.0);
        self.distance(Self::new(a.x + t * abx, a.y + t * aby))
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(arr: [f64; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Point3
// ─────────────────────────────────────────────────────────────────────────────

/// A planar position lifted to an elevation stored in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z_cm: i32,
}

impl Point3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z_cm: i32) -> Self {
        Self { x, y, z_cm }
    }

    #[must_use]
    pub const fn lifted(p: Point2, z_cm: i32) -> Self {
        Self::new(p.x, p.y, z_cm)
    }

    #[must_use]
    pub fn from_meters(x: f64, y: f64, z: f64) -> Self {
        Self::new(x, y, meters_to_cm(z))
    }

    #[must_use]
    pub const fn xy(self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    #[must_use]
    pub fn z_meters(self) -> f64 {
        cm_to_meters(self.z_cm)
    }

    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z_meters()]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapped keys
// ─────────────────────────────────────────────────────────────────────────────

/// A planar location snapped to millimeters, used to key node columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    pub x_mm: i64,
    pub y_mm: i64,
}

impl LocationKey {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn of(p: Point2) -> Self {
        Self {
            x_mm: (p.x * 1000.0).round() as i64,
            y_mm: (p.y * 1000.0).round() as i64,
        }
    }
}

/// A lifted vertex snapped to millimeters in plan and centimeters in height.
///
/// Two mesh vertices with the same key are the same output vertex; triangles
/// touching the same key twice are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexKey {
    pub location: LocationKey,
    pub z_cm: i32,
}

impl VertexKey {
    #[must_use]
    pub fn of(p: Point3) -> Self {
        Self {
            location: LocationKey::of(p.xy()),
            z_cm: p.z_cm,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BBox2
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BBox2 {
    #[must_use]
    pub const fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn from_points(points: &[Point2]) -> Option<Self> {
        let mut iter = points.iter().copied();
        let first = iter.next()?;
        let mut min = first;
        let mut max = first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self::new(min, max))
    }

    #[must_use]
    pub fn width(self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(self) -> f64 {
        self.max.y - self.min.y
    }

    /// Check if a point is inside the bounding box (inclusive).
    #[must_use]
    pub fn contains_point(self, p: Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Check if this bounding box intersects (overlaps) with another.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Expand the bounding box by a scalar amount in all directions.
    #[must_use]
    pub fn expand_by(self, amount: f64) -> Self {
        Self::new(
            Point2::new(self.min.x - amount, self.min.y - amount),
            Point2::new(self.max.x + amount, self.max.y + amount),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tolerance
// ─────────────────────────────────────────────────────────────────────────────

/// Tolerance configuration for geometric operations.
///
/// - `Tolerance::DEFAULT` - General geometry comparisons (1e-9)
/// - `Tolerance::EDGE_MATCH` - Matching shared vertices between features (1 mm)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub eps: f64,
}

impl Tolerance {
    /// Default geometric tolerance (1e-9).
    pub const DEFAULT: Self = Self { eps: 1e-9 };

    /// Absolute distance under which two footprint vertices are the same location (1e-3).
    pub const EDGE_MATCH: Self = Self { eps: 1e-3 };

    #[must_use]
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    #[must_use]
    pub const fn eps_squared(self) -> f64 {
        self.eps * self.eps
    }

    #[must_use]
    pub fn approx_eq_f64(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.eps
    }

    /// Euclidean comparison, matching `distance(a, b) <= eps`.
    #[must_use]
    pub fn approx_eq_point2(self, a: Point2, b: Point2) -> bool {
        a.distance(b) <= self.eps
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_cm_truncates() {
        assert_eq!(meters_to_cm(1.239), 123);
        assert_eq!(meters_to_cm(-1.239), -123);
        assert!((cm_to_meters(250) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_point3_meter_conversions() {
        let p = Point3::from_meters(2.0, 3.0, 12.345);
        assert_eq!(p.z_cm, 1234);
        let [x, y, z] = p.to_array();
        let tol = Tolerance::DEFAULT;
        assert!(tol.approx_eq_f64(x, 2.0));
        assert!(tol.approx_eq_f64(y, 3.0));
        assert!(tol.approx_eq_f64(z, 12.34));
        assert!(!tol.approx_eq_f64(z, 12.345));
    }

    #[test]
    fn test_point2_distance_to_segment() {
        let p = Point2::new(0.5, 1.0);
        let d = p.distance_to_segment(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        assert!((d - 1.0).abs() < 1e-12);

        let beyond = Point2::new(3.0, 0.0);
        let d = beyond.distance_to_segment(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bbox_methods() {
        let bbox = BBox2::from_points(&[
            Point2::new(0.0, 1.0),
            Point2::new(2.0, -1.0),
            Point2::new(1.0, 3.0),
        ])
        .unwrap();

        assert_eq!(bbox.min, Point2::new(0.0, -1.0));
        assert_eq!(bbox.max, Point2::new(2.0, 3.0));
        assert!((bbox.width() - 2.0).abs() < 1e-12);
        assert!(bbox.contains_point(Point2::new(1.0, 0.0)));
        assert!(!bbox.contains_point(Point2::new(-0.5, 0.0)));
        assert!(bbox.expand_by(0.5).contains_point(Point2::new(-0.5, 0.0)));
    }

    #[test]
    fn test_bbox_intersects() {
        let a = BBox2::new(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0));
        let b = BBox2::new(Point2::new(2.0, 1.0), Point2::new(3.0, 3.0));
        let c = BBox2::new(Point2::new(5.0, 5.0), Point2::new(6.0, 6.0));

        assert!(a.intersects(b));
        assert!(!a.intersects(c));
    }

    #[test]
    fn test_vertex_keys_snap() {
        let a = VertexKey::of(Point3::new(1.0001, 2.0, 150));
        let b = VertexKey::of(Point3::new(1.0004, 2.0, 150));
        let c = VertexKey::of(Point3::new(1.0004, 2.0, 151));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_edge_match_tolerance() {
        let tol = Tolerance::EDGE_MATCH;
        assert!(tol.approx_eq_point2(Point2::new(0.0, 0.0), Point2::new(0.0005, 0.0005)));
        assert!(!tol.approx_eq_point2(Point2::new(0.0, 0.0), Point2::new(0.002, 0.0)));
    }
}
