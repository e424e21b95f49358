use std::collections::HashSet;

use serde::Serialize;

use super::core::{Point3, VertexKey};

/// An indexed triangle mesh over lifted vertices.
///
/// Used for both the surface of a feature and its separate vertical-wall buffer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    #[must_use]
    pub fn new(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Append a vertex and return its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_vertex(&mut self, p: Point3) -> u32 {
        self.vertices.push(p);
        (self.vertices.len() - 1) as u32
    }

    pub fn push_triangle(&mut self, tri: [u32; 3]) {
        self.triangles.push(tri);
    }

    /// Returns true if all vertex indices are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.vertices.len();
        self.triangles
            .iter()
            .flatten()
            .all(|&i| (i as usize) < n)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        Ok(())
    }

    /// Triangles whose three corners snap to three distinct output vertices.
    ///
    /// Collapsed triangles (two corners sharing a [`VertexKey`]) are skipped; writers
    /// iterate this instead of `triangles` directly.
    pub fn valid_triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.triangles.iter().filter_map(|t| {
            let a = *self.vertices.get(t[0] as usize)?;
            let b = *self.vertices.get(t[1] as usize)?;
            let c = *self.vertices.get(t[2] as usize)?;
            let (ka, kb, kc) = (VertexKey::of(a), VertexKey::of(b), VertexKey::of(c));
            (ka != kb && kb != kc && ka != kc).then_some([a, b, c])
        })
    }

    #[must_use]
    pub fn collapsed_triangle_count(&self) -> usize {
        self.triangle_count() - self.valid_triangles().count()
    }

    /// Number of distinct snapped vertices referenced by non-collapsed triangles.
    #[must_use]
    pub fn distinct_vertex_count(&self) -> usize {
        self.valid_triangles()
            .flatten()
            .map(VertexKey::of)
            .collect::<HashSet<_>>()
            .len()
    }
}
