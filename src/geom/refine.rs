//! Interior point insertion into a constrained triangulation.
//!
//! Footprint boundary edges are locked. A new point splits the triangle (or
//! unlocked edge) it lands on, then unlocked edges around it are flipped until
//! each passes the empty-circumcircle test. Locked edges are never flipped or
//! split, so the outline survives every insertion.

use std::collections::{HashMap, HashSet};

use super::core::{Point2, Tolerance};
use super::earclip::orient;

type Edge = (u32, u32);

fn undirected((a, b): Edge) -> Edge {
    if a < b { (a, b) } else { (b, a) }
}

fn edges_of([a, b, c]: [u32; 3]) -> [Edge; 3] {
    [(a, b), (b, c), (c, a)]
}

/// Positive when `d` lies inside the circumcircle of counter-clockwise `abc`.
fn in_circle(a: Point2, b: Point2, c: Point2, d: Point2) -> f64 {
    let (adx, ady) = (a.x - d.x, a.y - d.y);
    let (bdx, bdy) = (b.x - d.x, b.y - d.y);
    let (cdx, cdy) = (c.x - d.x, c.y - d.y);
    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy) - (bdx * bdx + bdy * bdy) * (adx * cdy - cdx * ady)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

#[derive(Debug)]
pub(super) struct ConstrainedMesh {
    points: Vec<Point2>,
    triangles: Vec<[u32; 3]>,
    /// Directed edge to the triangle holding it
    owner: HashMap<Edge, usize>,
    locked: HashSet<Edge>,
    tol: Tolerance,
}

impl ConstrainedMesh {
    /// `triangles` must be counter-clockwise and free of zero-area entries.
    pub(super) fn new(
        points: Vec<Point2>,
        triangles: Vec<[u32; 3]>,
        locked: impl IntoIterator<Item = Edge>,
        tol: Tolerance,
    ) -> Self {
        let mut mesh = Self {
            points,
            triangles: Vec::with_capacity(triangles.len()),
            owner: HashMap::new(),
            locked: locked.into_iter().map(undirected).collect(),
            tol,
        };
        for tri in triangles {
            mesh.push(tri);
        }
        mesh
    }

    pub(super) fn into_triangles(self) -> Vec<[u32; 3]> {
        self.triangles
    }

    fn at(&self, v: u32) -> Point2 {
        self.points[v as usize]
    }

    fn push(&mut self, tri: [u32; 3]) {
        let slot = self.triangles.len();
        self.triangles.push(tri);
        for e in edges_of(tri) {
            self.owner.insert(e, slot);
        }
    }

    fn replace(&mut self, slot: usize, tri: [u32; 3]) {
        for e in edges_of(self.triangles[slot]) {
            if self.owner.get(&e) == Some(&slot) {
                self.owner.remove(&e);
            }
        }
        self.triangles[slot] = tri;
        for e in edges_of(tri) {
            self.owner.insert(e, slot);
        }
    }

    /// Vertex of triangle `slot` that is not on edge `(a, b)`.
    fn apex(&self, slot: usize, (a, b): Edge) -> Option<u32> {
        self.triangles[slot].into_iter().find(|&v| v != a && v != b)
    }

    /// Flip every unlocked edge that fails the empty-circumcircle test.
    pub(super) fn make_delaunay(&mut self) -> usize {
        let all: Vec<Edge> = self.owner.keys().copied().filter(|&(a, b)| a < b).collect();
        self.legalize(all)
    }

    fn legalize(&mut self, mut pending: Vec<Edge>) -> usize {
        let budget = 8 * (self.triangles.len() + pending.len()) + 64;
        let mut flips = 0usize;

        while let Some((a, b)) = pending.pop() {
            if flips >= budget {
                log::debug!("edge legalization stopped after {flips} flips");
                break;
            }
            if self.locked.contains(&undirected((a, b))) {
                continue;
            }
            let (Some(&left), Some(&right)) = (self.owner.get(&(a, b)), self.owner.get(&(b, a))) else {
                continue;
            };
            let (Some(p), Some(q)) = (self.apex(left, (a, b)), self.apex(right, (b, a))) else {
                continue;
            };

            let (pa, pb, pp, pq) = (self.at(a), self.at(b), self.at(p), self.at(q));
            if in_circle(pa, pb, pp, pq) <= self.tol.eps {
                continue;
            }
            // the quad a-q-b-p must be convex for the flip to stay planar
            if orient(pp, pa, pq) <= self.tol.eps || orient(pp, pq, pb) <= self.tol.eps {
                continue;
            }

            self.replace(left, [p, a, q]);
            self.replace(right, [p, q, b]);
            flips += 1;
            pending.extend([(a, q), (q, b), (b, p), (p, a)]);
        }
        flips
    }

    fn locate(&self, p: Point2) -> Option<usize> {
        let eps = self.tol.eps;
        self.triangles.iter().position(|&[a, b, c]| {
            let (a, b, c) = (self.at(a), self.at(b), self.at(c));
            orient(a, b, p) >= -eps && orient(b, c, p) >= -eps && orient(c, a, p) >= -eps
        })
    }

    /// Insert `p` and return its vertex index.
    ///
    /// Returns `None`, leaving the mesh unchanged, when `p` lies outside every
    /// triangle, on an existing vertex, or on a locked edge.
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn insert(&mut self, p: Point2) -> Option<u32> {
        let slot = self.locate(p)?;
        let tri = self.triangles[slot];
        let corners = tri.map(|v| self.at(v));
        let near = self.tol.eps * 10.0;
        if corners.iter().any(|c| c.distance(p) <= near) {
            return None;
        }

        let on_edge = (0..3).find(|&i| {
            let (a, b) = (corners[i], corners[(i + 1) % 3]);
            p.distance_to_segment(a, b) <= near
        });
        let new = self.points.len() as u32;

        match on_edge {
            None => {
                let [a, b, c] = tri;
                self.points.push(p);
                self.replace(slot, [a, b, new]);
                self.push([b, c, new]);
                self.push([c, a, new]);
                self.legalize(vec![(a, b), (b, c), (c, a)]);
            }
            Some(i) => {
                let (a, b, c) = (tri[i], tri[(i + 1) % 3], tri[(i + 2) % 3]);
                if self.locked.contains(&undirected((a, b))) {
                    return None;
                }
                let other = *self.owner.get(&(b, a))?;
                let d = self.apex(other, (b, a))?;
                self.points.push(p);
                self.replace(slot, [a, new, c]);
                self.push([new, b, c]);
                self.replace(other, [b, new, d]);
                self.push([new, a, d]);
                self.legalize(vec![(b, c), (c, a), (a, d), (d, b)]);
            }
        }
        Some(new)
    }
}
