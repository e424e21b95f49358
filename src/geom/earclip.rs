//! Ear clipping over the rings of a footprint.
//!
//! Every ring becomes a closed loop in one linked [`Chain`]. Holes are spliced
//! into the outer loop through a bridge to the nearest visible vertex, then
//! ears are cut from the merged loop until a single triangle remains.
//! Triangles index vertices in ring-major order, so index `i` is the `i`-th
//! item of [`Footprint::vertices`].

use super::core::{Point2, Tolerance};
use super::footprint::{Footprint, Ring};
use super::triangulation::TriangulationError;

#[derive(Debug, Clone, Copy)]
struct Link {
    vertex: u32,
    at: Point2,
    prev: usize,
    next: usize,
}

/// Doubly linked loops of footprint vertices. Unlinked entries stay in the
/// arena; bridged vertices appear twice with the same `vertex` index.
#[derive(Debug, Default)]
struct Chain {
    links: Vec<Link>,
}

impl Chain {
    /// Add `ring` as a closed loop; `first` is the ring-major index of its first vertex.
    #[allow(clippy::cast_possible_truncation)]
    fn push_loop(&mut self, ring: &Ring, first: usize) -> usize {
        let head = self.links.len();
        let n = ring.len();
        for (i, &at) in ring.points().iter().enumerate() {
            self.links.push(Link {
                vertex: (first + i) as u32,
                at,
                prev: head + (i + n - 1) % n,
                next: head + (i + 1) % n,
            });
        }
        head
    }

    fn at(&self, l: usize) -> Point2 {
        self.links[l].at
    }

    fn unlink(&mut self, l: usize) {
        let Link { prev, next, .. } = self.links[l];
        self.links[prev].next = next;
        self.links[next].prev = prev;
    }

    /// Links of the loop through `head`, starting at `head`.
    fn walk(&self, head: usize) -> impl Iterator<Item = usize> + '_ {
        let mut cur = Some(head);
        std::iter::from_fn(move || {
            let l = cur?;
            let next = self.links[l].next;
            cur = (next != head).then_some(next);
            Some(l)
        })
    }

    /// Edges of the loop through `head` as point pairs.
    fn loop_edges(&self, head: usize) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        self.walk(head)
            .map(|l| (self.at(l), self.at(self.links[l].next)))
    }

    /// Merge the loop holding `hole` into the loop holding `anchor`.
    ///
    /// The merged order is `anchor, hole, .., hole.prev, hole', anchor', anchor.next`
    /// where the primed links are copies closing the bridge.
    fn splice(&mut self, anchor: usize, hole: usize) {
        let anchor_next = self.links[anchor].next;
        let hole_prev = self.links[hole].prev;
        let anchor_copy = self.links.len();
        let hole_copy = anchor_copy + 1;

        let anchor_link = self.links[anchor];
        let hole_link = self.links[hole];
        self.links.push(Link {
            prev: hole_copy,
            next: anchor_next,
            ..anchor_link
        });
        self.links.push(Link {
            prev: hole_prev,
            next: anchor_copy,
            ..hole_link
        });

        self.links[anchor_next].prev = anchor_copy;
        self.links[hole_prev].next = hole_copy;
        self.links[anchor].next = hole;
        self.links[hole].prev = anchor;
    }

    /// Nearest link of the loop through `outer` that `hole` can reach without
    /// crossing any loop in `blockers` and without leaving the footprint.
    fn bridge_anchor(
        &self,
        outer: usize,
        hole: usize,
        blockers: &[usize],
        footprint: &Footprint,
        tol: Tolerance,
    ) -> Option<usize> {
        let from = self.at(hole);
        let mut candidates: Vec<usize> = self.walk(outer).collect();
        candidates.sort_by(|&a, &b| {
            from.distance_squared(self.at(a))
                .total_cmp(&from.distance_squared(self.at(b)))
        });

        candidates.into_iter().find(|&l| {
            let to = self.at(l);
            if tol.approx_eq_point2(from, to) {
                return false;
            }
            let mid = Point2::new((from.x + to.x) * 0.5, (from.y + to.y) * 0.5);
            footprint.contains(mid)
                && blockers.iter().all(|&head| {
                    self.loop_edges(head)
                        .all(|(a, b)| !blocks_segment(from, to, a, b, tol))
                })
        })
    }

    fn is_ear(&self, ear: usize, tol: Tolerance) -> bool {
        let Link { prev, next, .. } = self.links[ear];
        let (a, b, c) = (self.at(prev), self.at(ear), self.at(next));
        if orient(a, b, c) <= tol.eps {
            return false;
        }

        let mut l = self.links[next].next;
        while l != prev {
            let p = self.at(l);
            let corner = [a, b, c].iter().any(|&q| tol.approx_eq_point2(p, q));
            if !corner && covers(a, b, c, p, tol) {
                return false;
            }
            l = self.links[l].next;
        }
        true
    }

    /// Link whose corner is closest to a straight angle.
    fn flattest(&self, head: usize) -> usize {
        self.walk(head)
            .min_by(|&x, &y| self.turn(x).abs().total_cmp(&self.turn(y).abs()))
            .unwrap_or(head)
    }

    fn turn(&self, l: usize) -> f64 {
        let Link { prev, next, .. } = self.links[l];
        orient(self.at(prev), self.at(l), self.at(next))
    }

    fn triangle_at(&self, l: usize) -> [u32; 3] {
        let Link { prev, next, .. } = self.links[l];
        [
            self.links[prev].vertex,
            self.links[l].vertex,
            self.links[next].vertex,
        ]
    }

    /// Cut ears from the counter-clockwise loop through `head`.
    fn clip(&mut self, head: usize, tol: Tolerance) -> Vec<[u32; 3]> {
        let mut remaining = self.walk(head).count();
        let mut triangles = Vec::with_capacity(remaining.saturating_sub(2));
        let mut cur = head;
        let mut misses = 0usize;

        while remaining > 3 {
            let cut = if self.is_ear(cur, tol) {
                cur
            } else if misses > remaining {
                // no strictly convex ear left: drop the flattest corner
                let flat = self.flattest(cur);
                log::trace!("ear clipping stalled, cutting flat corner {}", self.links[flat].vertex);
                flat
            } else {
                misses += 1;
                cur = self.links[cur].next;
                continue;
            };

            triangles.push(self.triangle_at(cut));
            cur = self.links[cut].next;
            self.unlink(cut);
            remaining -= 1;
            misses = 0;
        }
        triangles.push(self.triangle_at(cur));
        triangles
    }
}

/// Triangulate `footprint` by ear clipping. Triangles are counter-clockwise and
/// may include zero-area ones where the outline has flat corners.
///
/// # Errors
/// `DegenerateRing { ring: 0 }` for an outer ring without area, `Failed` when a
/// hole cannot be bridged to the outer ring.
pub(super) fn clip_footprint(footprint: &Footprint, tol: Tolerance) -> Result<Vec<[u32; 3]>, TriangulationError> {
    if footprint.outer().signed_area() <= tol.eps {
        return Err(TriangulationError::DegenerateRing { ring: 0 });
    }

    let mut chain = Chain::default();
    let outer = chain.push_loop(footprint.outer(), 0);
    let mut first = footprint.outer().len();

    // (leftmost link, ring number) per usable hole
    let mut holes = Vec::with_capacity(footprint.holes().len());
    for (i, hole) in footprint.holes().iter().enumerate() {
        let head = chain.push_loop(hole, first);
        first += hole.len();
        if hole.signed_area().abs() <= tol.eps {
            log::debug!("skipping hole ring {} without area", i + 1);
            continue;
        }
        let leftmost = chain
            .walk(head)
            .min_by(|&a, &b| {
                let (pa, pb) = (chain.at(a), chain.at(b));
                pa.x.total_cmp(&pb.x).then(pa.y.total_cmp(&pb.y))
            })
            .unwrap_or(head);
        holes.push((leftmost, i + 1));
    }
    holes.sort_by(|&(a, _), &(b, _)| chain.at(a).x.total_cmp(&chain.at(b).x));

    for k in 0..holes.len() {
        let (hole, ring) = holes[k];
        let mut blockers = vec![outer];
        blockers.extend(holes[k..].iter().map(|&(l, _)| l));
        let anchor = chain
            .bridge_anchor(outer, hole, &blockers, footprint, tol)
            .ok_or_else(|| TriangulationError::Failed(format!("hole ring {ring} cannot be bridged")))?;
        chain.splice(anchor, hole);
    }

    Ok(chain.clip(outer, tol))
}

pub(super) fn orient(a: Point2, b: Point2, c: Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// `p` inside or on the counter-clockwise triangle `abc`.
fn covers(a: Point2, b: Point2, c: Point2, p: Point2, tol: Tolerance) -> bool {
    orient(a, b, p) >= -tol.eps && orient(b, c, p) >= -tol.eps && orient(c, a, p) >= -tol.eps
}

/// Whether edge `ab` obstructs the open segment `pq`. Edges touching `p` or `q`
/// never obstruct.
fn blocks_segment(p: Point2, q: Point2, a: Point2, b: Point2, tol: Tolerance) -> bool {
    let touches = [a, b]
        .iter()
        .any(|&e| tol.approx_eq_point2(e, p) || tol.approx_eq_point2(e, q));
    if touches {
        return false;
    }

    let (d1, d2) = (orient(p, q, a), orient(p, q, b));
    let (d3, d4) = (orient(a, b, p), orient(a, b, q));
    let opposite = |x: f64, y: f64| (x > tol.eps && y < -tol.eps) || (x < -tol.eps && y > tol.eps);
    if opposite(d1, d2) && opposite(d3, d4) {
        return true;
    }
    // an edge endpoint lying on the segment
    (d1.abs() <= tol.eps && between(p, q, a)) || (d2.abs() <= tol.eps && between(p, q, b))
}

fn between(p: Point2, q: Point2, x: Point2) -> bool {
    let t = (x.x - p.x) * (q.x - p.x) + (x.y - p.y) * (q.y - p.y);
    t > 0.0 && t < p.distance_squared(q)
}
