//! Surface constraint engine.
//!
//! Every operation takes the current (or drag-start) surface plus a proposed
//! edit and returns `Some(new_surface)` only when the candidate passes
//! [`rings_valid`]. `None` means the edit is dropped and the caller keeps its
//! prior value; nothing here mutates its input.

use crate::clipping::PolygonOps;
use crate::error::{Error, Result};
use crate::geometry::{
    distance, interior_angle, is_right_angle, next_index, prev_index, rings_valid,
    segments_intersect, signed_area,
};
use crate::model::{Point, Ring, Surface, distance_to_segment};
use tracing::debug;

/// Two corners closer than this are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1e-6;

/// Smallest area a drawn rectangle or ring must enclose to be applied.
const MIN_SHAPE_AREA: f64 = 1e-6;

/// A corner: vertex `index` of ring `ring`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexRef {
    pub ring: usize,
    pub index: usize,
}

/// A wall: the edge from vertex `index` to the following vertex of `ring`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallRef {
    pub ring: usize,
    pub index: usize,
}

/// Direction a wall is allowed to travel while dragged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallAxis {
    /// Horizontal wall; moves only in Y.
    Horizontal,
    /// Vertical wall; moves only in X.
    Vertical,
    /// Slanted wall; moves along its normal.
    Oblique,
}

impl WallAxis {
    pub fn of(a: Point, b: Point) -> Self {
        if (a.y - b.y).abs() <= COINCIDENT_EPSILON {
            WallAxis::Horizontal
        } else if (a.x - b.x).abs() <= COINCIDENT_EPSILON {
            WallAxis::Vertical
        } else {
            WallAxis::Oblique
        }
    }
}

fn coincident(a: Point, b: Point) -> bool {
    distance(a, b) <= COINCIDENT_EPSILON
}

fn commit(surface: &Surface, rings: Vec<Ring>, what: &str) -> Option<Surface> {
    if rings_valid(&rings) {
        Some(surface.with_rings(rings))
    } else {
        debug!(operation = what, "rejected self-intersecting candidate");
        None
    }
}

pub fn ring_of(surface: &Surface, ring: usize) -> Option<&Ring> {
    surface.rings.get(ring).filter(|r| r.len() >= 3)
}

/// Move one corner by `delta` from its position in `start`.
pub fn drag_corner(start: &Surface, corner: VertexRef, delta: Point) -> Option<Surface> {
    let ring = ring_of(start, corner.ring)?;
    let n = ring.len();
    let i = corner.index;
    if i >= n {
        return None;
    }
    let moved = ring[i] + delta;
    if coincident(moved, ring[prev_index(i, n)]) || coincident(moved, ring[next_index(i, n)]) {
        debug!(ring = corner.ring, index = i, "corner would collapse onto a neighbour");
        return None;
    }
    let mut rings = start.rings.clone();
    rings[corner.ring][i] = moved;
    commit(start, rings, "drag_corner")
}

/// Move both ends of a wall by the component of `delta` the axis allows.
pub fn drag_wall(start: &Surface, wall: WallRef, axis: WallAxis, delta: Point) -> Option<Surface> {
    let ring = ring_of(start, wall.ring)?;
    let n = ring.len();
    let i = wall.index;
    if i >= n {
        return None;
    }
    let j = next_index(i, n);
    let shift = match axis {
        WallAxis::Horizontal => Point::new(0.0, delta.y),
        WallAxis::Vertical => Point::new(delta.x, 0.0),
        WallAxis::Oblique => {
            let dir = ring[j] - ring[i];
            let len = dir.length();
            if len <= COINCIDENT_EPSILON {
                return None;
            }
            let normal = Point::new(-dir.y / len, dir.x / len);
            normal * delta.dot(normal)
        }
    };
    let new_start = ring[i] + shift;
    let new_end = ring[j] + shift;
    if coincident(new_start, ring[prev_index(i, n)]) || coincident(new_end, ring[next_index(j, n)])
    {
        debug!(ring = wall.ring, index = i, "wall end would meet its neighbour");
        return None;
    }
    let mut rings = start.rings.clone();
    rings[wall.ring][i] = new_start;
    rings[wall.ring][j] = new_end;
    commit(start, rings, "drag_wall")
}

/// Relocate `corner` so that `prev -> corner -> next` forms a right angle.
///
/// The two axis-aligned candidates are `(prev.x, next.y)` and
/// `(next.x, prev.y)`; which one keeps the corner convex or reflex depends on
/// the quadrant `next` lies in relative to `prev`. When `prev` and `next`
/// share an axis the corner goes to the apex of the circle through them,
/// halfway along that axis, on the side it already sits on.
pub fn make_angle_right(prev: Point, corner: Point, next: Point) -> Point {
    if is_right_angle(prev, corner, next) {
        return corner;
    }
    let dx = next.x - prev.x;
    let dy = next.y - prev.y;
    if dx == 0.0 {
        let side = if corner.x < prev.x { -1.0 } else { 1.0 };
        return Point::new(prev.x + side * dy.abs() * 0.5, (prev.y + next.y) * 0.5);
    }
    if dy == 0.0 {
        let side = if corner.y < prev.y { -1.0 } else { 1.0 };
        return Point::new((prev.x + next.x) * 0.5, prev.y + side * dx.abs() * 0.5);
    }

    let reflex = interior_angle(prev, corner, next) >= 180.0;
    let prev_column = Point::new(prev.x, next.y);
    let next_column = Point::new(next.x, prev.y);
    // whether the corner in prev's column is the reflex one
    let prev_column_reflex = match (dx > 0.0, dy > 0.0) {
        (true, true) => true,
        (false, false) => true,
        (true, false) => false,
        (false, true) => false,
    };
    if prev_column_reflex == reflex {
        prev_column
    } else {
        next_column
    }
}

/// Apply [`make_angle_right`] to one corner of the surface.
pub fn square_corner(surface: &Surface, corner: VertexRef) -> Option<Surface> {
    let ring = ring_of(surface, corner.ring)?;
    let n = ring.len();
    let i = corner.index;
    if i >= n {
        return None;
    }
    let prev = ring[prev_index(i, n)];
    let next = ring[next_index(i, n)];
    let moved = make_angle_right(prev, ring[i], next);
    if moved == ring[i] {
        return None;
    }
    let mut rings = surface.rings.clone();
    rings[corner.ring][i] = moved;
    commit(surface, rings, "square_corner")
}

/// New end point of the wall `start -> end` so that its metric length is
/// `target_length`, keeping the direction.
pub fn adjust_wall_length(start: Point, end: Point, target_length: f64, scale: f64) -> Point {
    let dir = end - start;
    let len = dir.length();
    if len <= COINCIDENT_EPSILON || scale <= 0.0 {
        return end;
    }
    let pixel_length = target_length / scale;
    start + dir * (pixel_length / len)
}

/// Metric length of a wall.
pub fn wall_length(surface: &Surface, wall: WallRef, scale: f64) -> Option<f64> {
    let ring = ring_of(surface, wall.ring)?;
    let n = ring.len();
    if wall.index >= n {
        return None;
    }
    Some(distance(ring[wall.index], ring[next_index(wall.index, n)]) * scale)
}

/// Resize a wall to `target_length` metric units.
///
/// With `keep_right_angles`, if the corner at the wall's end was a right
/// angle, the following corner is moved to keep it one: of the two points
/// perpendicular to the wall at the new end (at the old end-to-corner
/// distance), the one nearer the corner's old position wins.
pub fn set_wall_length(
    surface: &Surface,
    wall: WallRef,
    target_length: f64,
    scale: f64,
    keep_right_angles: bool,
) -> Option<Surface> {
    if !(target_length > 0.0) {
        return None;
    }
    let ring = ring_of(surface, wall.ring)?;
    let n = ring.len();
    let i = wall.index;
    if i >= n {
        return None;
    }
    let j = next_index(i, n);
    let k = next_index(j, n);
    let (a, b, c) = (ring[i], ring[j], ring[k]);
    let new_end = adjust_wall_length(a, b, target_length, scale);
    if new_end == b {
        return None;
    }

    let mut rings = surface.rings.clone();
    rings[wall.ring][j] = new_end;

    if keep_right_angles && is_right_angle(a, b, c) {
        let dir = new_end - a;
        let len = dir.length();
        let reach = distance(b, c);
        let normal = Point::new(-dir.y / len, dir.x / len);
        let first = new_end + normal * reach;
        let second = new_end - normal * reach;
        rings[wall.ring][k] = if distance(first, c) <= distance(second, c) {
            first
        } else {
            second
        };
    }
    commit(surface, rings, "set_wall_length")
}

/// Split a wall by inserting a corner at `at`.
pub fn insert_corner(surface: &Surface, wall: WallRef, at: Point) -> Option<Surface> {
    let ring = ring_of(surface, wall.ring)?;
    let n = ring.len();
    if wall.index >= n {
        return None;
    }
    let j = next_index(wall.index, n);
    if coincident(at, ring[wall.index]) || coincident(at, ring[j]) {
        return None;
    }
    let mut rings = surface.rings.clone();
    rings[wall.ring].insert(wall.index + 1, at);
    commit(surface, rings, "insert_corner")
}

/// Drop a corner, merging its two walls. Rings keep at least three corners.
pub fn remove_corner(surface: &Surface, corner: VertexRef) -> Option<Surface> {
    let ring = ring_of(surface, corner.ring)?;
    if ring.len() <= 3 || corner.index >= ring.len() {
        return None;
    }
    let mut rings = surface.rings.clone();
    rings[corner.ring].remove(corner.index);
    commit(surface, rings, "remove_corner")
}

/// Shift the whole surface; used by preview panning.
pub fn translate_surface(surface: &Surface, delta: Point) -> Surface {
    surface.with_rings(
        surface
            .rings
            .iter()
            .map(|r| r.iter().map(|&p| p + delta).collect())
            .collect(),
    )
}

/// Interior angle at each corner, in degrees, independent of ring winding.
pub fn corner_angles(ring: &[Point]) -> Vec<f64> {
    let n = ring.len();
    if n < 3 {
        return Vec::new();
    }
    let flipped = signed_area(ring) < 0.0;
    (0..n)
        .map(|i| {
            let prev = ring[prev_index(i, n)];
            let next = ring[next_index(i, n)];
            if flipped {
                interior_angle(next, ring[i], prev)
            } else {
                interior_angle(prev, ring[i], next)
            }
        })
        .collect()
}

/// Metric length of every wall of a ring, in ring order.
pub fn wall_lengths(ring: &[Point], scale: f64) -> Vec<f64> {
    let n = ring.len();
    (0..n)
        .map(|i| distance(ring[i], ring[next_index(i, n)]) * scale)
        .collect()
}

/// Nearest corner within `radius` of `p`.
pub fn hit_corner(surface: &Surface, p: Point, radius: f64) -> Option<VertexRef> {
    let mut best: Option<(f64, VertexRef)> = None;
    for (r, ring) in surface.rings.iter().enumerate() {
        for (i, &q) in ring.iter().enumerate() {
            let d = distance(p, q);
            if d <= radius && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, VertexRef { ring: r, index: i }));
            }
        }
    }
    best.map(|(_, v)| v)
}

/// Nearest wall within `radius` of `p`.
pub fn hit_wall(surface: &Surface, p: Point, radius: f64) -> Option<WallRef> {
    let mut best: Option<(f64, WallRef)> = None;
    for (r, ring) in surface.rings.iter().enumerate() {
        let n = ring.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let d = distance_to_segment(p, ring[i], ring[next_index(i, n)]);
            if d <= radius && best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, WallRef { ring: r, index: i }));
            }
        }
    }
    best.map(|(_, w)| w)
}

/// An outer ring together with the holes directly inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeGroup {
    pub outer: usize,
    pub holes: Vec<usize>,
}

/// Recover outer/hole structure from a flat ring list by even-odd nesting.
pub fn group_shapes(rings: &[Ring]) -> Vec<ShapeGroup> {
    use crate::geometry::point_in_ring;

    let containers = |i: usize| -> Vec<usize> {
        let Some(&sample) = rings[i].first() else {
            return Vec::new();
        };
        (0..rings.len())
            .filter(|&j| j != i && point_in_ring(sample, &rings[j]))
            .collect()
    };
    let depths: Vec<usize> = (0..rings.len()).map(|i| containers(i).len()).collect();

    let mut groups: Vec<ShapeGroup> = (0..rings.len())
        .filter(|&i| rings[i].len() >= 3 && depths[i] % 2 == 0)
        .map(|outer| ShapeGroup {
            outer,
            holes: Vec::new(),
        })
        .collect();

    for hole in (0..rings.len()).filter(|&i| rings[i].len() >= 3 && depths[i] % 2 == 1) {
        let parent = containers(hole)
            .into_iter()
            .filter(|&j| depths[j] + 1 == depths[hole])
            .min_by(|&a, &b| {
                signed_area(&rings[a])
                    .abs()
                    .total_cmp(&signed_area(&rings[b]).abs())
            });
        if let Some(parent) = parent {
            if let Some(group) = groups.iter_mut().find(|g| g.outer == parent) {
                group.holes.push(hole);
            }
        }
    }
    groups
}

/// Triangles covering the surface, holes excluded, for filling on screen.
pub fn fill_triangles(rings: &[Ring]) -> Result<Vec<[Point; 3]>> {
    let mut triangles = Vec::new();
    for group in group_shapes(rings) {
        let mut vertices: Vec<f64> = Vec::new();
        let mut hole_indices: Vec<usize> = Vec::new();
        let mut points: Vec<Point> = Vec::new();
        for (n, &ring) in std::iter::once(&group.outer).chain(&group.holes).enumerate() {
            if n > 0 {
                hole_indices.push(points.len());
            }
            for &p in &rings[ring] {
                vertices.extend([p.x, p.y]);
                points.push(p);
            }
        }
        let indices = earcutr::earcut(&vertices, &hole_indices, 2)
            .map_err(|e| Error::Triangulation(format!("{:?}", e)))?;
        for tri in indices.chunks_exact(3) {
            if tri.iter().all(|&i| i < points.len()) {
                triangles.push([points[tri[0]], points[tri[1]], points[tri[2]]]);
            }
        }
    }
    Ok(triangles)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composition {
    Add,
    Subtract,
}

/// Rectangle being dragged out in add/subtract mode.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDraft {
    pub composition: Composition,
    pub start: Point,
    pub current: Point,
    pub valid: bool,
}

impl ShapeDraft {
    pub fn new(composition: Composition, start: Point, surface: &Surface, ops: &dyn PolygonOps) -> Self {
        let mut draft = Self {
            composition,
            start,
            current: start,
            valid: true,
        };
        draft.valid = draft_is_valid(surface, &draft.ring(), ops);
        draft
    }

    pub fn update(&mut self, current: Point, surface: &Surface, ops: &dyn PolygonOps) {
        self.current = current;
        self.valid = draft_is_valid(surface, &self.ring(), ops);
    }

    pub fn ring(&self) -> Ring {
        crate::geometry::rect_ring(self.start, self.current)
    }

    /// Combine the rectangle into `surface`. Drafts flagged invalid, empty
    /// rectangles and results that fail validation are discarded.
    pub fn commit(&self, surface: &Surface, ops: &dyn PolygonOps) -> Option<Surface> {
        if !self.valid {
            debug!(composition = ?self.composition, "discarding draft outside the surface");
            return None;
        }
        let rect = self.ring();
        if signed_area(&rect).abs() <= MIN_SHAPE_AREA {
            return None;
        }
        let rings = match self.composition {
            Composition::Add => ops.union(&surface.rings, &[rect]),
            Composition::Subtract => ops.difference(&surface.rings, &[rect]),
        };
        commit(surface, rings, "compose")
    }
}

/// Cheap live signal while dragging: a draft is invalid only when the surface
/// is non-empty and none of the rectangle's corners lies inside it.
pub fn draft_is_valid(surface: &Surface, rect: &[Point], ops: &dyn PolygonOps) -> bool {
    if surface.is_empty() {
        return true;
    }
    rect.iter().any(|&p| ops.point_in_polygon(p, &surface.rings))
}

/// Result of feeding one click to a [`WallDraft`].
#[derive(Clone, Debug, PartialEq)]
pub enum DraftStep {
    Extended,
    Closed(Ring),
    Ignored,
}

/// Open polyline being drawn corner by corner in draw-walls mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WallDraft {
    pub points: Vec<Point>,
}

impl WallDraft {
    pub fn push(&mut self, p: Point, close_radius: f64) -> DraftStep {
        if let Some(&first) = self.points.first() {
            if self.points.len() >= 3 && distance(p, first) <= close_radius {
                let closing_crosses = self.segment_crosses(*self.points.last().unwrap_or(&first), first, true);
                if closing_crosses {
                    return DraftStep::Ignored;
                }
                return DraftStep::Closed(std::mem::take(&mut self.points));
            }
        }
        if let Some(&last) = self.points.last() {
            if coincident(p, last) || self.segment_crosses(last, p, false) {
                return DraftStep::Ignored;
            }
        }
        self.points.push(p);
        DraftStep::Extended
    }

    /// Does `a -> b` cross any drawn segment other than the ones it touches?
    fn segment_crosses(&self, a: Point, b: Point, closing: bool) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let (skip_first, skip_last) = if closing { (1, n - 2) } else { (0, n - 2) };
        (skip_first..skip_last).any(|i| {
            let (p, q) = (self.points[i], self.points[i + 1]);
            segments_intersect(a, b, p, q)
        })
    }
}

/// Union a finished draw-walls ring into the surface.
pub fn close_wall_draft(surface: &Surface, ring: Ring, ops: &dyn PolygonOps) -> Option<Surface> {
    if ring.len() < 3 || signed_area(&ring).abs() <= MIN_SHAPE_AREA || !rings_valid(&[ring.clone()])
    {
        debug!(corners = ring.len(), "discarding degenerate drawn ring");
        return None;
    }
    let rings = ops.union(&surface.rings, &[ring]);
    commit(surface, rings, "close_wall_draft")
}
