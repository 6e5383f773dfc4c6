//! Geometry primitives shared by the surface and tile editors.

use crate::model::{Point, Ring};
use std::f64::consts::TAU;

/// Dot-product tolerance (pixel squared) under which a corner counts as a
/// right angle.
pub const RIGHT_ANGLE_TOLERANCE: f64 = 10.0;

/// Relative slack for the minimum enclosing circle containment test.
const MEC_EPSILON: f64 = 1e-9;

/// Cross-product magnitude treated as collinear in orientation tests.
const ORIENTATION_EPSILON: f64 = 1e-9;

pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).length()
}

pub fn next_index(i: usize, len: usize) -> usize {
    (i + 1) % len
}

pub fn prev_index(i: usize, len: usize) -> usize {
    (i + len - 1) % len
}

/// Interior angle at `pt` in degrees, in `[0, 360)`, assuming the ring runs
/// counter-clockwise through `prev -> pt -> next`.
pub fn interior_angle(prev: Point, pt: Point, next: Point) -> f64 {
    let to_prev = (prev.y - pt.y).atan2(prev.x - pt.x);
    let to_next = (next.y - pt.y).atan2(next.x - pt.x);
    (to_prev - to_next).rem_euclid(TAU).to_degrees()
}

/// `true` when the vectors from `corner` to its two neighbours are
/// perpendicular within [`RIGHT_ANGLE_TOLERANCE`].
pub fn is_right_angle(prev: Point, corner: Point, next: Point) -> bool {
    (prev - corner).dot(next - corner).abs() < RIGHT_ANGLE_TOLERANCE
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut bb = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in it {
            bb.min_x = bb.min_x.min(p.x);
            bb.min_y = bb.min_y.min(p.y);
            bb.max_x = bb.max_x.max(p.x);
            bb.max_y = bb.max_y.max(p.y);
        }
        Some(bb)
    }

    pub fn from_rings(rings: &[Ring]) -> Option<Self> {
        Self::from_points(rings.iter().flatten())
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    fn around(center: Point) -> Self {
        Self {
            center,
            radius: 0.0,
        }
    }

    fn from_diameter(a: Point, b: Point) -> Self {
        Self {
            center: (a + b) * 0.5,
            radius: distance(a, b) * 0.5,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        distance(p, self.center) <= self.radius * (1.0 + MEC_EPSILON) + MEC_EPSILON
    }
}

/// Circle through three points. Collinear input (determinant within
/// `f64::EPSILON` of zero) falls back to the circle spanning the two points
/// farthest apart.
pub fn circumcircle(a: Point, b: Point, c: Point) -> Circle {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() <= f64::EPSILON {
        let pairs = [(a, b), (b, c), (a, c)];
        let (p, q) = pairs
            .into_iter()
            .max_by(|l, r| distance(l.0, l.1).total_cmp(&distance(r.0, r.1)))
            .unwrap_or((a, b));
        return Circle::from_diameter(p, q);
    }
    let a2 = a.dot(a);
    let b2 = b.dot(b);
    let c2 = c.dot(c);
    let center = Point::new(
        (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
        (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
    );
    Circle {
        center,
        radius: distance(center, a),
    }
}

/// Pivot circle for a newly created tile.
///
/// Three points use the exact circumcircle; four or more go through the
/// randomised incremental sweep, whose result always contains every input
/// point but depends on the visiting order when several circles tie.
pub fn min_enclosing_circle(points: &[Point]) -> Circle {
    match points {
        [] => Circle::around(Point::ZERO),
        [p] => Circle::around(*p),
        [a, b] => Circle::from_diameter(*a, *b),
        [a, b, c] => circumcircle(*a, *b, *c),
        _ => {
            let mut pts = points.to_vec();
            Shuffler::seeded(pts.len() as u64).shuffle(&mut pts);
            incremental_circle(&pts)
        }
    }
}

fn incremental_circle(pts: &[Point]) -> Circle {
    let mut circle = Circle::around(pts[0]);
    for i in 1..pts.len() {
        if circle.contains(pts[i]) {
            continue;
        }
        circle = Circle::around(pts[i]);
        for j in 0..i {
            if circle.contains(pts[j]) {
                continue;
            }
            circle = Circle::from_diameter(pts[i], pts[j]);
            for k in 0..j {
                if !circle.contains(pts[k]) {
                    circle = circumcircle(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle
}

/// Small xorshift generator; only used to randomise visiting order.
struct Shuffler(u64);

impl Shuffler {
    fn seeded(seed: u64) -> Self {
        Self(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() % (i as u64 + 1)) as usize;
            items.swap(i, j);
        }
    }
}

fn orientation(a: Point, b: Point, c: Point) -> i8 {
    let val = (b.y - a.y) * (c.x - b.x) - (b.x - a.x) * (c.y - b.y);
    if val.abs() < ORIENTATION_EPSILON {
        0
    } else if val > 0.0 {
        1
    } else {
        -1
    }
}

fn on_segment(p: Point, q: Point, r: Point) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Proper or collinear-overlapping intersection of segments `p1-p2` and
/// `q1-q2`.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if o1 != o2 && o3 != o4 {
        return true;
    }
    (o1 == 0 && on_segment(p1, q1, p2))
        || (o2 == 0 && on_segment(p1, q2, p2))
        || (o3 == 0 && on_segment(q1, p1, q2))
        || (o4 == 0 && on_segment(q1, p2, q2))
}

fn share_endpoint(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    a1 == b1 || a1 == b2 || a2 == b1 || a2 == b2
}

/// O(n²) test over all non-adjacent edge pairs of a closed ring.
pub fn ring_self_intersects(ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let (a1, a2) = (ring[i], ring[next_index(i, n)]);
        for j in (i + 1)..n {
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (ring[j], ring[next_index(j, n)]);
            if share_endpoint(a1, a2, b1, b2) {
                continue;
            }
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// `true` when any edge of `a` crosses any edge of `b`.
pub fn rings_cross(a: &[Point], b: &[Point]) -> bool {
    let (n, m) = (a.len(), b.len());
    for i in 0..n {
        let (a1, a2) = (a[i], a[next_index(i, n)]);
        for j in 0..m {
            let (b1, b2) = (b[j], b[next_index(j, m)]);
            if share_endpoint(a1, a2, b1, b2) {
                continue;
            }
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// The commit gate for surface candidates.
pub fn rings_valid(rings: &[Ring]) -> bool {
    if rings.iter().any(|r| r.len() < 3 || ring_self_intersects(r)) {
        return false;
    }
    for (i, a) in rings.iter().enumerate() {
        for b in &rings[i + 1..] {
            if rings_cross(a, b) {
                return false;
            }
        }
    }
    true
}

/// Shoelace area; positive for counter-clockwise in a y-up frame.
pub fn signed_area(ring: &[Point]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = next_index(i, n);
        area += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    area * 0.5
}

/// Even-odd ray cast against a single ring.
pub fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn rotate_point(p: Point, center: Point, degrees: f64) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let v = p - center;
    Point::new(
        center.x + v.x * cos - v.y * sin,
        center.y + v.x * sin + v.y * cos,
    )
}

/// Round to `1 / precision`. Non-positive precision leaves the value alone.
pub fn round_to(value: f64, precision: f64) -> f64 {
    if precision <= 0.0 || !precision.is_finite() {
        return value;
    }
    (value * precision).round() / precision
}

pub fn round_point(p: Point, precision: f64) -> Point {
    Point::new(round_to(p.x, precision), round_to(p.y, precision))
}

/// Axis-aligned ring spanned by a drag from `start` to `current`, in the
/// order start, same-row corner, current, same-column corner.
pub fn rect_ring(start: Point, current: Point) -> Ring {
    vec![
        start,
        Point::new(current.x, start.y),
        current,
        Point::new(start.x, current.y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ring(coords: &[[f64; 2]]) -> Ring {
        coords.iter().map(|&c| Point::from(c)).collect()
    }

    #[test]
    fn bowtie_self_intersects_square_does_not() {
        let bowtie = ring(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]);
        let square = ring(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        assert!(ring_self_intersects(&bowtie));
        assert!(!ring_self_intersects(&square));

        let mut reversed = bowtie.clone();
        reversed.reverse();
        assert!(ring_self_intersects(&reversed));
        let mut reversed = square.clone();
        reversed.reverse();
        assert!(!ring_self_intersects(&reversed));
    }

    #[test]
    fn concave_ring_is_simple() {
        let l_shape = ring(&[
            [0.0, 0.0],
            [20.0, 0.0],
            [20.0, 10.0],
            [10.0, 10.0],
            [10.0, 20.0],
            [0.0, 20.0],
        ]);
        assert!(!ring_self_intersects(&l_shape));
    }

    #[test]
    fn right_angle_uses_dot_tolerance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(is_right_angle(a, b, Point::new(10.0, 10.0)));
        // dot = -9, inside the tolerance
        assert!(is_right_angle(a, b, Point::new(10.9, 10.0)));
        // dot = -10, on the boundary and rejected
        assert!(!is_right_angle(a, b, Point::new(11.0, 9.0)));
        assert!(!is_right_angle(a, b, Point::new(20.0, 5.0)));
        // (0,0),(10,0),(10,9) is a right angle at (10,0) under the
        // corner-to-neighbour convention, dot = 0
        assert!(is_right_angle(a, b, Point::new(10.0, 9.0)));
    }

    #[test]
    fn interior_angle_reports_reflex_corners() {
        let prev = Point::new(0.0, 10.0);
        let pt = Point::new(0.0, 0.0);
        let next = Point::new(10.0, 0.0);
        assert_abs_diff_eq!(interior_angle(prev, pt, next), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(interior_angle(next, pt, prev), 270.0, epsilon = 1e-9);
        let straight = Point::new(-10.0, 0.0);
        assert_abs_diff_eq!(interior_angle(straight, pt, next), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn circumcircle_of_equilateral_triangle() {
        let pts = ring(&[[0.0, 0.0], [10.0, 0.0], [5.0, 8.66]]);
        let c = min_enclosing_circle(&pts);
        assert_abs_diff_eq!(c.center.x, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c.center.y, 2.887, epsilon = 1e-3);
        assert_abs_diff_eq!(c.radius, 5.7735, epsilon = 1e-3);
        for p in &pts {
            assert!(distance(*p, c.center) <= c.radius + 1e-9);
        }
    }

    #[test]
    fn collinear_triple_falls_back_to_extremes() {
        let c = circumcircle(
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(c.center, Point::new(5.0, 0.0));
        assert_abs_diff_eq!(c.radius, 5.0);
    }

    #[test]
    fn incremental_circle_contains_all_points() {
        let square = ring(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]);
        let c = min_enclosing_circle(&square);
        assert_abs_diff_eq!(c.center.x, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c.center.y, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(c.radius, 50f64.sqrt(), epsilon = 1e-9);

        let cloud = ring(&[
            [3.0, 1.0],
            [-4.0, 2.5],
            [0.5, -6.0],
            [7.0, 7.0],
            [1.0, 1.0],
            [-2.0, -2.0],
            [6.5, -3.0],
        ]);
        let c = min_enclosing_circle(&cloud);
        for p in &cloud {
            assert!(c.contains(*p), "{p:?} outside {c:?}");
        }
    }

    #[test]
    fn segment_intersection_handles_collinear_overlap() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(segments_intersect(a, b, Point::new(5.0, 0.0), Point::new(15.0, 0.0)));
        assert!(!segments_intersect(a, b, Point::new(11.0, 0.0), Point::new(15.0, 0.0)));
        assert!(segments_intersect(a, b, Point::new(5.0, -5.0), Point::new(5.0, 5.0)));
        assert!(!segments_intersect(a, b, Point::new(5.0, 1.0), Point::new(5.0, 5.0)));
    }

    #[test]
    fn nested_rings_are_valid_crossing_rings_are_not() {
        let outer = ring(&[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]]);
        let hole = ring(&[[40.0, 40.0], [60.0, 40.0], [60.0, 60.0], [40.0, 60.0]]);
        let crossing = ring(&[[90.0, 40.0], [120.0, 40.0], [120.0, 60.0], [90.0, 60.0]]);
        assert!(rings_valid(&[outer.clone(), hole]));
        assert!(!rings_valid(&[outer, crossing]));
    }

    #[test]
    fn rotation_and_rounding() {
        let p = rotate_point(Point::new(10.0, 0.0), Point::ZERO, 90.0);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-12);
        assert_eq!(round_to(1.23456, 100.0), 1.23);
        assert_eq!(round_to(1.23456, 0.0), 1.23456);
    }

    #[test]
    fn bounding_box_and_area() {
        let r = rect_ring(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        assert_eq!(
            r,
            ring(&[[0.0, 0.0], [200.0, 0.0], [200.0, 100.0], [0.0, 100.0]])
        );
        let bb = BoundingBox::from_points(&r).unwrap();
        assert_eq!((bb.width(), bb.height()), (200.0, 100.0));
        assert_abs_diff_eq!(signed_area(&r).abs(), 20_000.0);
        assert!(point_in_ring(Point::new(50.0, 50.0), &r));
        assert!(!point_in_ring(Point::new(250.0, 50.0), &r));
    }
}
