//! Polygon boolean operations.
//!
//! The constraint engine only talks to [`PolygonOps`]; [`OverlayOps`] backs
//! it with the `i_overlay` crate. Inputs are never mutated and empty operands
//! short-circuit so that `union(a, []) == a` holds exactly.

use crate::geometry::{BoundingBox, point_in_ring, signed_area};
use crate::model::{Point, Ring};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

/// Minimum area threshold - contours smaller than this are dropped from
/// boolean results.
const MIN_AREA_THRESHOLD: f64 = 1e-10;

pub trait PolygonOps {
    fn union(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring>;

    fn difference(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring>;

    fn intersection(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring>;

    /// Even-odd containment over all rings.
    fn point_in_polygon(&self, p: Point, rings: &[Ring]) -> bool {
        rings.iter().filter(|r| point_in_ring(p, r)).count() % 2 == 1
    }

    /// Net even-odd area: rings nested an odd number of times count as holes.
    fn area(&self, rings: &[Ring]) -> f64 {
        let mut total = 0.0;
        for (i, ring) in rings.iter().enumerate() {
            let Some(&sample) = ring.first() else {
                continue;
            };
            let depth = rings
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && point_in_ring(sample, other))
                .count();
            let a = signed_area(ring).abs();
            total += if depth % 2 == 0 { a } else { -a };
        }
        total.max(0.0)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayOps;

impl OverlayOps {
    fn overlay(&self, a: &[Ring], b: &[Ring], rule: OverlayRule) -> Vec<Ring> {
        let subject = rings_to_paths(a);
        let clip = rings_to_paths(b);
        // Result is Vec<Vec<Vec<[f64; 2]>>> - shapes, each a list of contours
        let result = subject.overlay(&clip, rule, FillRule::EvenOdd);
        shapes_to_rings(result)
    }
}

impl PolygonOps for OverlayOps {
    fn union(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring> {
        let a = usable(a);
        let b = usable(b);
        if b.is_empty() {
            return a;
        }
        if a.is_empty() {
            return b;
        }
        self.overlay(&a, &b, OverlayRule::Union)
    }

    fn difference(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring> {
        let a = usable(a);
        let b = usable(b);
        if a.is_empty() || b.is_empty() || !bounds_overlap(&a, &b) {
            return a;
        }
        self.overlay(&a, &b, OverlayRule::Difference)
    }

    fn intersection(&self, a: &[Ring], b: &[Ring]) -> Vec<Ring> {
        let a = usable(a);
        let b = usable(b);
        if a.is_empty() || b.is_empty() || !bounds_overlap(&a, &b) {
            return Vec::new();
        }
        self.overlay(&a, &b, OverlayRule::Intersect)
    }
}

fn usable(rings: &[Ring]) -> Vec<Ring> {
    rings.iter().filter(|r| r.len() >= 3).cloned().collect()
}

fn bounds_overlap(a: &[Ring], b: &[Ring]) -> bool {
    match (BoundingBox::from_rings(a), BoundingBox::from_rings(b)) {
        (Some(ba), Some(bb)) => ba.overlaps(&bb),
        _ => false,
    }
}

fn rings_to_paths(rings: &[Ring]) -> Vec<Vec<[f64; 2]>> {
    rings
        .iter()
        .map(|r| r.iter().map(|&p| <[f64; 2]>::from(p)).collect())
        .collect()
}

fn shapes_to_rings(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Vec<Ring> {
    let mut rings = Vec::new();
    for shape in shapes {
        for contour in shape {
            let ring: Ring = contour.into_iter().map(Point::from).collect();
            if ring.len() >= 3 && signed_area(&ring).abs() > MIN_AREA_THRESHOLD {
                rings.push(ring);
            }
        }
    }
    rings
}
