//! Tile pattern editor: per-tile rotate/resize/move with edge snapping, plus
//! the small set of pattern edits the side panel offers.
//!
//! Drags are computed from the [`TileDrag`] captured at pointer-down, never
//! from the previous move event, so rounding does not accumulate across the
//! events of one gesture.

use crate::geometry::{
    BoundingBox, interior_angle, min_enclosing_circle, point_in_ring, rotate_point, round_point,
};
use crate::model::{Pattern, Point, Rgba, Tile, TileKind, TileMetadata};
use std::f64::consts::TAU;

/// Edge distance (pattern px) under which a moved tile snaps.
pub const SNAP_THRESHOLD: f64 = 4.0;

/// Pointer deltas are scaled by this before resizing.
pub const DRAG_DAMPING: f64 = 0.25;

/// Tiles never shrink below this extent.
const MIN_TILE_EXTENT: f64 = 1.0;

/// Distance of the rotate handle above a tile's top edge.
const ROTATE_HANDLE_OFFSET: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeAxis {
    /// Vertical handle.
    Ns,
    /// Horizontal handle.
    Ew,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileAction {
    Rotate,
    Resize(ResizeAxis),
    Move,
}

/// Snapshot of a tile taken when a drag starts.
#[derive(Clone, Debug, PartialEq)]
pub struct TileDrag {
    pub tile_id: u64,
    pub action: TileAction,
    pub start_pointer: Point,
    pub start_points: Vec<Point>,
    pub start_metadata: TileMetadata,
}

impl TileDrag {
    pub fn begin(pattern: &Pattern, tile_id: u64, action: TileAction, pointer: Point) -> Option<Self> {
        let tile = pattern.tile(tile_id)?;
        Some(Self {
            tile_id,
            action,
            start_pointer: pointer,
            start_points: tile.points.clone(),
            start_metadata: tile.metadata,
        })
    }
}

/// Rounding precision for tile coordinates.
pub fn working_precision(pattern: &Pattern) -> f64 {
    pattern.scale * 1000.0
}

/// Apply one pointer move of `drag` to `pattern`.
pub fn drag_tile(pattern: &Pattern, drag: &TileDrag, pointer: Point) -> Option<Pattern> {
    let index = pattern.tile_index(drag.tile_id)?;
    let precision = working_precision(pattern);
    let (points, metadata) = match drag.action {
        TileAction::Rotate => rotate(drag, pointer, precision),
        TileAction::Resize(axis) => {
            let kind = pattern.tiles[index].kind;
            let points = if kind == TileKind::Rectangle {
                resize_rectangle(drag, axis, pointer, precision)?
            } else {
                scale_uniform(drag, axis, pointer, precision)?
            };
            (points, drag.start_metadata)
        }
        TileAction::Move => translate(pattern, drag, pointer, precision),
    };
    let mut next = pattern.clone();
    let tile = &mut next.tiles[index];
    tile.points = points;
    tile.metadata = metadata;
    Some(next)
}

fn rotate(drag: &TileDrag, pointer: Point, precision: f64) -> (Vec<Point>, TileMetadata) {
    let center = drag.start_metadata.center();
    let increment = interior_angle(pointer, center, drag.start_pointer);
    let points = drag
        .start_points
        .iter()
        .map(|&p| round_point(rotate_point(p, center, increment), precision))
        .collect();
    let metadata = TileMetadata {
        angle: (drag.start_metadata.angle + increment).rem_euclid(360.0),
        ..drag.start_metadata
    };
    (points, metadata)
}

/// `v` expressed in the tile's unrotated frame.
fn to_local(v: Point, angle: f64) -> Point {
    rotate_point(v, Point::ZERO, -angle)
}

fn from_local(v: Point, angle: f64) -> Point {
    rotate_point(v, Point::ZERO, angle)
}

fn local_extent(points: &[Point], center: Point, angle: f64) -> Option<BoundingBox> {
    let local: Vec<Point> = points.iter().map(|&p| to_local(p - center, angle)).collect();
    BoundingBox::from_points(&local)
}

/// Rectangles grow or shrink symmetrically: both edges across the handle's
/// axis move by half the damped pointer delta.
fn resize_rectangle(
    drag: &TileDrag,
    axis: ResizeAxis,
    pointer: Point,
    precision: f64,
) -> Option<Vec<Point>> {
    let center = drag.start_metadata.center();
    let angle = drag.start_metadata.angle;
    let delta = to_local(pointer - drag.start_pointer, angle);
    let along = match axis {
        ResizeAxis::Ns => delta.y,
        ResizeAxis::Ew => delta.x,
    } * DRAG_DAMPING;
    let half = along * 0.5;

    let extent = local_extent(&drag.start_points, center, angle)?;
    let current = match axis {
        ResizeAxis::Ns => extent.height(),
        ResizeAxis::Ew => extent.width(),
    };
    if current + along < MIN_TILE_EXTENT {
        return None;
    }

    let points = drag
        .start_points
        .iter()
        .map(|&p| {
            let mut l = to_local(p - center, angle);
            match axis {
                ResizeAxis::Ns => l.y += if l.y < 0.0 { -half } else { half },
                ResizeAxis::Ew => l.x += if l.x < 0.0 { -half } else { half },
            }
            round_point(center + from_local(l, angle), precision)
        })
        .collect();
    Some(points)
}

/// Other shapes scale uniformly about the pivot by the damped ratio of the
/// pointer's current to initial distance along the handle's axis.
fn scale_uniform(
    drag: &TileDrag,
    axis: ResizeAxis,
    pointer: Point,
    precision: f64,
) -> Option<Vec<Point>> {
    let center = drag.start_metadata.center();
    let angle = drag.start_metadata.angle;
    let initial = to_local(drag.start_pointer - center, angle);
    let current = to_local(pointer - center, angle);
    let (initial, current) = match axis {
        ResizeAxis::Ns => (initial.y.abs(), current.y.abs()),
        ResizeAxis::Ew => (initial.x.abs(), current.x.abs()),
    };
    let factor = if initial == 0.0 {
        1.0
    } else {
        1.0 + (current / initial - 1.0) * DRAG_DAMPING
    };

    let extent = local_extent(&drag.start_points, center, angle)?;
    if extent.width().min(extent.height()) * factor < MIN_TILE_EXTENT {
        return None;
    }
    Some(
        drag.start_points
            .iter()
            .map(|&p| round_point(center + (p - center) * factor, precision))
            .collect(),
    )
}

fn translate(
    pattern: &Pattern,
    drag: &TileDrag,
    pointer: Point,
    precision: f64,
) -> (Vec<Point>, TileMetadata) {
    let mut delta = pointer - drag.start_pointer;
    let moved: Vec<Point> = drag.start_points.iter().map(|&p| p + delta).collect();
    if let Some(bounds) = BoundingBox::from_points(&moved) {
        let others = pattern
            .tiles
            .iter()
            .filter(|t| t.id != drag.tile_id)
            .filter_map(|t| BoundingBox::from_points(&t.points));
        let border = BoundingBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: pattern.width,
            max_y: pattern.height,
        };
        let (dx, dy) = snap_offsets(&bounds, others, &border);
        delta.x += dx.unwrap_or(0.0);
        delta.y += dy.unwrap_or(0.0);
    }
    let points = drag
        .start_points
        .iter()
        .map(|&p| round_point(p + delta, precision))
        .collect();
    let start = drag.start_metadata;
    let metadata = TileMetadata {
        center_x: start.center_x + delta.x,
        center_y: start.center_y + delta.y,
        ..start
    };
    (points, metadata)
}

/// First edge pair within [`SNAP_THRESHOLD`], as the offset that aligns it.
fn first_snap(pairs: [(f64, f64); 4]) -> Option<f64> {
    pairs
        .into_iter()
        .map(|(moving, target)| target - moving)
        .find(|d| d.abs() <= SNAP_THRESHOLD)
}

fn axis_pairs(moving: (f64, f64), target: (f64, f64)) -> [(f64, f64); 4] {
    let (lo, hi) = moving;
    let (target_lo, target_hi) = target;
    [(lo, target_hi), (hi, target_lo), (lo, target_lo), (hi, target_hi)]
}

/// Snap offsets per axis: other tiles first, in pattern order, then the
/// pattern border for any axis still unsnapped.
fn snap_offsets(
    moving: &BoundingBox,
    others: impl Iterator<Item = BoundingBox>,
    border: &BoundingBox,
) -> (Option<f64>, Option<f64>) {
    let xs = (moving.min_x, moving.max_x);
    let ys = (moving.min_y, moving.max_y);
    let mut dx = None;
    let mut dy = None;
    for other in others {
        if dx.is_none() {
            dx = first_snap(axis_pairs(xs, (other.min_x, other.max_x)));
        }
        if dy.is_none() {
            dy = first_snap(axis_pairs(ys, (other.min_y, other.max_y)));
        }
        if dx.is_some() && dy.is_some() {
            break;
        }
    }
    if dx.is_none() {
        dx = first_snap(axis_pairs(xs, (border.min_x, border.max_x)));
    }
    if dy.is_none() {
        dy = first_snap(axis_pairs(ys, (border.min_y, border.max_y)));
    }
    (dx, dy)
}

/// Where a tile's control handles sit, in pattern space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileHandles {
    pub rotate: Point,
    pub resize_ns: Point,
    pub resize_ew: Point,
}

pub fn tile_handles(tile: &Tile) -> Option<TileHandles> {
    let center = tile.metadata.center();
    let angle = tile.metadata.angle;
    let extent = local_extent(&tile.points, center, angle)?;
    let place = |local: Point| center + from_local(local, angle);
    Some(TileHandles {
        rotate: place(Point::new(0.0, extent.min_y - ROTATE_HANDLE_OFFSET)),
        resize_ns: place(Point::new(0.0, extent.max_y)),
        resize_ew: place(Point::new(extent.max_x, 0.0)),
    })
}

/// Topmost tile handle or tile body under `p`.
pub fn hit_tile(pattern: &Pattern, p: Point, radius: f64) -> Option<(u64, TileAction)> {
    for tile in pattern.tiles.iter().rev() {
        let Some(h) = tile_handles(tile) else {
            continue;
        };
        let near = |q: Point| (q - p).length() <= radius;
        if near(h.rotate) {
            return Some((tile.id, TileAction::Rotate));
        }
        if near(h.resize_ns) {
            return Some((tile.id, TileAction::Resize(ResizeAxis::Ns)));
        }
        if near(h.resize_ew) {
            return Some((tile.id, TileAction::Resize(ResizeAxis::Ew)));
        }
    }
    pattern
        .tiles
        .iter()
        .rev()
        .find(|t| point_in_ring(p, &t.points))
        .map(|t| (t.id, TileAction::Move))
}

/// A tile whose pivot is the centre of its minimum enclosing circle.
pub fn new_tile(id: u64, kind: TileKind, points: Vec<Point>, color: Rgba) -> Tile {
    let pivot = min_enclosing_circle(&points).center;
    Tile::new(id, kind, points, color, pivot)
}

pub fn rectangle_tile(id: u64, x: f64, y: f64, width: f64, height: f64, color: Rgba) -> Tile {
    let points = vec![
        Point::new(x, y),
        Point::new(x + width, y),
        Point::new(x + width, y + height),
        Point::new(x, y + height),
    ];
    new_tile(id, TileKind::Rectangle, points, color)
}

/// Regular polygon with its first corner straight above `center`.
pub fn regular_tile(id: u64, kind: TileKind, center: Point, radius: f64, color: Rgba) -> Tile {
    let sides = kind.sides();
    let points = (0..sides)
        .map(|i| {
            let t = (i as f64) / (sides as f64) * TAU - TAU / 4.0;
            Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
        })
        .collect();
    new_tile(id, kind, points, color)
}

/// 2×2 grid of edge-to-edge square tiles; the gap comes from the outline
/// the rasterizer strokes around each tile.
pub fn default_pattern() -> Pattern {
    let size = 200.0;
    let gap = 4.0;
    let colors = [
        Rgba::rgb(214, 196, 170),
        Rgba::rgb(190, 170, 142),
        Rgba::rgb(190, 170, 142),
        Rgba::rgb(214, 196, 170),
    ];
    let tiles = (0..4)
        .map(|i| {
            let (col, row) = ((i % 2) as f64, (i / 2) as f64);
            rectangle_tile(i as u64 + 1, col * size, row * size, size, size, colors[i])
        })
        .collect();
    Pattern {
        width: size * 2.0,
        height: size * 2.0,
        x: 0.0,
        y: 0.0,
        tiles_gap: gap,
        scale: 0.1,
        gap_color: Rgba::rgb(120, 120, 120),
        tiles,
    }
}

/// Append a tile of `kind` in the middle of the pattern.
pub fn add_tile(pattern: &Pattern, kind: TileKind, color: Rgba) -> Pattern {
    let id = pattern.next_tile_id();
    let center = Point::new(pattern.width * 0.5, pattern.height * 0.5);
    let size = pattern.width.min(pattern.height) * 0.25;
    let tile = match kind {
        TileKind::Rectangle => rectangle_tile(
            id,
            center.x - size * 0.5,
            center.y - size * 0.5,
            size,
            size,
            color,
        ),
        _ => regular_tile(id, kind, center, size * 0.5, color),
    };
    let mut next = pattern.clone();
    next.tiles.push(tile);
    next
}

fn edit_tile(pattern: &Pattern, id: u64, f: impl FnOnce(&mut Tile)) -> Option<Pattern> {
    let index = pattern.tile_index(id)?;
    let mut next = pattern.clone();
    f(&mut next.tiles[index]);
    Some(next)
}

pub fn remove_tile(pattern: &Pattern, id: u64) -> Option<Pattern> {
    let index = pattern.tile_index(id)?;
    let mut next = pattern.clone();
    next.tiles.remove(index);
    Some(next)
}

pub fn recolor_tile(pattern: &Pattern, id: u64, color: Rgba) -> Option<Pattern> {
    edit_tile(pattern, id, |t| t.color = color)
}

pub fn set_tile_texture(pattern: &Pattern, id: u64, texture_ref: Option<String>) -> Option<Pattern> {
    edit_tile(pattern, id, |t| t.texture_ref = texture_ref)
}

pub fn resize_pattern(pattern: &Pattern, width: f64, height: f64) -> Option<Pattern> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    Some(Pattern {
        width,
        height,
        ..pattern.clone()
    })
}

pub fn set_tiles_gap(pattern: &Pattern, gap: f64) -> Pattern {
    Pattern {
        tiles_gap: gap.max(0.0),
        ..pattern.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pattern_with(tiles: Vec<Tile>) -> Pattern {
        Pattern {
            width: 800.0,
            height: 400.0,
            tiles,
            ..default_pattern()
        }
    }

    fn gray() -> Rgba {
        Rgba::rgb(128, 128, 128)
    }

    #[test]
    fn move_snaps_right_edge_to_neighbour() {
        let pattern = pattern_with(vec![
            rectangle_tile(1, 286.0, 100.0, 100.0, 100.0, gray()),
            rectangle_tile(2, 400.0, 100.0, 100.0, 100.0, gray()),
        ]);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Move, Point::new(300.0, 150.0)).unwrap();
        let moved = drag_tile(&pattern, &drag, Point::new(310.0, 150.0)).unwrap();
        let bb = BoundingBox::from_points(&moved.tiles[0].points).unwrap();
        assert_eq!(bb.max_x, 400.0);
        assert_eq!(bb.min_x, 300.0);
        assert_eq!(moved.tiles[0].metadata.center_x, 350.0);
        // neighbour untouched
        assert_eq!(moved.tiles[1], pattern.tiles[1]);
    }

    #[test]
    fn move_without_neighbours_snaps_to_border() {
        let pattern = pattern_with(vec![rectangle_tile(1, 100.0, 100.0, 50.0, 50.0, gray())]);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Move, Point::ZERO).unwrap();
        let moved = drag_tile(&pattern, &drag, Point::new(-97.0, 40.0)).unwrap();
        let bb = BoundingBox::from_points(&moved.tiles[0].points).unwrap();
        assert_eq!(bb.min_x, 0.0);
        assert_eq!(bb.min_y, 140.0);
    }

    #[test]
    fn move_beyond_threshold_is_free() {
        let pattern = pattern_with(vec![
            rectangle_tile(1, 280.0, 100.0, 100.0, 100.0, gray()),
            rectangle_tile(2, 400.0, 300.0, 100.0, 50.0, gray()),
        ]);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Move, Point::ZERO).unwrap();
        let moved = drag_tile(&pattern, &drag, Point::new(10.0, 7.0)).unwrap();
        let bb = BoundingBox::from_points(&moved.tiles[0].points).unwrap();
        assert_eq!((bb.max_x, bb.min_y), (390.0, 107.0));
    }

    #[test]
    fn rotate_quarter_turn_about_pivot() {
        let pattern = pattern_with(vec![rectangle_tile(1, 0.0, 0.0, 100.0, 100.0, gray())]);
        let pivot = pattern.tiles[0].metadata.center();
        assert_abs_diff_eq!(pivot.x, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pivot.y, 50.0, epsilon = 1e-9);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Rotate, Point::new(150.0, 50.0)).unwrap();
        let rotated = drag_tile(&pattern, &drag, Point::new(50.0, 150.0)).unwrap();
        let t = &rotated.tiles[0];
        assert_abs_diff_eq!(t.metadata.angle, 90.0, epsilon = 1e-9);
        assert_eq!(t.points[0], Point::new(100.0, 0.0));
        assert_eq!(t.metadata.center(), pivot);

        // three more quarter turns wrap the angle
        let drag = TileDrag::begin(&rotated, 1, TileAction::Rotate, Point::new(150.0, 50.0)).unwrap();
        let full = drag_tile(&rotated, &drag, Point::new(50.0, -50.0)).unwrap();
        assert_abs_diff_eq!(full.tiles[0].metadata.angle, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn rectangle_resize_moves_both_edges() {
        let pattern = pattern_with(vec![rectangle_tile(1, 0.0, 0.0, 100.0, 100.0, gray())]);
        let drag = TileDrag::begin(
            &pattern,
            1,
            TileAction::Resize(ResizeAxis::Ns),
            Point::new(50.0, 100.0),
        )
        .unwrap();
        let resized = drag_tile(&pattern, &drag, Point::new(80.0, 140.0)).unwrap();
        let bb = BoundingBox::from_points(&resized.tiles[0].points).unwrap();
        // 40px * 0.25 = 10px taller, split across both edges
        assert_eq!((bb.min_y, bb.max_y), (-5.0, 105.0));
        assert_eq!((bb.min_x, bb.max_x), (0.0, 100.0));
        assert_eq!(resized.tiles[0].metadata, pattern.tiles[0].metadata);
    }

    #[test]
    fn rectangle_resize_refuses_to_collapse() {
        let pattern = pattern_with(vec![rectangle_tile(1, 0.0, 0.0, 10.0, 10.0, gray())]);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Resize(ResizeAxis::Ew), Point::ZERO).unwrap();
        assert!(drag_tile(&pattern, &drag, Point::new(-200.0, 0.0)).is_none());
    }

    #[test]
    fn polygon_resize_scales_about_pivot() {
        let hex = regular_tile(1, TileKind::Hexagon, Point::new(100.0, 100.0), 50.0, gray());
        let pattern = pattern_with(vec![hex]);
        let drag = TileDrag::begin(
            &pattern,
            1,
            TileAction::Resize(ResizeAxis::Ew),
            Point::new(150.0, 100.0),
        )
        .unwrap();
        // pointer distance doubles -> damped factor 1.25
        let grown = drag_tile(&pattern, &drag, Point::new(200.0, 100.0)).unwrap();
        let c = min_enclosing_circle(&grown.tiles[0].points);
        assert_abs_diff_eq!(c.radius, 62.5, epsilon = 0.02);
        assert_abs_diff_eq!(c.center.x, 100.0, epsilon = 0.02);
    }

    #[test]
    fn polygon_resize_from_pivot_keeps_scale() {
        let tri = regular_tile(1, TileKind::Triangle, Point::new(100.0, 100.0), 30.0, gray());
        let pattern = pattern_with(vec![tri.clone()]);
        let pivot = tri.metadata.center();
        let drag = TileDrag::begin(&pattern, 1, TileAction::Resize(ResizeAxis::Ns), pivot).unwrap();
        let out = drag_tile(&pattern, &drag, Point::new(100.0, 300.0)).unwrap();
        for (a, b) in out.tiles[0].points.iter().zip(&tri.points) {
            assert_abs_diff_eq!(a.x, b.x, epsilon = 0.01);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 0.01);
        }
    }

    #[test]
    fn pivot_comes_from_enclosing_circle_and_survives_rotation() {
        let tri = new_tile(
            1,
            TileKind::Triangle,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.66)],
            gray(),
        );
        assert_abs_diff_eq!(tri.metadata.center_y, 2.887, epsilon = 1e-3);
        let pattern = pattern_with(vec![tri.clone()]);
        let drag = TileDrag::begin(&pattern, 1, TileAction::Rotate, Point::new(20.0, 2.887)).unwrap();
        let out = drag_tile(&pattern, &drag, Point::new(5.0, 20.0)).unwrap();
        assert_eq!(out.tiles[0].metadata.center(), tri.metadata.center());
    }

    #[test]
    fn handles_and_hit_testing() {
        let pattern = pattern_with(vec![rectangle_tile(1, 0.0, 0.0, 100.0, 60.0, gray())]);
        let h = tile_handles(&pattern.tiles[0]).unwrap();
        assert_eq!(h.resize_ns, Point::new(50.0, 60.0));
        assert_eq!(h.resize_ew, Point::new(100.0, 30.0));
        assert_eq!(h.rotate, Point::new(50.0, -16.0));
        assert_eq!(
            hit_tile(&pattern, Point::new(101.0, 31.0), 5.0),
            Some((1, TileAction::Resize(ResizeAxis::Ew)))
        );
        assert_eq!(hit_tile(&pattern, Point::new(20.0, 20.0), 5.0), Some((1, TileAction::Move)));
        assert_eq!(hit_tile(&pattern, Point::new(300.0, 300.0), 5.0), None);
    }

    #[test]
    fn pattern_management() {
        let base = default_pattern();
        assert_eq!(base.tiles.len(), 4);
        let added = add_tile(&base, TileKind::Octagon, gray());
        assert_eq!(added.tiles.len(), 5);
        assert_eq!(added.tiles[4].id, 5);
        assert_eq!(added.tiles[4].points.len(), 8);
        let removed = remove_tile(&added, 2).unwrap();
        assert!(removed.tile(2).is_none());
        assert!(remove_tile(&base, 99).is_none());
        let textured = set_tile_texture(&base, 1, Some("oak".into())).unwrap();
        assert_eq!(textured.tiles[0].texture_ref.as_deref(), Some("oak"));
        assert!(resize_pattern(&base, 0.0, 10.0).is_none());
        assert_eq!(set_tiles_gap(&base, -3.0).tiles_gap, 0.0);
    }
}
