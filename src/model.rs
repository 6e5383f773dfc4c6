use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, Mul, Sub};

/// A position in the shared pixel-space coordinate system.
///
/// Serialised as `[x, y]` so persisted rings read like `[[0,0],[200,0],...]`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_pos2(p: egui::Pos2) -> Self {
        Self {
            x: p.x as f64,
            y: p.y as f64,
        }
    }

    pub fn to_pos2(self) -> egui::Pos2 {
        egui::pos2(self.x as f32, self.y as f32)
    }

    pub fn dot(self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// One closed vertex loop. The closing edge from the last point back to the
/// first is implicit.
pub type Ring = Vec<Point>;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_color32(self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }

    pub fn to_image(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

/// The user's floor/wall outline. Rings never self-intersect and never cross
/// each other; every committed value has been checked before it got here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Surface {
    pub id: String,
    pub rings: Vec<Ring>,
}

impl Surface {
    pub fn new(id: impl Into<String>, rings: Vec<Ring>) -> Self {
        Self {
            id: id.into(),
            rings,
        }
    }

    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.rings.iter().all(|r| r.len() < 3)
    }

    pub fn with_rings(&self, rings: Vec<Ring>) -> Self {
        Self {
            id: self.id.clone(),
            rings,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TileKind {
    #[default]
    Rectangle,
    Triangle,
    Hexagon,
    Octagon,
    Polygon,
}

impl TileKind {
    pub fn label(self) -> &'static str {
        match self {
            TileKind::Rectangle => "Rectangle",
            TileKind::Triangle => "Triangle",
            TileKind::Hexagon => "Hexagon",
            TileKind::Octagon => "Octagon",
            TileKind::Polygon => "Polygon",
        }
    }

    /// Number of corners used when creating a fresh tile of this kind.
    pub fn sides(self) -> usize {
        match self {
            TileKind::Rectangle => 4,
            TileKind::Triangle => 3,
            TileKind::Hexagon => 6,
            TileKind::Octagon => 8,
            TileKind::Polygon => 5,
        }
    }
}

/// Rotation/scale pivot and accumulated angle of a tile.
///
/// The pivot is fixed when the tile is created and afterwards only moves with
/// translations; rotating or resizing does not recompute it.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TileMetadata {
    pub angle: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl TileMetadata {
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub points: Vec<Point>,
    pub color: Rgba,
    #[serde(default)]
    pub texture_ref: Option<String>,
    #[serde(default)]
    pub texture_offset_x: f64,
    #[serde(default)]
    pub texture_offset_y: f64,
    #[serde(default = "default_texture_scale")]
    pub texture_scale: f64,
    pub metadata: TileMetadata,
}

fn default_texture_scale() -> f64 {
    1.0
}

impl Tile {
    pub fn new(id: u64, kind: TileKind, points: Vec<Point>, color: Rgba, pivot: Point) -> Self {
        Self {
            id,
            kind,
            points,
            color,
            texture_ref: None,
            texture_offset_x: 0.0,
            texture_offset_y: 0.0,
            texture_scale: 1.0,
            metadata: TileMetadata {
                angle: 0.0,
                center_x: pivot.x,
                center_y: pivot.y,
            },
        }
    }
}

/// A tileable unit cell.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub tiles_gap: f64,
    pub scale: f64,
    pub gap_color: Rgba,
    #[serde(default)]
    pub tiles: Vec<Tile>,
}

impl Pattern {
    pub fn tile(&self, id: u64) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_index(&self, id: u64) -> Option<usize> {
        self.tiles.iter().position(|t| t.id == id)
    }

    pub fn next_tile_id(&self) -> u64 {
        self.tiles.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Metric size of one pattern cell.
    pub fn metric_size(&self) -> (f64, f64) {
        (self.width * self.scale, self.height * self.scale)
    }
}

/// What the persistence layer hands over. Every field is optional on disk so a
/// partially written file still loads.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rings: Vec<Ring>,
    #[serde(default)]
    pub pattern: Option<Pattern>,
    #[serde(default)]
    pub textures: BTreeMap<String, String>,
}

pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.dot(ab);
    if ab_len2 <= f64::EPSILON {
        return (p - a).length();
    }
    let t = (ap.dot(ab) / ab_len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_serializes_as_pair() {
        let ring = vec![Point::new(0.0, 0.0), Point::new(200.0, 0.5)];
        let json = serde_json::to_string(&ring).unwrap();
        assert_eq!(json, "[[0.0,0.0],[200.0,0.5]]");
        let back: Vec<Point> = serde_json::from_str("[[1,2],[3,4]]").unwrap();
        assert_eq!(back, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
    }

    #[test]
    fn tile_uses_type_field_and_defaults() {
        let json = r#"{
            "id": 3,
            "type": "Hexagon",
            "points": [[0,0],[1,0],[1,1]],
            "color": {"r":1,"g":2,"b":3,"a":255},
            "metadata": {"angle": 15.0, "centerX": 0.5, "centerY": 0.5}
        }"#;
        let tile: Tile = serde_json::from_str(json).unwrap();
        assert_eq!(tile.kind, TileKind::Hexagon);
        assert_eq!(tile.texture_ref, None);
        assert_eq!(tile.texture_scale, 1.0);
        assert_eq!(tile.metadata.center(), Point::new(0.5, 0.5));
    }

    #[test]
    fn pattern_cell_in_metres() {
        let pattern = Pattern {
            width: 400.0,
            height: 250.0,
            x: 0.0,
            y: 0.0,
            tiles_gap: 0.0,
            scale: 0.1,
            gap_color: Rgba::rgb(0, 0, 0),
            tiles: Vec::new(),
        };
        let (w, h) = pattern.metric_size();
        assert!((w - 40.0).abs() < 1e-9);
        assert!((h - 25.0).abs() < 1e-9);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Point::new(2.0, 2.0), a, a), 8f64.sqrt());
    }

    #[test]
    fn empty_surface_ignores_degenerate_rings() {
        let s = Surface::new("s", vec![vec![Point::ZERO, Point::new(1.0, 1.0)]]);
        assert!(s.is_empty());
    }
}
