use eframe::egui;
use surface_tiler::edit_state::{EditMode, EditState};
use surface_tiler::geometry::next_index;
use surface_tiler::model::{Pattern, Point, Surface};
use surface_tiler::pattern::tile_handles;
use surface_tiler::session::SurfaceEditor;
use surface_tiler::surface::{ShapeDraft, fill_triangles};
use tracing::debug;

use super::View;

const OUTLINE: egui::Color32 = egui::Color32::from_rgb(230, 230, 230);
const ACCENT: egui::Color32 = egui::Color32::from_rgb(90, 160, 255);
const INVALID: egui::Color32 = egui::Color32::from_rgb(220, 70, 70);
const UNTEXTURED_FILL: egui::Color32 = egui::Color32::from_rgba_premultiplied(60, 60, 70, 160);

pub(super) fn mode_button(ui: &mut egui::Ui, mode: EditMode, current: EditMode) -> bool {
    ui.selectable_label(current == mode, mode.label()).clicked()
}

pub(super) fn color_row(ui: &mut egui::Ui, color: &mut egui::Color32) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        let presets = [
            egui::Color32::from_rgb(214, 196, 170),
            egui::Color32::from_rgb(190, 170, 142),
            egui::Color32::from_rgb(150, 110, 80),
            egui::Color32::from_rgb(230, 230, 225),
            egui::Color32::from_rgb(90, 100, 110),
            egui::Color32::from_rgb(60, 110, 140),
        ];
        for c in presets {
            if ui
                .add_sized([18.0, 18.0], egui::Button::new("").fill(c))
                .clicked()
            {
                *color = c;
                changed = true;
            }
        }
        changed |= ui.color_edit_button_srgba(color).changed();
    });
    changed
}

pub(super) fn draw_background(painter: &egui::Painter, rect: egui::Rect, view: &View) {
    let bg = painter.ctx().style().visuals.extreme_bg_color;
    painter.rect_filled(rect, 0.0, bg);
    let grid_color = egui::Color32::from_gray(60);
    let spacing_world = 100.0;
    let spacing_screen = spacing_world * view.zoom;
    if spacing_screen >= 24.0 {
        let start = rect.min + view.pan_screen;
        let x0 = ((rect.min.x - start.x) / spacing_screen).floor() * spacing_screen + start.x;
        let y0 = ((rect.min.y - start.y) / spacing_screen).floor() * spacing_screen + start.y;
        let mut x = x0;
        while x < rect.max.x {
            painter.line_segment(
                [egui::pos2(x, rect.min.y), egui::pos2(x, rect.max.y)],
                egui::Stroke::new(1.0, grid_color),
            );
            x += spacing_screen;
        }
        let mut y = y0;
        while y < rect.max.y {
            painter.line_segment(
                [egui::pos2(rect.min.x, y), egui::pos2(rect.max.x, y)],
                egui::Stroke::new(1.0, grid_color),
            );
            y += spacing_screen;
        }
    }
}

/// Fill mesh for the surface. With a texture the pattern cell repeats with
/// its origin at `(pattern.x, pattern.y)`.
fn surface_mesh(
    origin: egui::Pos2,
    view: &View,
    surface: &Surface,
    texture: Option<&egui::TextureHandle>,
    pattern: &Pattern,
) -> Option<egui::Mesh> {
    let triangles = match fill_triangles(&surface.rings) {
        Ok(triangles) => triangles,
        Err(e) => {
            debug!(error = %e, "surface fill skipped");
            return None;
        }
    };
    let mut mesh = match texture {
        Some(texture) => egui::Mesh::with_texture(texture.id()),
        None => egui::Mesh::default(),
    };
    for tri in triangles {
        let base = mesh.vertices.len() as u32;
        for p in tri {
            let pos = view.world_to_screen(origin, p);
            match texture {
                Some(_) => {
                    let uv = egui::pos2(
                        ((p.x - pattern.x) / pattern.width) as f32,
                        ((p.y - pattern.y) / pattern.height) as f32,
                    );
                    mesh.vertices.push(egui::epaint::Vertex {
                        pos,
                        uv,
                        color: egui::Color32::WHITE,
                    });
                }
                None => mesh.colored_vertex(pos, UNTEXTURED_FILL),
            }
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }
    Some(mesh)
}

pub(super) fn draw_surface(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    surface: &Surface,
    state: EditState,
    texture: Option<&egui::TextureHandle>,
    pattern: &Pattern,
) {
    if let Some(mesh) = surface_mesh(origin, view, surface, texture, pattern) {
        painter.add(egui::Shape::mesh(mesh));
    }

    let outline = egui::Stroke::new(2.0, OUTLINE);
    for ring in &surface.rings {
        let pts: Vec<egui::Pos2> = ring.iter().map(|&p| view.world_to_screen(origin, p)).collect();
        if pts.len() >= 2 {
            painter.add(egui::Shape::closed_line(pts, outline));
        }
    }

    if let Some(wall) = state.selected_wall() {
        if let Some(ring) = surface.rings.get(wall.ring).filter(|r| wall.index < r.len()) {
            let a = view.world_to_screen(origin, ring[wall.index]);
            let b = view.world_to_screen(origin, ring[next_index(wall.index, ring.len())]);
            painter.line_segment([a, b], egui::Stroke::new(4.0, ACCENT));
        }
    }

    if !matches!(
        state.mode(),
        EditMode::Default | EditMode::EditWall | EditMode::EditCorner
    ) {
        return;
    }
    let selected = state.selected_corner();
    for (r, ring) in surface.rings.iter().enumerate() {
        for (i, &p) in ring.iter().enumerate() {
            let center = view.world_to_screen(origin, p);
            let active = selected.is_some_and(|c| c.ring == r && c.index == i);
            let fill = if active { ACCENT } else { egui::Color32::WHITE };
            painter.circle(center, 4.5, fill, egui::Stroke::new(1.0, egui::Color32::BLACK));
        }
    }
}

pub(super) fn draw_surface_labels(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    editor: &SurfaceEditor,
    show_angles: bool,
    show_lengths: bool,
) {
    let font = egui::FontId::proportional(11.0);
    let text_color = egui::Color32::from_gray(220);
    let rings = editor.rings();
    if show_lengths {
        for (ring, lengths) in rings.iter().zip(editor.wall_lengths()) {
            for (i, length) in lengths.into_iter().enumerate() {
                let a = ring[i];
                let b = ring[next_index(i, ring.len())];
                let mid = view.world_to_screen(origin, (a + b) * 0.5);
                painter.text(
                    mid + egui::vec2(0.0, -10.0),
                    egui::Align2::CENTER_CENTER,
                    format!("{length:.2}"),
                    font.clone(),
                    text_color,
                );
            }
        }
    }
    if show_angles {
        for (ring, angles) in rings.iter().zip(editor.corner_angles()) {
            for (p, angle) in ring.iter().zip(angles) {
                painter.text(
                    view.world_to_screen(origin, *p) + egui::vec2(10.0, 10.0),
                    egui::Align2::LEFT_TOP,
                    format!("{angle:.0}°"),
                    font.clone(),
                    ACCENT,
                );
            }
        }
    }
}

pub(super) fn draw_draft(painter: &egui::Painter, origin: egui::Pos2, view: &View, draft: &ShapeDraft) {
    let color = if draft.valid { ACCENT } else { INVALID };
    let pts: Vec<egui::Pos2> = draft
        .ring()
        .into_iter()
        .map(|p| view.world_to_screen(origin, p))
        .collect();
    painter.add(egui::Shape::convex_polygon(
        pts,
        color.gamma_multiply(0.2),
        egui::Stroke::new(1.5, color),
    ));
}

pub(super) fn draw_wall_draft(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    points: &[Point],
    cursor: Option<Point>,
) {
    if points.is_empty() {
        return;
    }
    let mut pts: Vec<egui::Pos2> = points.iter().map(|&p| view.world_to_screen(origin, p)).collect();
    if let Some(cursor) = cursor {
        pts.push(view.world_to_screen(origin, cursor));
    }
    for p in &pts[..points.len()] {
        painter.circle_filled(*p, 3.5, ACCENT);
    }
    painter.add(egui::Shape::line(pts, egui::Stroke::new(1.5, ACCENT)));
}

/// The pattern cell as vectors, with handles on the selected tile.
pub(super) fn draw_pattern(
    painter: &egui::Painter,
    origin: egui::Pos2,
    view: &View,
    pattern: &Pattern,
    selected: Option<u64>,
) {
    let cell = egui::Rect::from_two_pos(
        view.world_to_screen(origin, Point::ZERO),
        view.world_to_screen(origin, Point::new(pattern.width, pattern.height)),
    );
    painter.rect_filled(cell, 0.0, pattern.gap_color.to_color32());

    // gap outline, as in the raster
    let gap = egui::Stroke::new(
        pattern.tiles_gap as f32 * view.zoom,
        pattern.gap_color.to_color32(),
    );
    for tile in &pattern.tiles {
        let pts: Vec<egui::Pos2> = tile
            .points
            .iter()
            .map(|&p| view.world_to_screen(origin, p))
            .collect();
        painter.add(egui::Shape::convex_polygon(pts, tile.color.to_color32(), gap));
    }

    let Some(tile) = selected.and_then(|id| pattern.tile(id)) else {
        return;
    };
    let outline: Vec<egui::Pos2> = tile
        .points
        .iter()
        .map(|&p| view.world_to_screen(origin, p))
        .collect();
    painter.add(egui::Shape::closed_line(outline, egui::Stroke::new(2.0, ACCENT)));
    let Some(handles) = tile_handles(tile) else {
        return;
    };
    let pivot = view.world_to_screen(origin, tile.metadata.center());
    painter.circle_stroke(pivot, 3.0, egui::Stroke::new(1.0, ACCENT));
    let rotate = view.world_to_screen(origin, handles.rotate);
    painter.circle(rotate, 5.0, ACCENT, egui::Stroke::new(1.0, egui::Color32::BLACK));
    for handle in [handles.resize_ns, handles.resize_ew] {
        let center = view.world_to_screen(origin, handle);
        painter.rect(
            egui::Rect::from_center_size(center, egui::vec2(8.0, 8.0)),
            0.0,
            egui::Color32::WHITE,
            egui::Stroke::new(1.0, egui::Color32::BLACK),
            egui::StrokeKind::Middle,
        );
    }
}
