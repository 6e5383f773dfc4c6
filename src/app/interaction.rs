use eframe::egui;
use surface_tiler::model::Point;

use super::render::{
    draw_background, draw_draft, draw_pattern, draw_surface, draw_surface_labels, draw_wall_draft,
};
use super::{TilerApp, View};

/// Primary-button edges for one canvas this frame.
struct PointerEdges {
    pressed: bool,
    released: bool,
    down: bool,
    world: Option<Point>,
}

fn pointer_edges(
    ctx: &egui::Context,
    response: &egui::Response,
    view: &View,
    origin: egui::Pos2,
) -> PointerEdges {
    let (pressed, released, down, pos) = ctx.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.primary_down(),
            i.pointer.interact_pos(),
        )
    });
    PointerEdges {
        pressed: pressed && response.hovered(),
        released,
        down,
        world: pos.map(|p| view.screen_to_world(origin, p)),
    }
}

fn pan_and_zoom(ctx: &egui::Context, response: &egui::Response, rect: egui::Rect, view: &mut View) {
    let scroll_delta = ctx.input(|i| i.raw_scroll_delta.y);
    if scroll_delta.abs() > 0.0 {
        if let Some(hover_pos) = ctx.input(|i| i.pointer.hover_pos()) {
            if rect.contains(hover_pos) {
                let zoom_delta = (1.0 + scroll_delta * 0.001).clamp(0.8, 1.25);
                view.zoom_about_screen_point(rect.min, hover_pos, zoom_delta);
            }
        }
    }
    if response.dragged_by(egui::PointerButton::Middle) {
        view.pan_screen += response.drag_delta();
    }
}

impl TilerApp {
    pub(super) fn surface_canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let origin = rect.min;
        pan_and_zoom(ctx, &response, rect, &mut self.view);

        let edges = pointer_edges(ctx, &response, &self.view, origin);
        let hit_radius = self.settings.hit_radius / self.view.zoom as f64;
        if let Some(p) = edges.world {
            if edges.pressed {
                self.surface.pointer_down(p, hit_radius);
                self.sync_wall_length_input();
            } else if self.surface.is_dragging() {
                if edges.released {
                    self.surface.pointer_up(p);
                    self.sync_wall_length_input();
                } else if edges.down {
                    self.surface.pointer_move(p);
                }
            }
        }
        if self.surface.is_dragging() && !edges.down && !edges.released {
            // the release happened somewhere we never saw
            self.surface.pointer_cancel();
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, &self.view);
        draw_surface(
            &painter,
            origin,
            &self.view,
            self.surface.surface(),
            self.surface.state(),
            self.fill_texture.as_ref(),
            self.patterns.pattern(),
        );
        draw_surface_labels(
            &painter,
            origin,
            &self.view,
            &self.surface,
            self.settings.show_angles,
            self.settings.show_lengths,
        );
        if let Some(draft) = self.surface.draft() {
            draw_draft(&painter, origin, &self.view, draft);
        }
        draw_wall_draft(&painter, origin, &self.view, self.surface.wall_draft(), edges.world);
    }

    pub(super) fn pattern_canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let size = egui::vec2(ui.available_width(), 240.0);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let origin = rect.min;
        pan_and_zoom(ctx, &response, rect, &mut self.pattern_view);

        let edges = pointer_edges(ctx, &response, &self.pattern_view, origin);
        let hit_radius = 6.0 / self.pattern_view.zoom as f64;
        if let Some(p) = edges.world {
            if edges.pressed {
                self.patterns.pointer_down(p, hit_radius);
                if let Some(tile) = self.patterns.selected().and_then(|id| self.patterns.pattern().tile(id)) {
                    self.tile_color = tile.color.to_color32();
                }
            } else if self.patterns.active_action().is_some() {
                if edges.released {
                    self.patterns.pointer_up(p);
                } else if edges.down {
                    self.patterns.pointer_move(p);
                }
            }
        }
        if self.patterns.active_action().is_some() && !edges.down && !edges.released {
            self.patterns.pointer_cancel();
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
        draw_pattern(
            &painter,
            origin,
            &self.pattern_view,
            self.patterns.pattern(),
            self.patterns.selected(),
        );
    }

    pub(super) fn sync_wall_length_input(&mut self) {
        self.wall_length_input = self
            .surface
            .selected_wall_length()
            .map(|l| format!("{l:.2}"))
            .unwrap_or_default();
    }
}
