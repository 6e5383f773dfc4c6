//! Editing sessions: the pointer-gesture protocol that ties the mode machine,
//! the engines and undo history together.
//!
//! Positions handed to these types are already in surface/pattern space; the
//! caller owns the view transform. Each gesture keeps its own drag-start
//! snapshot, so cancelling one restores the prior value exactly.

use crate::clipping::{OverlayOps, PolygonOps};
use crate::edit_state::{EditEvent, EditMode, EditState};
use crate::history::History;
use crate::model::{Pattern, Point, Rgba, Ring, Surface, TileKind};
use crate::pattern::{self, TileAction, TileDrag};
use crate::surface::{
    self, Composition, DraftStep, ShapeDraft, VertexRef, WallAxis, WallDraft, WallRef,
};
use tracing::{debug, info};

#[derive(Clone, Debug)]
enum Gesture {
    Corner {
        corner: VertexRef,
        start: Surface,
        start_pointer: Point,
    },
    Wall {
        wall: WallRef,
        axis: WallAxis,
        start: Surface,
        start_pointer: Point,
    },
    Pan {
        start: Surface,
        start_pointer: Point,
    },
    Draft(ShapeDraft),
}

pub struct SurfaceEditor<O: PolygonOps = OverlayOps> {
    history: History<Surface>,
    state: EditState,
    ops: O,
    gesture: Option<Gesture>,
    walls: WallDraft,
    /// Metric units per pixel.
    pub scale: f64,
    pub keep_right_angles: bool,
}

impl SurfaceEditor<OverlayOps> {
    pub fn new(surface: Surface) -> Self {
        Self::with_ops(surface, OverlayOps)
    }
}

impl<O: PolygonOps> SurfaceEditor<O> {
    pub fn with_ops(surface: Surface, ops: O) -> Self {
        let state = if surface.is_empty() {
            EditState::initial()
        } else {
            EditState::Default
        };
        Self {
            history: History::new(surface),
            state,
            ops,
            gesture: None,
            walls: WallDraft::default(),
            scale: 0.01,
            keep_right_angles: true,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::with_limit(self.history.present().clone(), limit);
        self
    }

    pub fn surface(&self) -> &Surface {
        self.history.present()
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn history(&self) -> &History<Surface> {
        &self.history
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Rectangle being dragged in add/subtract mode, with its validity flag.
    pub fn draft(&self) -> Option<&ShapeDraft> {
        match &self.gesture {
            Some(Gesture::Draft(d)) => Some(d),
            _ => None,
        }
    }

    /// Corners placed so far in draw-walls mode.
    pub fn wall_draft(&self) -> &[Point] {
        &self.walls.points
    }

    /// Replace the whole surface, e.g. after loading a project. History starts
    /// over.
    pub fn load(&mut self, surface: Surface) {
        self.state = if surface.is_empty() {
            EditState::initial()
        } else {
            EditState::Default
        };
        self.history.clear(surface);
        self.gesture = None;
        self.walls = WallDraft::default();
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        self.abort_gesture();
        self.walls = WallDraft::default();
        self.state = self.state.transition(EditEvent::Switch(mode), self.history.present());
    }

    /// Leave the current mode: drops any gesture or half-drawn walls.
    pub fn cancel(&mut self) {
        self.abort_gesture();
        self.walls = WallDraft::default();
        self.state = self.state.transition(EditEvent::Cancel, self.history.present());
    }

    pub fn pointer_down(&mut self, p: Point, hit_radius: f64) {
        if self.gesture.is_some() {
            return;
        }
        match self.state {
            EditState::Preview => {
                self.history.persist();
                self.gesture = Some(Gesture::Pan {
                    start: self.history.present().clone(),
                    start_pointer: p,
                });
            }
            EditState::AddSurface | EditState::SubtractSurface => {
                let composition = if self.state == EditState::AddSurface {
                    Composition::Add
                } else {
                    Composition::Subtract
                };
                let draft = ShapeDraft::new(composition, p, self.history.present(), &self.ops);
                self.gesture = Some(Gesture::Draft(draft));
            }
            EditState::DrawWalls => self.place_wall_corner(p, hit_radius),
            EditState::Default | EditState::EditWall { .. } | EditState::EditCorner { .. } => {
                self.begin_edit(p, hit_radius)
            }
        }
    }

    fn begin_edit(&mut self, p: Point, hit_radius: f64) {
        let current = self.history.present();
        if let Some(corner) = surface::hit_corner(current, p, hit_radius) {
            self.state = self.state.transition(EditEvent::SelectCorner(corner), current);
        } else if let Some(wall) = surface::hit_wall(current, p, hit_radius) {
            self.state = self.state.transition(EditEvent::SelectWall(wall), current);
        } else {
            self.state = self.state.transition(EditEvent::ClickEmpty, current);
            return;
        }

        let start = current.clone();
        let gesture = match (self.state.selected_corner(), self.state.selected_wall(), self.state.wall_axis()) {
            (Some(corner), _, _) => Gesture::Corner {
                corner,
                start,
                start_pointer: p,
            },
            (None, Some(wall), Some(axis)) => Gesture::Wall {
                wall,
                axis,
                start,
                start_pointer: p,
            },
            _ => return,
        };
        self.history.persist();
        self.gesture = Some(gesture);
    }

    fn place_wall_corner(&mut self, p: Point, close_radius: f64) {
        match self.walls.push(p, close_radius) {
            DraftStep::Extended => {}
            DraftStep::Ignored => debug!(x = p.x, y = p.y, "wall corner rejected"),
            DraftStep::Closed(ring) => {
                let corners = ring.len();
                let next = surface::close_wall_draft(self.history.present(), ring, &self.ops);
                if let Some(next) = next {
                    info!(corners, "closed drawn walls");
                    self.history.set(next, false);
                }
            }
        }
    }

    pub fn pointer_move(&mut self, p: Point) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let next = match gesture {
            Gesture::Corner {
                corner,
                start,
                start_pointer,
            } => surface::drag_corner(start, *corner, p - *start_pointer),
            Gesture::Wall {
                wall,
                axis,
                start,
                start_pointer,
            } => surface::drag_wall(start, *wall, *axis, p - *start_pointer),
            Gesture::Pan {
                start,
                start_pointer,
            } => Some(surface::translate_surface(start, p - *start_pointer)),
            Gesture::Draft(draft) => {
                draft.update(p, self.history.present(), &self.ops);
                None
            }
        };
        if let Some(next) = next {
            self.history.replace(next);
        }
    }

    pub fn pointer_up(&mut self, p: Point) {
        self.pointer_move(p);
        match self.gesture.take() {
            Some(Gesture::Draft(draft)) => {
                if let Some(next) = draft.commit(self.history.present(), &self.ops) {
                    info!(composition = ?draft.composition, rings = next.rings.len(), "composed surface");
                    self.history.set(next, false);
                }
            }
            Some(
                Gesture::Corner { start, .. } | Gesture::Wall { start, .. } | Gesture::Pan { start, .. },
            ) => {
                // a click without movement leaves no undo step behind
                if *self.history.present() == start {
                    self.history.revert_persist();
                }
            }
            None => {}
        }
    }

    /// Abandon the current gesture and restore the pre-drag surface.
    pub fn pointer_cancel(&mut self) {
        self.abort_gesture();
    }

    fn abort_gesture(&mut self) {
        match self.gesture.take() {
            Some(Gesture::Corner { .. } | Gesture::Wall { .. } | Gesture::Pan { .. }) => {
                debug!("drag cancelled");
                self.history.revert_persist();
            }
            Some(Gesture::Draft(_)) | None => {}
        }
    }

    pub fn selected_wall_length(&self) -> Option<f64> {
        let wall = self.state.selected_wall()?;
        surface::wall_length(self.history.present(), wall, self.scale)
    }

    /// Resize the selected wall to `target` metric units.
    pub fn set_selected_wall_length(&mut self, target: f64) -> bool {
        let Some(wall) = self.state.selected_wall() else {
            return false;
        };
        let next = surface::set_wall_length(
            self.history.present(),
            wall,
            target,
            self.scale,
            self.keep_right_angles,
        );
        self.commit(next)
    }

    pub fn square_selected_corner(&mut self) -> bool {
        let Some(corner) = self.state.selected_corner() else {
            return false;
        };
        let next = surface::square_corner(self.history.present(), corner);
        self.commit(next)
    }

    pub fn insert_corner(&mut self, wall: WallRef, at: Point) -> bool {
        let next = surface::insert_corner(self.history.present(), wall, at);
        let changed = self.commit(next);
        if changed {
            self.state = self.state.refreshed(self.history.present());
        }
        changed
    }

    pub fn remove_selected_corner(&mut self) -> bool {
        let Some(corner) = self.state.selected_corner() else {
            return false;
        };
        let next = surface::remove_corner(self.history.present(), corner);
        let changed = self.commit(next);
        if changed {
            self.state = EditState::Default;
        }
        changed
    }

    fn commit(&mut self, next: Option<Surface>) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        match next {
            Some(next) if next != *self.history.present() => {
                self.history.set(next, false);
                true
            }
            _ => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        self.abort_gesture();
        let changed = self.history.undo();
        self.settle_state();
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.abort_gesture();
        let changed = self.history.redo();
        self.settle_state();
        changed
    }

    /// Selections whose indices no longer exist fall back to `Default`.
    fn settle_state(&mut self) {
        if !self.state.fits(self.history.present()) {
            self.state = EditState::Default;
        }
    }

    pub fn corner_angles(&self) -> Vec<Vec<f64>> {
        self.history
            .present()
            .rings
            .iter()
            .map(|r| surface::corner_angles(r))
            .collect()
    }

    pub fn wall_lengths(&self) -> Vec<Vec<f64>> {
        self.history
            .present()
            .rings
            .iter()
            .map(|r| surface::wall_lengths(r, self.scale))
            .collect()
    }

    pub fn area(&self) -> f64 {
        self.ops.area(&self.history.present().rings) * self.scale * self.scale
    }

    pub fn contains(&self, p: Point) -> bool {
        self.ops.point_in_polygon(p, &self.history.present().rings)
    }

    pub fn rings(&self) -> &[Ring] {
        &self.history.present().rings
    }
}

/// Tile pattern editing session.
pub struct PatternEditor {
    history: History<Pattern>,
    drag: Option<TileDrag>,
    selected: Option<u64>,
}

impl PatternEditor {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            history: History::new(pattern),
            drag: None,
            selected: None,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        self.history.present()
    }

    pub fn history(&self) -> &History<Pattern> {
        &self.history
    }

    pub fn selected(&self) -> Option<u64> {
        self.selected
    }

    pub fn select(&mut self, id: Option<u64>) {
        self.selected = id.filter(|&id| self.history.present().tile(id).is_some());
    }

    pub fn active_action(&self) -> Option<TileAction> {
        self.drag.as_ref().map(|d| d.action)
    }

    pub fn load(&mut self, pattern: Pattern) {
        self.history.clear(pattern);
        self.drag = None;
        self.selected = None;
    }

    pub fn pointer_down(&mut self, p: Point, hit_radius: f64) {
        if self.drag.is_some() {
            return;
        }
        let Some((id, action)) = pattern::hit_tile(self.history.present(), p, hit_radius) else {
            self.selected = None;
            return;
        };
        self.selected = Some(id);
        if let Some(drag) = TileDrag::begin(self.history.present(), id, action, p) {
            self.history.persist();
            self.drag = Some(drag);
        }
    }

    pub fn pointer_move(&mut self, p: Point) {
        let Some(drag) = self.drag.as_ref() else {
            return;
        };
        if let Some(next) = pattern::drag_tile(self.history.present(), drag, p) {
            self.history.replace(next);
        }
    }

    pub fn pointer_up(&mut self, p: Point) {
        self.pointer_move(p);
        let Some(drag) = self.drag.take() else {
            return;
        };
        let unchanged = self
            .history
            .present()
            .tile(drag.tile_id)
            .is_some_and(|t| t.points == drag.start_points && t.metadata == drag.start_metadata);
        if unchanged {
            self.history.revert_persist();
        }
    }

    pub fn pointer_cancel(&mut self) {
        if self.drag.take().is_some() {
            self.history.revert_persist();
        }
    }

    fn apply(&mut self, next: Option<Pattern>) -> bool {
        if self.drag.is_some() {
            return false;
        }
        match next {
            Some(next) if next != *self.history.present() => {
                self.history.set(next, false);
                true
            }
            _ => false,
        }
    }

    pub fn add_tile(&mut self, kind: TileKind, color: Rgba) -> bool {
        let next = pattern::add_tile(self.history.present(), kind, color);
        let id = next.tiles.last().map(|t| t.id);
        let changed = self.apply(Some(next));
        if changed {
            self.selected = id;
        }
        changed
    }

    pub fn remove_selected(&mut self) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        let changed = self.apply(pattern::remove_tile(self.history.present(), id));
        if changed {
            self.selected = None;
        }
        changed
    }

    pub fn recolor_selected(&mut self, color: Rgba) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        self.apply(pattern::recolor_tile(self.history.present(), id, color))
    }

    pub fn set_selected_texture(&mut self, texture_ref: Option<String>) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        self.apply(pattern::set_tile_texture(self.history.present(), id, texture_ref))
    }

    pub fn resize(&mut self, width: f64, height: f64) -> bool {
        self.apply(pattern::resize_pattern(self.history.present(), width, height))
    }

    pub fn set_gap(&mut self, gap: f64) -> bool {
        self.apply(Some(pattern::set_tiles_gap(self.history.present(), gap)))
    }

    pub fn set_gap_color(&mut self, color: Rgba) -> bool {
        let next = Pattern {
            gap_color: color,
            ..self.history.present().clone()
        };
        self.apply(Some(next))
    }

    pub fn undo(&mut self) -> bool {
        self.pointer_cancel();
        let changed = self.history.undo();
        self.select(self.selected);
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.pointer_cancel();
        let changed = self.history.redo();
        self.select(self.selected);
        changed
    }
}
