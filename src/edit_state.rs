//! Interaction modes of the surface editor.
//!
//! Entering `EditWall`/`EditCorner` derives neighbour indices and axis flags
//! from the surface at that moment. They stay frozen while the mode is active,
//! even if the geometry changes underneath; [`EditState::refreshed`] recomputes
//! them on request.

use crate::geometry::{next_index, prev_index};
use crate::model::Surface;
use crate::surface::{VertexRef, WallAxis, WallRef, ring_of};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMode {
    Default,
    Preview,
    EditWall,
    EditCorner,
    AddSurface,
    SubtractSurface,
    DrawWalls,
}

impl EditMode {
    pub fn label(self) -> &'static str {
        match self {
            EditMode::Default => "Select",
            EditMode::Preview => "Preview",
            EditMode::EditWall => "Edit wall",
            EditMode::EditCorner => "Edit corner",
            EditMode::AddSurface => "Add surface",
            EditMode::SubtractSurface => "Subtract surface",
            EditMode::DrawWalls => "Draw walls",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditState {
    Default,
    Preview,
    EditWall {
        ring: usize,
        wall_index: usize,
        next_wall_index: usize,
        horizontal: bool,
        vertical: bool,
    },
    EditCorner {
        ring: usize,
        corner_index: usize,
        prev_index: usize,
        next_index: usize,
    },
    AddSurface,
    SubtractSurface,
    DrawWalls,
}

/// Something the user did that may change the mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditEvent {
    /// Toolbar switch to one of the index-free modes.
    Switch(EditMode),
    SelectWall(WallRef),
    SelectCorner(VertexRef),
    ClickEmpty,
    Cancel,
}

impl Default for EditState {
    fn default() -> Self {
        Self::initial()
    }
}

impl EditState {
    /// First use starts by drawing the initial outline.
    pub fn initial() -> Self {
        EditState::AddSurface
    }

    pub fn mode(&self) -> EditMode {
        match self {
            EditState::Default => EditMode::Default,
            EditState::Preview => EditMode::Preview,
            EditState::EditWall { .. } => EditMode::EditWall,
            EditState::EditCorner { .. } => EditMode::EditCorner,
            EditState::AddSurface => EditMode::AddSurface,
            EditState::SubtractSurface => EditMode::SubtractSurface,
            EditState::DrawWalls => EditMode::DrawWalls,
        }
    }

    /// Modes in which corners and walls can be picked for editing.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            EditState::Default | EditState::EditWall { .. } | EditState::EditCorner { .. }
        )
    }

    pub fn selected_wall(&self) -> Option<WallRef> {
        match *self {
            EditState::EditWall {
                ring, wall_index, ..
            } => Some(WallRef {
                ring,
                index: wall_index,
            }),
            _ => None,
        }
    }

    pub fn selected_corner(&self) -> Option<VertexRef> {
        match *self {
            EditState::EditCorner {
                ring, corner_index, ..
            } => Some(VertexRef {
                ring,
                index: corner_index,
            }),
            _ => None,
        }
    }

    /// The axis a wall drag is locked to, as frozen at selection time.
    pub fn wall_axis(&self) -> Option<WallAxis> {
        match *self {
            EditState::EditWall {
                horizontal: true, ..
            } => Some(WallAxis::Horizontal),
            EditState::EditWall { vertical: true, .. } => Some(WallAxis::Vertical),
            EditState::EditWall { .. } => Some(WallAxis::Oblique),
            _ => None,
        }
    }

    /// Apply an event. Illegal transitions leave the state unchanged.
    pub fn transition(self, event: EditEvent, surface: &Surface) -> EditState {
        match event {
            EditEvent::Switch(mode) => match mode {
                EditMode::Default => EditState::Default,
                EditMode::Preview => EditState::Preview,
                EditMode::AddSurface => EditState::AddSurface,
                EditMode::SubtractSurface => EditState::SubtractSurface,
                EditMode::DrawWalls => EditState::DrawWalls,
                // these need a target; use SelectWall/SelectCorner
                EditMode::EditWall | EditMode::EditCorner => self,
            },
            EditEvent::SelectWall(wall) if self.is_editable() => {
                Self::enter_wall(surface, wall).unwrap_or(self)
            }
            EditEvent::SelectCorner(corner) if self.is_editable() => {
                Self::enter_corner(surface, corner).unwrap_or(self)
            }
            EditEvent::SelectWall(_) | EditEvent::SelectCorner(_) => self,
            EditEvent::ClickEmpty if self.is_editable() => EditState::Default,
            EditEvent::ClickEmpty => self,
            EditEvent::Cancel => EditState::Default,
        }
    }

    fn enter_wall(surface: &Surface, wall: WallRef) -> Option<EditState> {
        let ring = ring_of(surface, wall.ring)?;
        let n = ring.len();
        if wall.index >= n {
            return None;
        }
        let next = next_index(wall.index, n);
        let axis = WallAxis::of(ring[wall.index], ring[next]);
        Some(EditState::EditWall {
            ring: wall.ring,
            wall_index: wall.index,
            next_wall_index: next,
            horizontal: axis == WallAxis::Horizontal,
            vertical: axis == WallAxis::Vertical,
        })
    }

    fn enter_corner(surface: &Surface, corner: VertexRef) -> Option<EditState> {
        let ring = ring_of(surface, corner.ring)?;
        let n = ring.len();
        if corner.index >= n {
            return None;
        }
        Some(EditState::EditCorner {
            ring: corner.ring,
            corner_index: corner.index,
            prev_index: prev_index(corner.index, n),
            next_index: next_index(corner.index, n),
        })
    }

    /// Re-derive frozen fields from `surface`. Falls back to `Default` when
    /// the selected wall or corner no longer exists.
    pub fn refreshed(self, surface: &Surface) -> EditState {
        match self {
            EditState::EditWall {
                ring, wall_index, ..
            } => Self::enter_wall(
                surface,
                WallRef {
                    ring,
                    index: wall_index,
                },
            )
            .unwrap_or(EditState::Default),
            EditState::EditCorner {
                ring, corner_index, ..
            } => Self::enter_corner(
                surface,
                VertexRef {
                    ring,
                    index: corner_index,
                },
            )
            .unwrap_or(EditState::Default),
            other => other,
        }
    }

    /// Whether the indices carried by this state still point into `surface`.
    pub fn fits(&self, surface: &Surface) -> bool {
        match *self {
            EditState::EditWall {
                ring,
                wall_index,
                next_wall_index,
                ..
            } => ring_of(surface, ring)
                .is_some_and(|r| wall_index < r.len() && next_wall_index < r.len()),
            EditState::EditCorner {
                ring,
                corner_index,
                prev_index,
                next_index,
            } => ring_of(surface, ring).is_some_and(|r| {
                corner_index < r.len() && prev_index < r.len() && next_index < r.len()
            }),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rect_ring;
    use crate::model::Point;

    fn square() -> Surface {
        Surface::new(
            "s",
            vec![rect_ring(Point::new(0.0, 0.0), Point::new(100.0, 100.0))],
        )
    }

    #[test]
    fn starts_in_add_surface() {
        assert_eq!(EditState::initial().mode(), EditMode::AddSurface);
    }

    #[test]
    fn selecting_a_wall_freezes_axis_flags() {
        let s = square();
        let state = EditState::Default.transition(
            EditEvent::SelectWall(WallRef { ring: 0, index: 3 }),
            &s,
        );
        assert_eq!(
            state,
            EditState::EditWall {
                ring: 0,
                wall_index: 3,
                next_wall_index: 0,
                horizontal: false,
                vertical: true,
            }
        );
        assert_eq!(state.wall_axis(), Some(WallAxis::Vertical));
    }

    #[test]
    fn selecting_a_corner_records_neighbours() {
        let s = square();
        let state = EditState::Default.transition(
            EditEvent::SelectCorner(VertexRef { ring: 0, index: 0 }),
            &s,
        );
        assert_eq!(
            state,
            EditState::EditCorner {
                ring: 0,
                corner_index: 0,
                prev_index: 3,
                next_index: 1,
            }
        );
    }

    #[test]
    fn selection_is_ignored_outside_editable_modes() {
        let s = square();
        let wall = EditEvent::SelectWall(WallRef { ring: 0, index: 0 });
        assert_eq!(EditState::Preview.transition(wall, &s), EditState::Preview);
        assert_eq!(EditState::AddSurface.transition(wall, &s), EditState::AddSurface);
        let bogus = EditEvent::SelectCorner(VertexRef { ring: 4, index: 0 });
        assert_eq!(EditState::Default.transition(bogus, &s), EditState::Default);
    }

    #[test]
    fn empty_click_returns_to_default_only_when_editable() {
        let s = square();
        let editing = EditState::Default.transition(
            EditEvent::SelectCorner(VertexRef { ring: 0, index: 1 }),
            &s,
        );
        assert_eq!(editing.transition(EditEvent::ClickEmpty, &s), EditState::Default);
        assert_eq!(
            EditState::DrawWalls.transition(EditEvent::ClickEmpty, &s),
            EditState::DrawWalls
        );
        assert_eq!(
            EditState::DrawWalls.transition(EditEvent::Cancel, &s),
            EditState::Default
        );
    }

    #[test]
    fn derived_fields_stay_frozen_until_refreshed() {
        let s = square();
        let state = EditState::Default.transition(
            EditEvent::SelectWall(WallRef { ring: 0, index: 0 }),
            &s,
        );
        assert_eq!(state.wall_axis(), Some(WallAxis::Horizontal));

        // tilt the wall: the frozen flags still claim it is horizontal
        let mut tilted = s.clone();
        tilted.rings[0][1] = Point::new(100.0, 30.0);
        assert_eq!(state.wall_axis(), Some(WallAxis::Horizontal));
        assert_eq!(state.refreshed(&tilted).wall_axis(), Some(WallAxis::Oblique));
    }

    #[test]
    fn stale_indices_are_detected() {
        let s = square();
        let state = EditState::Default.transition(
            EditEvent::SelectCorner(VertexRef { ring: 0, index: 3 }),
            &s,
        );
        let tri = Surface::new(
            "s",
            vec![vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)]],
        );
        assert!(state.fits(&s));
        assert!(!state.fits(&tri));
        assert_eq!(state.refreshed(&tri), EditState::Default);
    }
}
