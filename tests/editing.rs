use approx::assert_abs_diff_eq;
use std::sync::Arc;
use surface_tiler::edit_state::EditMode;
use surface_tiler::history::History;
use surface_tiler::model::{Point, Surface};
use surface_tiler::pattern::default_pattern;
use surface_tiler::persist;
use surface_tiler::raster::{MemoryTextures, Raster, RasterOptions, TextureCache, rasterize};
use surface_tiler::session::SurfaceEditor;

fn drag(editor: &mut SurfaceEditor, from: Point, to: Point) {
    editor.pointer_down(from, 8.0);
    editor.pointer_move(Point::new((from.x + to.x) * 0.5, (from.y + to.y) * 0.5));
    editor.pointer_up(to);
}

fn room() -> SurfaceEditor {
    let mut editor = SurfaceEditor::new(Surface::empty("room"));
    drag(&mut editor, Point::new(0.0, 0.0), Point::new(200.0, 100.0));
    editor
}

#[test]
fn first_rectangle_becomes_the_surface() {
    let editor = room();
    assert_eq!(
        editor.rings(),
        &[vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 100.0),
            Point::new(0.0, 100.0),
        ]]
    );
    assert_abs_diff_eq!(editor.area(), 2.0, epsilon = 1e-9);
    assert_eq!(editor.history().past_len(), 1);
}

#[test]
fn subtracting_outside_the_surface_changes_nothing() {
    let mut editor = room();
    let before = editor.surface().clone();
    editor.set_mode(EditMode::SubtractSurface);
    drag(&mut editor, Point::new(500.0, 500.0), Point::new(600.0, 600.0));
    assert_eq!(*editor.surface(), before);
    assert_eq!(editor.history().past_len(), 1);
}

#[test]
fn subtracting_a_corner_notch() {
    let mut editor = room();
    editor.set_mode(EditMode::SubtractSurface);
    drag(&mut editor, Point::new(150.0, -10.0), Point::new(250.0, 50.0));
    assert!(!editor.contains(Point::new(175.0, 25.0)));
    assert!(editor.contains(Point::new(50.0, 50.0)));
    assert!(editor.contains(Point::new(175.0, 75.0)));
    assert_abs_diff_eq!(editor.area(), 1.75, epsilon = 1e-6);
}

#[test]
fn each_gesture_is_one_undo_step() {
    let mut editor = room();
    editor.set_mode(EditMode::Default);
    editor.pointer_down(Point::new(200.0, 100.0), 8.0);
    for step in 1..=10 {
        editor.pointer_move(Point::new(200.0 + step as f64, 100.0 + step as f64));
    }
    editor.pointer_up(Point::new(210.0, 110.0));
    assert_eq!(editor.history().past_len(), 2);

    assert!(editor.undo());
    assert_eq!(editor.rings()[0][2], Point::new(200.0, 100.0));
    assert!(editor.undo());
    assert!(editor.surface().is_empty());
    assert!(!editor.undo());
    assert!(editor.redo());
    assert_eq!(editor.rings()[0][2], Point::new(200.0, 100.0));
}

#[test]
fn history_drops_future_on_new_edit() {
    let mut history = History::new(0);
    history.set(1, false);
    history.set(2, false);
    assert!(history.undo());
    assert_eq!(*history.present(), 1);
    history.set(3, false);
    assert!(!history.can_redo());
    assert!(history.undo());
    assert_eq!(*history.present(), 1);

    // transient values stay out of the timeline
    history.set(7, true);
    assert_eq!(history.past_len(), 1);
    assert!(history.undo());
    assert_eq!(*history.present(), 0);
}

#[test]
fn skipped_set_folds_into_previous_step() {
    let mut history = History::new("s0");
    history.set("s1", false);
    history.set("s2", true);
    assert!(history.undo());
    assert_eq!(*history.present(), "s0");
    assert!(history.redo());
    assert_eq!(*history.present(), "s2");
}

#[test]
fn project_survives_save_and_load() {
    let editor = room();
    let pattern = default_pattern();
    let project = persist::to_project(editor.surface(), &pattern, &Default::default());
    let path = std::env::temp_dir().join(format!("surface-tiler-editing-{}.json", std::process::id()));
    persist::save_project(&path, &project).unwrap();

    let back = persist::load_project(&path);
    std::fs::remove_file(&path).ok();
    let reopened = SurfaceEditor::new(persist::project_surface(&back));
    assert_eq!(reopened.surface(), editor.surface());
    assert_eq!(reopened.state().mode(), EditMode::Default);
    assert_eq!(persist::project_pattern(&back), pattern);
}

#[test]
fn flat_pattern_rasterizes_immediately() {
    let pattern = default_pattern();
    let options = RasterOptions {
        pixels_per_unit: 1.0,
        background: None,
    };
    let Raster::Ready(image) = rasterize(&pattern, &options, Arc::new(TextureCache::new(MemoryTextures::new()))) else {
        panic!("flat pattern should not need textures");
    };
    assert_eq!(image.dimensions(), (400, 400));
    assert_eq!(image.get_pixel(100, 100).0, [214, 196, 170, 255]);
    assert_eq!(image.get_pixel(200, 200).0, [120, 120, 120, 255]);
}
