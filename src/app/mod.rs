use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use surface_tiler::model::{Pattern, Point, Project};
use surface_tiler::raster::{FileTextures, RasterSlot, RasterWorker, TextureCache};
use surface_tiler::session::{PatternEditor, SurfaceEditor};
use surface_tiler::settings::{self, Settings};
use surface_tiler::persist;
use tracing::warn;

mod actions;
mod help;
mod interaction;
mod render;
mod update;

#[derive(Clone, Copy, Debug)]
struct View {
    pan_screen: egui::Vec2,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            pan_screen: egui::vec2(40.0, 40.0),
            zoom: 1.0,
        }
    }
}

impl View {
    fn world_to_screen(&self, origin: egui::Pos2, world: Point) -> egui::Pos2 {
        origin + self.pan_screen + world.to_pos2().to_vec2() * self.zoom
    }

    fn screen_to_world(&self, origin: egui::Pos2, screen: egui::Pos2) -> Point {
        Point::from_pos2(((screen - origin - self.pan_screen) / self.zoom).to_pos2())
    }

    fn zoom_about_screen_point(
        &mut self,
        origin: egui::Pos2,
        screen_point: egui::Pos2,
        zoom_delta: f32,
    ) {
        let before = self.screen_to_world(origin, screen_point);
        self.zoom = (self.zoom * zoom_delta).clamp(0.1, 8.0);
        let after_screen = self.world_to_screen(origin, before);
        self.pan_screen += screen_point - after_screen;
    }
}

pub struct TilerApp {
    surface: SurfaceEditor,
    patterns: PatternEditor,
    project: Project,
    view: View,
    pattern_view: View,
    settings: Settings,
    settings_path: PathBuf,
    status: Option<String>,
    wall_length_input: String,
    tile_color: egui::Color32,
    raster: RasterSlot,
    raster_source: Option<Pattern>,
    raster_worker: Option<RasterWorker>,
    fill_texture: Option<egui::TextureHandle>,
    textures: FileTextures,
    texture_cache: Arc<TextureCache>,
    show_help: bool,
}

impl TilerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let (settings_path, settings) = settings::load_or_default();
        let project = persist::load_project(std::path::Path::new(&settings.project_path));
        let mut surface = SurfaceEditor::new(persist::project_surface(&project))
            .with_history_limit(settings.history_limit);
        surface.scale = settings.surface_scale;
        surface.keep_right_angles = settings.keep_right_angles;
        let patterns = PatternEditor::new(persist::project_pattern(&project));
        let textures = Self::texture_store(&settings.project_path, &project);
        let texture_cache = Arc::new(TextureCache::new(textures.clone()));
        let ctx = cc.egui_ctx.clone();
        let raster_worker = match RasterWorker::spawn(move || ctx.request_repaint()) {
            Ok(worker) => Some(worker),
            Err(e) => {
                warn!(error = %e, "no raster worker, textured patterns paint in place");
                None
            }
        };

        Self {
            surface,
            patterns,
            project,
            view: View::default(),
            pattern_view: View {
                pan_screen: egui::vec2(8.0, 24.0),
                zoom: 0.5,
            },
            settings,
            settings_path,
            status: None,
            wall_length_input: String::new(),
            tile_color: egui::Color32::from_rgb(200, 180, 150),
            raster: RasterSlot::default(),
            raster_source: None,
            raster_worker,
            fill_texture: None,
            textures,
            texture_cache,
            show_help: false,
        }
    }

    /// Texture paths in a project are relative to the project file.
    fn texture_store(project_path: &str, project: &Project) -> FileTextures {
        let root = std::path::Path::new(project_path)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        FileTextures {
            root,
            index: project.textures.clone(),
        }
    }
}
