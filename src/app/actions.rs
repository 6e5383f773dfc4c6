use eframe::egui;
use std::path::Path;
use std::sync::Arc;
use surface_tiler::model::{Project, Rgba};
use surface_tiler::persist;
use surface_tiler::raster::{self, RasterJob, RasterOptions, TextureCache};
use surface_tiler::settings;
use tracing::{debug, info, warn};

use super::TilerApp;

impl TilerApp {
    pub(super) fn undo(&mut self) {
        if self.surface.undo() {
            self.status = Some("Undo".to_string());
        }
    }

    pub(super) fn redo(&mut self) {
        if self.surface.redo() {
            self.status = Some("Redo".to_string());
        }
    }

    pub(super) fn current_project(&self) -> Project {
        persist::to_project(self.surface.surface(), self.patterns.pattern(), &self.project)
    }

    pub(super) fn save_to_path(&mut self) {
        let path = self.settings.project_path.clone();
        match persist::save_project(Path::new(&path), &self.current_project()) {
            Ok(()) => self.status = Some(format!("Saved {path}")),
            Err(e) => self.status = Some(format!("Save failed: {e}")),
        }
    }

    pub(super) fn save_project_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name(&self.settings.project_path)
            .add_filter("JSON", &["json"])
            .save_file()
        {
            let path_str = path.display().to_string();
            let project = self.current_project();
            match persist::save_project(&path, &project) {
                Ok(()) => {
                    self.project = project;
                    self.settings.project_path = path_str.clone();
                    self.persist_settings();
                    self.status = Some(format!("Saved {path_str}"));
                }
                Err(e) => self.status = Some(format!("Save failed: {e}")),
            }
        }
    }

    pub(super) fn open_project_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            let path_str = path.display().to_string();
            match persist::read_project(&path) {
                Ok(project) => {
                    self.surface.load(persist::project_surface(&project));
                    self.patterns.load(persist::project_pattern(&project));
                    self.textures = Self::texture_store(&path_str, &project);
                    self.texture_cache = Arc::new(TextureCache::new(self.textures.clone()));
                    self.project = project;
                    self.raster_source = None;
                    self.settings.project_path = path_str.clone();
                    self.persist_settings();
                    self.status = Some(format!("Loaded {path_str}"));
                }
                Err(e) => self.status = Some(format!("Open failed: {e}")),
            }
        }
    }

    /// Register an image as a texture and apply it to the selected tile.
    pub(super) fn import_texture_dialog(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .pick_file()
        else {
            return;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.status = Some(format!("Import failed: {e}"));
                return;
            }
        };
        if let Err(e) = raster::decode_texture(&bytes) {
            self.status = Some(format!("Import failed: {e}"));
            return;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("texture")
            .to_string();
        let stored = path.display().to_string();
        self.project.textures.insert(name.clone(), stored.clone());
        self.textures.index.insert(name.clone(), stored);
        self.texture_cache = Arc::new(TextureCache::new(self.textures.clone()));
        if self.patterns.set_selected_texture(Some(name.clone())) {
            self.status = Some(format!("Applied texture {name}"));
        } else {
            self.status = Some(format!("Imported texture {name}"));
        }
    }

    pub(super) fn persist_settings(&mut self) {
        self.settings.surface_scale = self.surface.scale;
        self.settings.keep_right_angles = self.surface.keep_right_angles;
        if let Err(e) = settings::save_settings(&self.settings_path, &self.settings) {
            self.status = Some(format!("Settings save failed: {e}"));
        }
    }

    pub(super) fn reload_settings(&mut self) {
        let (path, settings) = settings::load_or_default();
        self.surface.scale = settings.surface_scale;
        self.surface.keep_right_angles = settings.keep_right_angles;
        self.settings_path = path;
        self.settings = settings;
        self.raster_source = None;
        self.status = Some("Settings reloaded".to_string());
    }

    pub(super) fn apply_tile_color(&mut self) {
        let color = Rgba::from_color32(self.tile_color);
        self.patterns.recolor_selected(color);
    }

    /// Collect finished rasters and request a new one when the pattern
    /// changed. Nothing is requested while a tile is being dragged; the
    /// release triggers one request for the final pattern.
    pub(super) fn refresh_raster(&mut self, ctx: &egui::Context) {
        let mut landed = false;
        if let Some(worker) = &self.raster_worker {
            while let Some((generation, image)) = worker.try_recv() {
                landed |= self.raster.complete(generation, image);
            }
        }
        if landed {
            self.upload_fill_texture(ctx);
        }

        if self.patterns.active_action().is_some() {
            return;
        }
        let pattern = self.patterns.pattern();
        if self.raster_source.as_ref() == Some(pattern) {
            return;
        }
        let pattern = pattern.clone();
        self.raster_source = Some(pattern.clone());
        let generation = self.raster.request();
        let options = RasterOptions {
            pixels_per_unit: self.settings.raster_pixels_per_unit,
            background: None,
        };

        let job = RasterJob {
            generation,
            pattern,
            options,
            textures: self.texture_cache.clone(),
        };
        if raster::needs_textures(&job.pattern) {
            if let Some(worker) = &self.raster_worker {
                if worker.submit(job) {
                    debug!(generation, "queued textured pattern raster");
                    return;
                }
                warn!(generation, "raster worker gone, painting in place from now on");
                self.raster_worker = None;
                self.raster_source = None;
                return;
            }
        }
        let image = raster::rasterize(&job.pattern, &job.options, job.textures).wait();
        if self.raster.complete(generation, image) {
            self.upload_fill_texture(ctx);
        }
    }

    fn upload_fill_texture(&mut self, ctx: &egui::Context) {
        let Some(image) = self.raster.current() else {
            return;
        };
        let size = [image.width() as usize, image.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
        let options = egui::TextureOptions {
            wrap_mode: egui::TextureWrapMode::Repeat,
            ..egui::TextureOptions::LINEAR
        };
        match &mut self.fill_texture {
            Some(texture) => texture.set(color_image, options),
            None => self.fill_texture = Some(ctx.load_texture("pattern_fill", color_image, options)),
        }
        info!(width = size[0], height = size[1], generation = self.raster.latest(), "pattern raster ready");
    }
}
