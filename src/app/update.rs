use eframe::egui;
use surface_tiler::edit_state::EditMode;
use surface_tiler::model::{Rgba, TileKind};

use super::TilerApp;
use super::render::{color_row, mode_button};

const MODES: [EditMode; 5] = [
    EditMode::Default,
    EditMode::Preview,
    EditMode::AddSurface,
    EditMode::SubtractSurface,
    EditMode::DrawWalls,
];

const TILE_KINDS: [TileKind; 5] = [
    TileKind::Rectangle,
    TileKind::Triangle,
    TileKind::Hexagon,
    TileKind::Octagon,
    TileKind::Polygon,
];

impl eframe::App for TilerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let wants_keyboard = ctx.wants_keyboard_input();
        ctx.input_mut(|i| {
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::S) {
                self.save_to_path();
            }
            if i.consume_key(egui::Modifiers::COMMAND, egui::Key::O) {
                self.open_project_dialog();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::F1) {
                self.show_help = true;
            }
            if wants_keyboard {
                return;
            }
            if i.consume_key(
                egui::Modifiers::COMMAND | egui::Modifiers::SHIFT,
                egui::Key::Z,
            ) || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
            {
                self.redo();
                self.sync_wall_length_input();
            } else if i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z) {
                self.undo();
                self.sync_wall_length_input();
            }
            if i.consume_key(egui::Modifiers::NONE, egui::Key::Escape) {
                self.surface.cancel();
                self.sync_wall_length_input();
            }
            if (i.consume_key(egui::Modifiers::NONE, egui::Key::Delete)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Backspace))
                && self.surface.remove_selected_corner()
            {
                self.status = Some("Corner removed".to_string());
            }
        });

        self.refresh_raster(ctx);

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open... (⌘O)").clicked() {
                        self.open_project_dialog();
                        ui.close_menu();
                    }
                    if ui.button("Save (⌘S)").clicked() {
                        self.save_to_path();
                        ui.close_menu();
                    }
                    if ui.button("Save As...").clicked() {
                        self.save_project_dialog();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Import texture...").clicked() {
                        self.import_texture_dialog();
                        ui.close_menu();
                    }
                    if ui.button("Reload settings").clicked() {
                        self.reload_settings();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.small("Project path:");
                    if ui.text_edit_singleline(&mut self.settings.project_path).lost_focus() {
                        self.persist_settings();
                    }
                });
                ui.menu_button("Edit", |ui| {
                    if ui
                        .add_enabled(self.surface.history().can_undo(), egui::Button::new("Undo (⌘Z)"))
                        .clicked()
                    {
                        self.undo();
                        self.sync_wall_length_input();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(self.surface.history().can_redo(), egui::Button::new("Redo (⌘⇧Z)"))
                        .clicked()
                    {
                        self.redo();
                        self.sync_wall_length_input();
                        ui.close_menu();
                    }
                });
                if ui.button("Help").clicked() {
                    self.show_help = true;
                }
                ui.separator();

                let current = self.surface.state().mode();
                for mode in MODES {
                    if mode_button(ui, mode, current) {
                        self.surface.set_mode(mode);
                        self.sync_wall_length_input();
                    }
                }
                ui.separator();
                ui.label(current.label());
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status);
                }
            });
        });

        egui::SidePanel::right("right_panel")
            .resizable(true)
            .min_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.surface_panel(ui);
                    ui.add_space(12.0);
                    self.pattern_panel(ui, ctx);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.surface_canvas(ui, ctx);
        });

        super::help::draw_help_window(ctx, &mut self.show_help);
    }
}

impl TilerApp {
    fn surface_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Surface");
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Metres per unit");
            if ui
                .add(
                    egui::DragValue::new(&mut self.surface.scale)
                        .range(0.0001..=10.0)
                        .speed(0.001),
                )
                .changed()
            {
                self.persist_settings();
            }
        });
        if ui
            .checkbox(&mut self.surface.keep_right_angles, "Keep right angles")
            .changed()
        {
            self.persist_settings();
        }
        ui.horizontal(|ui| {
            let mut changed = ui.checkbox(&mut self.settings.show_angles, "Angles").changed();
            changed |= ui.checkbox(&mut self.settings.show_lengths, "Lengths").changed();
            if changed {
                self.persist_settings();
            }
        });
        ui.label(format!("Area: {:.2} m²", self.surface.area()));

        if self.surface.state().selected_wall().is_some() {
            ui.separator();
            ui.label("Wall length (m)");
            let response = ui.text_edit_singleline(&mut self.wall_length_input);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                match self.wall_length_input.trim().parse::<f64>() {
                    Ok(length) if self.surface.set_selected_wall_length(length) => {
                        self.status = Some(format!("Wall set to {length:.2} m"));
                    }
                    Ok(_) => self.status = Some("Wall length rejected".to_string()),
                    Err(_) => self.status = Some("Wall length must be a number".to_string()),
                }
                self.sync_wall_length_input();
            }
        }

        if self.surface.state().selected_corner().is_some() {
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Square corner").clicked() && !self.surface.square_selected_corner() {
                    self.status = Some("Corner cannot be squared".to_string());
                }
                if ui.button("Remove corner").clicked() && !self.surface.remove_selected_corner() {
                    self.status = Some("Corner cannot be removed".to_string());
                }
            });
        }
    }

    fn pattern_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.heading("Pattern");
        ui.separator();
        self.pattern_canvas(ui, ctx);

        ui.horizontal_wrapped(|ui| {
            for kind in TILE_KINDS {
                if ui.small_button(kind.label()).clicked() {
                    self.patterns
                        .add_tile(kind, Rgba::from_color32(self.tile_color));
                }
            }
        });

        let has_selection = self.patterns.selected().is_some();
        ui.add_enabled_ui(has_selection, |ui| {
            ui.label("Tile color");
            if color_row(ui, &mut self.tile_color) {
                self.apply_tile_color();
            }
            ui.horizontal(|ui| {
                if ui.button("Texture...").clicked() {
                    self.import_texture_dialog();
                }
                if ui.button("Clear texture").clicked() {
                    self.patterns.set_selected_texture(None);
                }
                if ui.button("Remove tile").clicked() {
                    self.patterns.remove_selected();
                }
            });
        });

        ui.separator();
        let pattern = self.patterns.pattern();
        let (mut width, mut height, mut gap) = (pattern.width, pattern.height, pattern.tiles_gap);
        let mut gap_color = pattern.gap_color.to_color32();
        let (metric_w, metric_h) = pattern.metric_size();
        ui.label(format!("Cell: {metric_w:.2} × {metric_h:.2} m"));
        egui::Grid::new("pattern_size").num_columns(2).show(ui, |ui| {
            ui.label("Width");
            let w = ui.add(egui::DragValue::new(&mut width).range(1.0..=10000.0).speed(1.0));
            ui.end_row();
            ui.label("Height");
            let h = ui.add(egui::DragValue::new(&mut height).range(1.0..=10000.0).speed(1.0));
            ui.end_row();
            if w.changed() || h.changed() {
                self.patterns.resize(width, height);
            }
            ui.label("Gap");
            if ui
                .add(egui::DragValue::new(&mut gap).range(0.0..=200.0).speed(0.5))
                .changed()
            {
                self.patterns.set_gap(gap);
            }
            ui.end_row();
            ui.label("Gap color");
            if ui.color_edit_button_srgba(&mut gap_color).changed() {
                self.patterns.set_gap_color(Rgba::from_color32(gap_color));
            }
            ui.end_row();
        });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.patterns.history().can_undo(), egui::Button::new("Undo pattern"))
                .clicked()
            {
                self.patterns.undo();
            }
            if ui
                .add_enabled(self.patterns.history().can_redo(), egui::Button::new("Redo pattern"))
                .clicked()
            {
                self.patterns.redo();
            }
        });
    }
}
