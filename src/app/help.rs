use eframe::egui;

pub(super) fn draw_help_window(ctx: &egui::Context, open: &mut bool) {
    egui::Window::new("Help")
        .open(open)
        .resizable(true)
        .default_width(520.0)
        .default_height(440.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Keyboard Shortcuts");
                ui.separator();
                help_row(ui, "⌘S", "Save project");
                help_row(ui, "⌘O", "Open project");
                help_row(ui, "⌘Z", "Undo surface edit");
                help_row(ui, "⌘⇧Z / ⌘Y", "Redo surface edit");
                help_row(ui, "Escape", "Cancel gesture / back to Default");
                help_row(ui, "Delete", "Remove selected corner");
                help_row(ui, "F1", "This window");

                ui.add_space(10.0);
                ui.heading("Surface");
                ui.separator();
                help_row(ui, "Default", "Drag corners and walls; click to select");
                help_row(ui, "Preview", "Drag anywhere to pan");
                help_row(ui, "Add", "Drag a rectangle to merge into the surface");
                help_row(ui, "Subtract", "Drag a rectangle to cut out of the surface");
                help_row(ui, "Draw walls", "Click corners; click the first one to close");
                ui.label("With 'Keep right angles', square corners stay square when a wall length is typed in.");
                ui.label("Enter a wall length in metres with a wall selected.");

                ui.add_space(10.0);
                ui.heading("Pattern");
                ui.separator();
                help_row(ui, "Drag tile", "Move; snaps to neighbours and the cell border");
                help_row(ui, "Round handle", "Rotate about the tile pivot");
                help_row(ui, "Square handles", "Stretch rectangles, scale other tiles");
                help_row(ui, "Scroll wheel", "Zoom either canvas");
                help_row(ui, "Middle drag", "Pan either canvas");

                ui.add_space(10.0);
                ui.heading("Files");
                ui.separator();
                ui.label("• Projects are JSON; texture paths are relative to the project file");
                ui.label("• Settings live in ~/.config/surface-tiler.toml or settings.toml");
            });
        });
}

fn help_row(ui: &mut egui::Ui, shortcut: &str, description: &str) {
    ui.horizontal(|ui| {
        ui.add_sized(
            [110.0, 16.0],
            egui::Label::new(egui::RichText::new(shortcut).monospace().strong()),
        );
        ui.label(description);
    });
}
