mod app;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "surface_tiler=info".into()))
        .init();

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Surface Tiler",
        native_options,
        Box::new(|cc| Ok(Box::new(app::TilerApp::new(cc)))),
    )
}
