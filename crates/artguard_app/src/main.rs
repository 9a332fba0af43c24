mod app;

use eframe::NativeOptions;

fn main() {
    tracing_subscriber::fmt::init();
    tracing::info!("ArtGuardian {}", env!("ARTGUARD_VERSION"));
    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "ArtGuardian",
        options,
        Box::new(|_cc| Ok(Box::new(app::UiApp::new()?))),
    ) {
        tracing::error!("application stopped with error: {e}");
        eprintln!("Application stopped with error: {e}");
    }
}
