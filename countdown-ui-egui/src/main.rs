#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

mod app;
mod ui;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
	countdown_core::init_logging("logs");
	let store = countdown_core::SettingsStore::new()?;
	let settings = store.load().context("loading settings")?;
	tracing::info!("settings loaded from {}", store.path().display());
	let mut viewport = egui::ViewportBuilder::default().with_title("Countdown");
	if let (Some(w), Some(h)) = (settings.window_width, settings.window_height) {
		viewport = viewport.with_inner_size([w as f32, h as f32]);
	}
	let native_options = eframe::NativeOptions { viewport, ..Default::default() };
	eframe::run_native(
		"Countdown",
		native_options,
		Box::new(move |_cc| Ok(Box::new(app::CountdownApp::new(settings)))),
	).map_err(|e| anyhow::anyhow!("failed to run window: {e}"))?;
	Ok(())
}
