use eframe::egui;

pub fn render_countdown_panel(app: &mut crate::app::CountdownApp, ui: &mut egui::Ui) {
	ui.vertical_centered(|ui| {
		ui.label(&app.settings.greeting);
		// One countdown at a time.
		let busy = app.coordinator.is_busy();
		if ui.add_enabled(!busy, egui::Button::new("Click me")).clicked() {
			app.start_countdown();
		}
		ui.label(app.coordinator.label());
	});
}
