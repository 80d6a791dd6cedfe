use std::time::{Duration, Instant};

use eframe::{egui, App};
use countdown_core::{Action, AppSettings, Coordinator, CountdownError, TimerQueue};
use tracing::error;

pub struct Toast { pub msg: String, pub color: egui::Color32, pub until: Instant }

pub struct CountdownApp {
	pub settings: AppSettings,
	pub coordinator: Coordinator,
	pub timers: TimerQueue,
	pub toasts: Vec<Toast>,
}

impl CountdownApp {
	pub fn new(settings: AppSettings) -> Self {
		let coordinator = Coordinator::new(settings.coordinator_config());
		Self { settings, coordinator, timers: TimerQueue::new(), toasts: Vec::new() }
	}

	pub fn add_toast(&mut self, msg: &str, color: egui::Color32) { self.toasts.push(Toast { msg: msg.to_string(), color, until: Instant::now() + Duration::from_secs(4) }); }

	pub fn start_countdown(&mut self) {
		if let Err(e) = self.coordinator.start_countdown(&mut self.timers) { self.report(e); }
	}

	/// Runs every timer callback whose deadline has passed.
	pub fn fire_due(&mut self, now: Instant) {
		for action in self.timers.take_due(now) {
			match action {
				Action::Poll => { if let Err(e) = self.coordinator.poll_tick(&mut self.timers) { self.report(e); } }
				Action::ClearLabel => self.coordinator.clear_label(),
			}
		}
	}

	pub fn on_close(&mut self) {
		self.coordinator.shutdown();
		self.timers.clear();
	}

	fn report(&mut self, e: CountdownError) {
		error!("countdown: {}", e);
		self.add_toast(&format!("Countdown failed: {e}"), egui::Color32::RED);
	}

	fn draw_toasts(&mut self, ctx: &egui::Context) {
		let now = Instant::now();
		self.toasts.retain(|t| t.until > now);
		let mut y = 12.0;
		for (i, t) in self.toasts.iter().enumerate() {
			egui::Area::new(egui::Id::new(format!("toast-{i}"))).fixed_pos(egui::pos2(12.0, y)).show(ctx, |ui| { ui.colored_label(t.color, &t.msg); });
			y += 22.0;
		}
		if let Some(next) = self.toasts.iter().map(|t| t.until).min() { ctx.request_repaint_after(next.saturating_duration_since(now)); }
	}
}

impl App for CountdownApp {
	fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
		if ctx.input(|i| i.viewport().close_requested()) {
			self.on_close();
			return;
		}
		let now = Instant::now();
		self.fire_due(now);

		egui::CentralPanel::default().show(ctx, |ui| {
			crate::ui::countdown::render_countdown_panel(self, ui);
		});
		self.draw_toasts(ctx);

		// Timers only fire when a frame runs, so ask for one at the next deadline.
		if let Some(deadline) = self.timers.next_deadline() {
			ctx.request_repaint_after(deadline.saturating_duration_since(Instant::now()));
		}
	}
}

impl Drop for CountdownApp {
	fn drop(&mut self) { self.on_close(); }
}
