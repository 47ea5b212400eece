//! HUD overlay drawn on top of the rendered frame.

pub struct HudStats<'a> {
    pub scene_name: &'a str,
    pub deferred: bool,
    pub model_count: usize,
    pub instance_count: u32,
    pub rotation: &'a mut bool,
}

pub fn draw_hud(ctx: &egui::Context, stats: HudStats) {
    egui::Window::new("NeRF")
        .resizable(false)
        .default_width(180.0)
        .show(ctx, |ui| {
            ui.label(format!("Scene: {}", stats.scene_name));
            ui.label(format!(
                "Pipeline: {}",
                if stats.deferred { "deferred" } else { "forward" }
            ));
            ui.label(format!("Meshes: {}", stats.model_count));
            ui.label(format!("Instances: {}", stats.instance_count));
            ui.checkbox(stats.rotation, "Rotate");
        });
}
