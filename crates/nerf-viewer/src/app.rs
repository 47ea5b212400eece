use crate::{
    camera::{Camera, CameraController},
    data::{mesh, texture, types::ModelGpu, upload},
    renderer::{targets::FRAME_COUNT, Renderer},
    ui,
};
use anyhow::Result;
use glam::{Mat4, Vec3};
use nerf_assets::{mlp, PackedMlp, SceneDescriptor};
use std::{path::PathBuf, sync::Arc, time::Instant};
use winit::{event::WindowEvent, window::Window};

/// Fixed placements for the 4-part composite scene.
const COMBO_TRANSLATIONS: [[f32; 3]; 4] = [
    [0.5, 0.75, 0.0],
    [0.5, 0.25, 0.0],
    [0.0, -0.25, 0.5],
    [0.0, -0.75, -0.5],
];

/// Turntable speed when the scene's rotation flag is set (rad/s).
const ROTATION_RATE: f32 = 0.5;

pub struct App {
    pub renderer: Renderer,
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,

    pub scene: SceneDescriptor,
    rotation: bool,

    models: Vec<ModelGpu>,
    /// One camera/transform uniform buffer per logical model.
    uniform_buffers: Vec<wgpu::Buffer>,
    /// One MLP weight buffer per logical model, shared by its sub-models.
    weights_buffers: Vec<wgpu::Buffer>,
    packed_weights: Vec<PackedMlp>,

    instance_buffer: wgpu::Buffer,
    instance_count: u32,

    frame_counter: u64,
    last_frame: Instant,
}

impl App {
    pub async fn new(
        window: Arc<Window>,
        scene: SceneDescriptor,
        assets_root: PathBuf,
    ) -> Result<Self> {
        let mut renderer = Renderer::new(window.clone(), &scene).await?;
        let device = &renderer.gfx.device;
        let queue = &renderer.gfx.queue;

        // Load and pack the MLP for each logical model before any mesh
        // work; the weight file also tells us the sub-model count.
        let mut packed_weights = Vec::with_capacity(scene.model_paths.len());
        let mut sub_model_counts = Vec::with_capacity(scene.model_paths.len());
        for path in &scene.model_paths {
            let weight_file = mlp::MlpWeightFile::from_file(assets_root.join(path).join("mlp.json"))?;
            sub_model_counts.push(weight_file.obj_num.max(1));
            packed_weights.push(mlp::pack(&weight_file));
        }

        let uniform_buffers: Vec<wgpu::Buffer> = (0..scene.model_paths.len())
            .map(|i| {
                log::info!("Creating camera uniform buffer for model {}", i);
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Global Uniform"),
                    size: std::mem::size_of::<crate::data::types::GlobalUniformStd140>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
        let weights_buffers: Vec<wgpu::Buffer> = (0..scene.model_paths.len())
            .map(|i| {
                log::info!("Creating MLP weight buffer for model {}", i);
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("MLP Weights"),
                    size: std::mem::size_of::<PackedMlp>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let offsets = scene.grid.offsets();
        let instance_buffer = upload::upload_instances(device, queue, &offsets);
        let instance_count = scene.grid.count();
        log::info!("Instancing {} grid cells", instance_count);

        let mut models = Vec::new();
        for (model_index, path) in scene.model_paths.iter().enumerate() {
            let model_dir = assets_root.join(path);
            let original = scene.original_format[model_index];
            let sub_model_num = sub_model_counts[model_index];

            for sub in 0..sub_model_num {
                let mesh_data = mesh::load_sub_model(&model_dir, sub, original)?;
                let vertex_buffer = upload::upload_vertices(device, queue, &mesh_data.vertices);
                let index_buffer = upload::upload_indices(device, queue, &mesh_data.triangles);

                let feature_0 = texture::load_feature_texture(
                    device,
                    queue,
                    &model_dir.join(format!("shape{}.pngfeat0.png", sub)),
                    original,
                )?;
                let feature_1 = texture::load_feature_texture(
                    device,
                    queue,
                    &model_dir.join(format!("shape{}.pngfeat1.png", sub)),
                    original,
                )?;

                let bind_groups = renderer.geometry.bind_model(
                    device,
                    &feature_0,
                    &feature_1,
                    &uniform_buffers[model_index],
                    &weights_buffers[model_index],
                    FRAME_COUNT,
                );

                models.push(ModelGpu {
                    model_index,
                    sub_model_num,
                    index_count: mesh_data.index_count(),
                    vertex_buffer,
                    index_buffer,
                    feature_0,
                    feature_1,
                    bind_groups,
                });
            }
        }

        // The evaluation pass reads the first logical model's MLP.
        if let Some(eval) = renderer.eval.as_mut() {
            eval.rebind(&renderer.gfx.device, &renderer.targets, &weights_buffers[0]);
        }

        let size = renderer.gfx.size;
        let camera = Camera::from_scene(
            scene.camera_position,
            size.width as f32 / size.height.max(1) as f32,
        );

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        let rotation = scene.rotation;

        Ok(Self {
            renderer,
            camera,
            camera_controller: CameraController::new(),
            egui_ctx,
            egui_state,
            scene,
            rotation,
            models,
            uniform_buffers,
            weights_buffers,
            packed_weights,
            instance_buffer,
            instance_count,
            frame_counter: 0,
            last_frame: Instant::now(),
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size, self.weights_buffers.first());
            self.camera
                .set_aspect(new_size.width as f32 / new_size.height as f32);
        }
    }

    /// Returns true when the event was consumed by the UI layer.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        self.camera_controller.handle_event(event, &mut self.camera);

        if let WindowEvent::Resized(physical_size) = event {
            self.resize(*physical_size);
        }

        false
    }

    fn model_matrix(&self, model_index: usize) -> Mat4 {
        if self.scene.combo {
            let t = COMBO_TRANSLATIONS
                .get(model_index)
                .copied()
                .unwrap_or([0.0; 3]);
            Mat4::from_translation(Vec3::from(t))
        } else {
            Mat4::IDENTITY
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.rotation {
            self.camera.orbit(ROTATION_RATE * dt);
        }

        let viewport_size = match self.scene.fixed_viewport {
            Some([w, h]) => [w as f32, h as f32],
            None => [
                self.renderer.gfx.size.width as f32,
                self.renderer.gfx.size.height as f32,
            ],
        };

        // Per-frame uniform update for every logical model; the weight
        // contents never change after load but are rewritten defensively.
        for i in 0..self.uniform_buffers.len() {
            let uniform = self
                .camera
                .make_global_uniform(self.model_matrix(i), viewport_size);
            self.renderer.gfx.queue.write_buffer(
                &self.uniform_buffers[i],
                0,
                bytemuck::bytes_of(&uniform),
            );
            self.renderer.gfx.queue.write_buffer(
                &self.weights_buffers[i],
                0,
                bytemuck::bytes_of(&self.packed_weights[i]),
            );
        }

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame_slot = self.frame_counter as usize % FRAME_COUNT;
        self.renderer.render(
            &swap_view,
            &self.models,
            &self.instance_buffer,
            self.instance_count,
            frame_slot,
        );

        // UI overlay pass, loading (not clearing) the rendered image.
        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        ui::draw_hud(
            &self.egui_ctx,
            ui::HudStats {
                scene_name: &self.scene.name,
                deferred: self.scene.deferred,
                model_count: self.models.len(),
                instance_count: self.instance_count,
                rotation: &mut self.rotation,
            },
        );

        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        self.frame_counter += 1;
        Ok(())
    }
}
