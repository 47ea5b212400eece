//! The rendering orchestrator. Owns the GPU context, the render mode and
//! its pass topology, the intermediate targets, and the per-pass
//! pipelines; records the per-frame command sequence.

pub mod context;
pub mod mode;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    mode::{PassPlan, RenderMode},
    pipelines::{evaluate::EvalPipeline, geometry::GeometryPipeline},
    targets::{Targets, DEPTH_FORMAT},
};
use crate::data::types::ModelGpu;
use anyhow::Result;
use nerf_assets::SceneDescriptor;
use std::sync::Arc;
use winit::window::Window;

/// Clear color of the feature attachments (deferred geometry pass).
const FEATURE_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.025,
    g: 0.025,
    b: 0.025,
    a: 0.5,
};

pub struct Renderer {
    pub gfx: GfxContext,
    pub mode: RenderMode,
    /// The attachment/subpass/dependency topology the passes below realize.
    pub plan: PassPlan,
    pub targets: Targets,
    pub geometry: GeometryPipeline,
    /// Present in deferred mode only.
    pub eval: Option<EvalPipeline>,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &SceneDescriptor) -> Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let mode = RenderMode::from_flag(scene.deferred);

        let plan = mode.pass_plan(scene.texture_quality, DEPTH_FORMAT, gfx.config.format);
        log::info!(
            "Render pass topology: {} attachments, {} subpasses ({:?})",
            plan.attachments.len(),
            plan.subpasses.len(),
            mode
        );

        let targets = Targets::new(&gfx.device, gfx.size, mode, scene.texture_quality);
        let geometry =
            GeometryPipeline::new(&gfx.device, mode, scene.texture_quality, gfx.config.format);
        let eval = match mode {
            RenderMode::Forward => None,
            RenderMode::Deferred => Some(EvalPipeline::new(&gfx.device, gfx.config.format)),
        };

        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            mode,
            plan,
            targets,
            geometry,
            eval,
            egui_renderer,
        })
    }

    /// Reconfigure the surface and rebuild every extent-tracking resource.
    /// `shared_weights` is the evaluation pass's MLP buffer; it must be
    /// supplied in deferred mode so the per-frame bind groups can be
    /// rebuilt against the new attachments.
    pub fn resize(
        &mut self,
        new_size: winit::dpi::PhysicalSize<u32>,
        shared_weights: Option<&wgpu::Buffer>,
    ) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
            if let (Some(eval), Some(weights)) = (self.eval.as_mut(), shared_weights) {
                eval.rebind(&self.gfx.device, &self.targets, weights);
            }
        }
    }

    /// Record and submit one frame: geometry subpass, then (deferred) the
    /// full-screen evaluation subpass. The UI pass is recorded separately
    /// by the caller so it can overlay the presented image.
    pub fn render(
        &mut self,
        swap_view: &wgpu::TextureView,
        models: &[ModelGpu],
        instance_buffer: &wgpu::Buffer,
        instance_count: u32,
        frame_slot: usize,
    ) {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        match self.mode {
            RenderMode::Forward => {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Merged NeRF Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: swap_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.targets.depth,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                for model in models {
                    self.geometry
                        .draw(&mut pass, model, instance_buffer, instance_count, frame_slot);
                }
            }
            RenderMode::Deferred => {
                let frame = &self.targets.frames[frame_slot];

                // Subpass 0: fill the feature attachments.
                {
                    fn color_attachment(
                        view: &wgpu::TextureView,
                    ) -> Option<wgpu::RenderPassColorAttachment<'_>> {
                        Some(wgpu::RenderPassColorAttachment {
                            view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(FEATURE_CLEAR),
                                store: wgpu::StoreOp::Store,
                            },
                        })
                    }

                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Geometry Pass"),
                        color_attachments: &[
                            color_attachment(&frame.feature_0),
                            color_attachment(&frame.feature_1),
                            color_attachment(&frame.ray_data),
                        ],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &self.targets.depth,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    for model in models {
                        self.geometry.draw(
                            &mut pass,
                            model,
                            instance_buffer,
                            instance_count,
                            frame_slot,
                        );
                    }
                }

                // Subpass 1: full-screen MLP evaluation into the swapchain.
                // The attachment-write to input-read dependency is enforced
                // by wgpu's usage tracking between the two passes.
                if let Some(eval) = &self.eval {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("MLP Evaluation Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: swap_view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });

                    eval.draw(&mut pass, frame_slot);
                }
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
