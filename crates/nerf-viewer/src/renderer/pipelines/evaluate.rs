//! Full-screen MLP evaluation pass (deferred mode, subpass 1).
//!
//! Reads the three geometry-pass attachments at the fragment's own pixel
//! (no sampler, `textureLoad` only) and the shared MLP weight buffer, and
//! writes final color to the swapchain. One bind group per frame
//! attachment set; rebuilt whenever the attachments are.

use crate::renderer::targets::Targets;
use nerf_assets::PackedMlp;

/// Full-screen triangle vertices.
const FS_TRI: [[f32; 2]; 3] = [
    [-1.0, -1.0],
    [3.0, -1.0],
    [-1.0, 3.0],
];

pub struct EvalPipeline {
    pub pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    fs_vbo: wgpu::Buffer,
    /// One bind group per frame attachment set.
    pub frame_binds: Vec<wgpu::BindGroup>,
}

impl EvalPipeline {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        use wgpu::util::DeviceExt;

        let input_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Evaluation Layout"),
            entries: &[
                input_entry(0),
                input_entry(1),
                input_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<PackedMlp>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/eval.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/eval.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Evaluation PipelineLayout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Evaluation Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        shader_location: 0,
                        offset: 0,
                        format: wgpu::VertexFormat::Float32x2,
                    }],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            // The evaluation pass neither tests nor writes depth.
            depth_stencil: None,
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let fs_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Evaluation FS VBO"),
            contents: bytemuck::cast_slice(&FS_TRI),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            pipeline,
            layout,
            fs_vbo,
            frame_binds: Vec::new(),
        }
    }

    /// (Re)create the per-frame bind groups against the current attachment
    /// sets. Must run at startup and after every resize.
    pub fn rebind(
        &mut self,
        device: &wgpu::Device,
        targets: &Targets,
        weights_buffer: &wgpu::Buffer,
    ) {
        self.frame_binds = targets
            .frames
            .iter()
            .map(|frame| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Evaluation Bind"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&frame.feature_0),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&frame.feature_1),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&frame.ray_data),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: weights_buffer.as_entire_binding(),
                        },
                    ],
                })
            })
            .collect();
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame_slot: usize) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.frame_binds[frame_slot], &[]);
        rpass.set_vertex_buffer(0, self.fs_vbo.slice(..));
        rpass.draw(0..3, 0..1);
    }
}
