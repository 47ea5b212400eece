//! Geometry-pass pipeline, shared by both rendering modes.
//!
//! Rasterizes each model's learned mesh with grid instancing. In deferred
//! mode the fragment stage fills the three feature attachments; in forward
//! mode it evaluates the MLP inline and writes the swapchain directly,
//! which adds the weight buffer to the bind group layout.

use crate::data::texture::FeatureTexture;
use crate::data::types::{GlobalUniformStd140, InstanceData, ModelGpu, Vertex};
use crate::renderer::mode::{feature_format, RenderMode, RAY_DATA_FORMAT};
use crate::renderer::targets::DEPTH_FORMAT;
use nerf_assets::{PackedMlp, TextureQuality};

pub struct GeometryPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub model_layout: wgpu::BindGroupLayout,
    mode: RenderMode,
}

impl GeometryPipeline {
    pub fn new(
        device: &wgpu::Device,
        mode: RenderMode,
        quality: TextureQuality,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let mut entries = vec![
            texture_entry(0),
            texture_entry(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<GlobalUniformStd140>() as u64,
                    ),
                },
                count: None,
            },
        ];

        // Forward mode evaluates the MLP in this pass, so the weights join
        // the geometry bind group.
        if mode == RenderMode::Forward {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<PackedMlp>() as u64,
                    ),
                },
                count: None,
            });
        }

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Geometry Model Layout"),
            entries: &entries,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match mode {
                RenderMode::Forward => "shaders/merged.wgsl",
                RenderMode::Deferred => "shaders/raster.wgsl",
            }),
            source: wgpu::ShaderSource::Wgsl(match mode {
                RenderMode::Forward => include_str!("../../../shaders/merged.wgsl").into(),
                RenderMode::Deferred => include_str!("../../../shaders/raster.wgsl").into(),
            }),
        });

        // Binding 0: per-vertex mesh data. Binding 1: per-instance grid
        // offset, stepped once per instance.
        let vbuf_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute {
                        shader_location: 0,
                        offset: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    },
                    wgpu::VertexAttribute {
                        shader_location: 1,
                        offset: 12,
                        format: wgpu::VertexFormat::Float32x2,
                    },
                ],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<InstanceData>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 2,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            },
        ];

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = match mode {
            RenderMode::Forward => vec![Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            RenderMode::Deferred => [
                feature_format(quality),
                feature_format(quality),
                RAY_DATA_FORMAT,
            ]
            .into_iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect(),
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Geometry PipelineLayout"),
            bind_group_layouts: &[&model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Geometry Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &color_targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            model_layout,
            mode,
        }
    }

    /// Build a model's geometry bind groups: one in deferred mode, one per
    /// frame slot in forward mode. All slots reference the model's shared
    /// uniform and weight buffers.
    pub fn bind_model(
        &self,
        device: &wgpu::Device,
        feature_0: &FeatureTexture,
        feature_1: &FeatureTexture,
        uniform_buffer: &wgpu::Buffer,
        weights_buffer: &wgpu::Buffer,
        frame_count: usize,
    ) -> Vec<wgpu::BindGroup> {
        (0..self.mode.bind_groups_per_model(frame_count))
            .map(|_| {
                let mut entries = vec![
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&feature_0.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&feature_1.view),
                    },
                    // Both feature samplers are configured identically.
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&feature_0.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ];
                if self.mode == RenderMode::Forward {
                    entries.push(wgpu::BindGroupEntry {
                        binding: 4,
                        resource: weights_buffer.as_entire_binding(),
                    });
                }
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Geometry Model Bind"),
                    layout: &self.model_layout,
                    entries: &entries,
                })
            })
            .collect()
    }

    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        model: &'a ModelGpu,
        instance_buffer: &'a wgpu::Buffer,
        instance_count: u32,
        frame_slot: usize,
    ) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &model.bind_groups[frame_slot % model.bind_groups.len()], &[]);
        rpass.set_vertex_buffer(0, model.vertex_buffer.slice(..));
        rpass.set_vertex_buffer(1, instance_buffer.slice(..));
        rpass.set_index_buffer(model.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..model.index_count, 0, 0..instance_count);
    }
}
