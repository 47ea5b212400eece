//! Intermediate render-target textures.
//!
//! Deferred mode keeps one feature-attachment set per frame slot (two
//! feature maps plus the ray-data channel) and a shared depth texture;
//! forward mode only needs the depth texture. Extents must track the
//! surface exactly, so a resize tears everything down and recreates it.

use crate::renderer::mode::{feature_format, RenderMode, RAY_DATA_FORMAT};
use nerf_assets::TextureQuality;

/// Frame slots cycled by the per-frame uniform/bind-group indexing.
/// Matches the swapchain depth requested from the surface.
pub const FRAME_COUNT: usize = 3;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One frame slot's geometry-pass outputs.
pub struct FeatureTargets {
    _feature_0_tex: wgpu::Texture,
    _feature_1_tex: wgpu::Texture,
    _ray_tex: wgpu::Texture,

    pub feature_0: wgpu::TextureView,
    pub feature_1: wgpu::TextureView,
    pub ray_data: wgpu::TextureView,
}

pub struct Targets {
    mode: RenderMode,
    quality: TextureQuality,

    /// One entry per frame slot in deferred mode; empty in forward mode.
    pub frames: Vec<FeatureTargets>,
    _depth_tex: wgpu::Texture,
    pub depth: wgpu::TextureView,

    pub feature_fmt: wgpu::TextureFormat,
    pub extent: winit::dpi::PhysicalSize<u32>,
}

impl Targets {
    pub fn new(
        device: &wgpu::Device,
        size: winit::dpi::PhysicalSize<u32>,
        mode: RenderMode,
        quality: TextureQuality,
    ) -> Self {
        let width = size.width.max(1);
        let height = size.height.max(1);

        let tex_size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let create_tex = |label: &str, format| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: tex_size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };

        let feature_fmt = feature_format(quality);

        let frames = match mode {
            RenderMode::Forward => Vec::new(),
            RenderMode::Deferred => (0..FRAME_COUNT)
                .map(|_| {
                    let feature_0_tex = create_tex("Feature Map 0", feature_fmt);
                    let feature_1_tex = create_tex("Feature Map 1", feature_fmt);
                    let ray_tex = create_tex("Ray Data", RAY_DATA_FORMAT);
                    FeatureTargets {
                        feature_0: feature_0_tex
                            .create_view(&wgpu::TextureViewDescriptor::default()),
                        feature_1: feature_1_tex
                            .create_view(&wgpu::TextureViewDescriptor::default()),
                        ray_data: ray_tex.create_view(&wgpu::TextureViewDescriptor::default()),
                        _feature_0_tex: feature_0_tex,
                        _feature_1_tex: feature_1_tex,
                        _ray_tex: ray_tex,
                    }
                })
                .collect(),
        };

        let depth_tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth"),
            size: tex_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            mode,
            quality,
            frames,
            depth: depth_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            _depth_tex: depth_tex,
            feature_fmt,
            extent: winit::dpi::PhysicalSize::new(width, height),
        }
    }

    /// Destroy-and-recreate at the new surface extent.
    pub fn resize(&mut self, device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) {
        *self = Self::new(device, size, self.mode, self.quality);
    }
}
