//! Feature-texture loading.
//!
//! Each sub-model carries two raster feature maps (`.pngfeat0.png` and
//! `.pngfeat1.png`) holding the learned per-texel feature vectors. They
//! are decoded to RGBA8 and uploaded as sampled textures; original-format
//! models must be point-sampled, newer exports filter linearly.

use anyhow::{Context, Result};
use std::path::Path;

pub struct FeatureTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

pub fn load_feature_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
    nearest_filter: bool,
) -> Result<FeatureTexture> {
    log::info!("Creating feature texture from {}", path.display());

    let decoded = image::open(path)
        .with_context(|| format!("failed to decode feature texture {}", path.display()))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Feature Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &decoded,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    let filter = if nearest_filter {
        wgpu::FilterMode::Nearest
    } else {
        wgpu::FilterMode::Linear
    };

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Feature Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    Ok(FeatureTexture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        texture,
        sampler,
        width,
        height,
    })
}
