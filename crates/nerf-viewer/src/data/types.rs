//! GPU-facing data types. Layouts must match the WGSL structs in
//! `shaders/`.

use crate::data::texture::FeatureTexture;

/// One mesh vertex: object-space position plus feature-texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Per-instance grid-cell offset, stepped once per instance at binding 1.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub pos_offset: [f32; 3],
}

/// Per-logical-model camera/transform uniform, respecting std140 layout.
/// Must match `GlobalUniform` in the WGSL shaders.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniformStd140 {
    /// Per-model placement (combo translation or identity).
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub _pad0: f32,
    /// Camera basis columns extracted from the view matrix.
    pub camera_side: [f32; 3],
    pub _pad1: f32,
    pub camera_up: [f32; 3],
    pub _pad2: f32,
    pub camera_lookat: [f32; 3],
    pub _pad3: f32,
    /// Viewport size in physical pixels.
    pub img_dim: [f32; 2],
    pub tan_half_fov: f32,
    pub _pad4: f32,
}

// Compile-time safety check: buffer size must match the WGSL-reflected size.
const _: [(); 272] = [(); core::mem::size_of::<GlobalUniformStd140>()];

/// Everything one renderable mesh piece owns on the GPU. Sub-models of a
/// multi-part scene are consecutive entries with the same `model_index`,
/// sharing that logical model's uniform and weight buffers.
pub struct ModelGpu {
    /// Index of the logical model this piece belongs to.
    pub model_index: usize,
    /// How many consecutive pieces share one MLP weight set.
    pub sub_model_num: usize,
    pub index_count: u32,

    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub feature_0: FeatureTexture,
    pub feature_1: FeatureTexture,

    /// Geometry-pass bind groups: exactly one in deferred mode, one per
    /// frame slot in forward mode (indexed by the frame counter).
    pub bind_groups: Vec<wgpu::BindGroup>,
}
