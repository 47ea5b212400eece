//! Synchronous staging-buffer uploads for static geometry.
//!
//! Source data is written into a host-visible staging buffer, copied into
//! a device-local destination by a one-shot command buffer, and the
//! calling thread blocks until the submission completes. wgpu's usage
//! tracking turns the transfer-write into shader-read visibility for the
//! first draw that touches the destination. Uploads only happen at
//! startup; none of this runs per frame, and the resulting buffers are
//! never resized.

use crate::data::types::{InstanceData, Vertex};
use wgpu::util::DeviceExt;

fn upload_bytes(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Upload Staging"),
        contents,
        usage: wgpu::BufferUsages::COPY_SRC,
    });

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: contents.len() as u64,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Upload Encoder"),
    });
    encoder.copy_buffer_to_buffer(&staging, 0, &buffer, 0, contents.len() as u64);

    let submission = queue.submit(std::iter::once(encoder.finish()));
    device.poll(wgpu::Maintain::WaitForSubmissionIndex(submission));

    buffer
}

pub fn upload_vertices(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    vertices: &[Vertex],
) -> wgpu::Buffer {
    upload_bytes(
        device,
        queue,
        "Model Vertex Buffer",
        bytemuck::cast_slice(vertices),
        wgpu::BufferUsages::VERTEX,
    )
}

pub fn upload_indices(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    triangles: &[[u32; 3]],
) -> wgpu::Buffer {
    upload_bytes(
        device,
        queue,
        "Model Index Buffer",
        bytemuck::cast_slice(triangles),
        wgpu::BufferUsages::INDEX,
    )
}

pub fn upload_instances(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    offsets: &[[f32; 3]],
) -> wgpu::Buffer {
    let instances: Vec<InstanceData> = offsets
        .iter()
        .map(|&pos_offset| InstanceData { pos_offset })
        .collect();
    upload_bytes(
        device,
        queue,
        "Instance Buffer",
        bytemuck::cast_slice(&instances),
        wgpu::BufferUsages::VERTEX,
    )
}
