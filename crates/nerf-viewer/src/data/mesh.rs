//! Mesh ingestion for one sub-model.
//!
//! A sub-model is `shape{i}.gltf` in the model directory, or the eight
//! files `shape{i}_{j}.gltf` when the model uses the original export
//! format. All pieces accumulate into a single vertex/index pair; index
//! triples are rebased as meshes append.

use crate::data::types::Vertex;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

#[derive(Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<[u32; 3]>,
}

impl MeshData {
    pub fn index_count(&self) -> u32 {
        self.triangles.len() as u32 * 3
    }
}

/// Append one primitive's attributes, rebasing its indices onto the
/// vertices already present. Texture v is flipped to image convention.
fn append_primitive(
    mesh: &mut MeshData,
    positions: &[[f32; 3]],
    tex_coords: &[[f32; 2]],
    indices: &[u32],
) -> Result<()> {
    if positions.len() != tex_coords.len() {
        return Err(anyhow!(
            "primitive has {} positions but {} texcoords",
            positions.len(),
            tex_coords.len()
        ));
    }
    if indices.len() % 3 != 0 {
        return Err(anyhow!(
            "primitive index count {} is not a triangle list",
            indices.len()
        ));
    }

    let base = mesh.vertices.len() as u32;
    mesh.vertices.extend(
        positions
            .iter()
            .zip(tex_coords)
            .map(|(&position, &[u, v])| Vertex {
                position,
                tex_coord: [u, 1.0 - v],
            }),
    );
    mesh.triangles.extend(
        indices
            .chunks_exact(3)
            .map(|t| [base + t[0], base + t[1], base + t[2]]),
    );
    Ok(())
}

fn append_file(mesh: &mut MeshData, path: &Path) -> Result<()> {
    log::info!("Parsing nerf mesh {}", path.display());

    let (document, buffers, _images) = gltf::import(path)
        .with_context(|| format!("failed to load mesh {}", path.display()))?;

    for gltf_mesh in document.meshes() {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| anyhow!("{}: primitive has no positions", path.display()))?
                .collect();
            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .ok_or_else(|| anyhow!("{}: primitive has no texcoord_0", path.display()))?
                .into_f32()
                .collect();
            let indices: Vec<u32> = reader
                .read_indices()
                .ok_or_else(|| anyhow!("{}: primitive has no indices", path.display()))?
                .into_u32()
                .collect();

            append_primitive(mesh, &positions, &tex_coords, &indices)
                .with_context(|| path.display().to_string())?;
        }
    }
    Ok(())
}

/// Load sub-model `sub_model_index` from `model_dir`. Original-format
/// exports split each sub-model across 8 mesh files.
pub fn load_sub_model(
    model_dir: &Path,
    sub_model_index: usize,
    original_format: bool,
) -> Result<MeshData> {
    let mut mesh = MeshData::default();
    let pieces = if original_format { 8 } else { 1 };

    for piece in 0..pieces {
        let file = if original_format {
            format!("shape{}_{}.gltf", sub_model_index, piece)
        } else {
            format!("shape{}.gltf", sub_model_index)
        };
        append_file(&mut mesh, &model_dir.join(file))?;
    }

    log::info!(
        "Sub-model {}: {} vertices, {} triangles",
        sub_model_index,
        mesh.vertices.len(),
        mesh.triangles.len()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_rebase_indices_as_they_append() {
        let mut mesh = MeshData::default();

        append_primitive(
            &mut mesh,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            &[0, 1, 2],
        )
        .unwrap();
        append_primitive(
            &mut mesh,
            &[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]],
            &[[0.5, 0.5], [1.0, 0.5], [0.5, 1.0]],
            &[0, 2, 1],
        )
        .unwrap();

        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [3, 5, 4]]);
        assert_eq!(mesh.index_count(), 6);
    }

    #[test]
    fn texture_v_is_flipped() {
        let mut mesh = MeshData::default();
        append_primitive(
            &mut mesh,
            &[[0.0; 3], [0.0; 3], [0.0; 3]],
            &[[0.25, 0.0], [0.25, 1.0], [0.25, 0.25]],
            &[0, 1, 2],
        )
        .unwrap();
        assert_eq!(mesh.vertices[0].tex_coord, [0.25, 1.0]);
        assert_eq!(mesh.vertices[1].tex_coord, [0.25, 0.0]);
        assert_eq!(mesh.vertices[2].tex_coord, [0.25, 0.75]);
    }

    #[test]
    fn mismatched_attribute_counts_are_rejected() {
        let mut mesh = MeshData::default();
        let err = append_primitive(&mut mesh, &[[0.0; 3]], &[], &[]);
        assert!(err.is_err());
    }

    #[test]
    fn non_triangle_index_lists_are_rejected() {
        let mut mesh = MeshData::default();
        let err = append_primitive(
            &mut mesh,
            &[[0.0; 3], [0.0; 3]],
            &[[0.0; 2], [0.0; 2]],
            &[0, 1],
        );
        assert!(err.is_err());
    }
}
