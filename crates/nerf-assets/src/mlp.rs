//! MLP weight-file parsing and packing.
//!
//! A trained model ships its network as `mlp.json`: three dense layers
//! (11→16, 16→16, 16→3) as nested row-major float arrays plus `obj_num`,
//! the number of mesh pieces sharing this network. The evaluation shader
//! reads the network as one flat uniform record of 532 floats in which
//! every array has a 16-byte (vec4) stride, so the 3-wide output layer is
//! stored 4-wide with a zero in every 4th slot.
//!
//! Packed layout, in floats:
//!
//!   [  0..176)  layer-0 weights, row-major [11][16]
//!   [176..432)  layer-1 weights, row-major [16][16]
//!   [432..496)  layer-2 weights, [16][4] with slot 4n+3 always 0.0
//!   [496..512)  layer-0 bias
//!   [512..528)  layer-1 bias
//!   [528..532)  layer-2 bias, 3 values + 1 zero
//!
//! Element-count mismatches in the file are logged and packing proceeds
//! best-effort with zero fill; a wrong network renders wrong, it does not
//! crash the viewer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Flattened element counts the shader-side record expects.
pub const WEIGHTS_0_COUNT: usize = 176;
pub const WEIGHTS_1_COUNT: usize = 256;
/// Includes the 16 zero-padding slots (48 real values).
pub const WEIGHTS_2_COUNT: usize = 64;
pub const BIAS_0_COUNT: usize = 16;
pub const BIAS_1_COUNT: usize = 16;
/// Includes the 1 zero-padding slot (3 real values).
pub const BIAS_2_COUNT: usize = 4;

/// Total packed record length: 532 floats, 2128 bytes (133 vec4s).
pub const PACKED_COUNT: usize = WEIGHTS_0_COUNT
    + WEIGHTS_1_COUNT
    + WEIGHTS_2_COUNT
    + BIAS_0_COUNT
    + BIAS_1_COUNT
    + BIAS_2_COUNT;

const WEIGHTS_1_OFFSET: usize = WEIGHTS_0_COUNT;
const WEIGHTS_2_OFFSET: usize = WEIGHTS_1_OFFSET + WEIGHTS_1_COUNT;
const BIAS_0_OFFSET: usize = WEIGHTS_2_OFFSET + WEIGHTS_2_COUNT;
const BIAS_1_OFFSET: usize = BIAS_0_OFFSET + BIAS_0_COUNT;
const BIAS_2_OFFSET: usize = BIAS_1_OFFSET + BIAS_1_COUNT;

/// `mlp.json` as it appears on disk. 2-D arrays flatten row-major.
#[derive(Debug, Clone, Deserialize)]
pub struct MlpWeightFile {
    pub obj_num: usize,
    #[serde(rename = "0_weights")]
    pub weights_0: Vec<Vec<f32>>,
    #[serde(rename = "0_bias")]
    pub bias_0: Vec<f32>,
    #[serde(rename = "1_weights")]
    pub weights_1: Vec<Vec<f32>>,
    #[serde(rename = "1_bias")]
    pub bias_1: Vec<f32>,
    #[serde(rename = "2_weights")]
    pub weights_2: Vec<Vec<f32>>,
    #[serde(rename = "2_bias")]
    pub bias_2: Vec<f32>,
}

impl MlpWeightFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read MLP weights {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse MLP weights {}", path.display()))
    }
}

/// The flat GPU-ready record. All sub-models of a logical model share one.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct PackedMlp {
    pub data: [f32; PACKED_COUNT],
}

// Uniform-buffer stride rule: the record must be vec4-granular.
const _: [(); 0] = [(); PACKED_COUNT % 4];

fn flatten(raw: &[Vec<f32>]) -> Vec<f32> {
    raw.iter().flatten().copied().collect()
}

fn check_count(layer: &str, got: usize, expected: usize) {
    if got != expected {
        log::error!(
            "MLP {} count is {}, rather than {}",
            layer,
            got,
            expected
        );
    }
}

/// Copy `src` into `dst`, inserting a zero into every 4th slot so a 3-wide
/// row lands on a 4-float stride. Missing source values become zeros.
fn copy_padded(dst: &mut [f32], src: &[f32]) {
    let mut raw = src.iter().copied();
    for (i, slot) in dst.iter_mut().enumerate() {
        *slot = if (i + 1) % 4 == 0 {
            0.0
        } else {
            raw.next().unwrap_or(0.0)
        };
    }
}

/// Copy `src` into `dst` verbatim, zero-filling any shortfall.
fn copy_exact(dst: &mut [f32], src: &[f32]) {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    dst[n..].fill(0.0);
}

/// Pack a weight file into the shader record. Deterministic; count
/// mismatches are logged (soft validation) and never abort.
pub fn pack(file: &MlpWeightFile) -> PackedMlp {
    let weights_0 = flatten(&file.weights_0);
    let weights_1 = flatten(&file.weights_1);
    let weights_2 = flatten(&file.weights_2);

    check_count("layer 0 weights", weights_0.len(), WEIGHTS_0_COUNT);
    check_count("layer 0 bias", file.bias_0.len(), BIAS_0_COUNT);
    check_count("layer 1 weights", weights_1.len(), WEIGHTS_1_COUNT);
    check_count("layer 1 bias", file.bias_1.len(), BIAS_1_COUNT);
    // The padded layers arrive without their zero slots.
    check_count("layer 2 weights", weights_2.len(), WEIGHTS_2_COUNT - 16);
    check_count("layer 2 bias", file.bias_2.len(), BIAS_2_COUNT - 1);

    let mut packed = PackedMlp {
        data: [0.0; PACKED_COUNT],
    };

    copy_exact(
        &mut packed.data[..WEIGHTS_1_OFFSET],
        &weights_0,
    );
    copy_exact(
        &mut packed.data[WEIGHTS_1_OFFSET..WEIGHTS_2_OFFSET],
        &weights_1,
    );
    copy_padded(
        &mut packed.data[WEIGHTS_2_OFFSET..BIAS_0_OFFSET],
        &weights_2,
    );
    copy_exact(
        &mut packed.data[BIAS_0_OFFSET..BIAS_1_OFFSET],
        &file.bias_0,
    );
    copy_exact(
        &mut packed.data[BIAS_1_OFFSET..BIAS_2_OFFSET],
        &file.bias_1,
    );
    copy_padded(&mut packed.data[BIAS_2_OFFSET..], &file.bias_2);

    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A well-formed file whose every element is unique, so ordering
    /// mistakes show up as value mismatches.
    fn sample_file() -> MlpWeightFile {
        let matrix = |rows: usize, cols: usize, base: f32| -> Vec<Vec<f32>> {
            (0..rows)
                .map(|r| (0..cols).map(|c| base + (r * cols + c) as f32).collect())
                .collect()
        };
        MlpWeightFile {
            obj_num: 1,
            weights_0: matrix(11, 16, 1000.0),
            bias_0: (0..16).map(|i| 2000.0 + i as f32).collect(),
            weights_1: matrix(16, 16, 3000.0),
            bias_1: (0..16).map(|i| 4000.0 + i as f32).collect(),
            weights_2: matrix(16, 3, 5000.0),
            bias_2: vec![6000.0, 6001.0, 6002.0],
        }
    }

    #[test]
    fn packing_is_idempotent() {
        let file = sample_file();
        let a = pack(&file);
        let b = pack(&file);
        assert_eq!(a.data, b.data);
        assert_eq!(
            bytemuck::bytes_of(&a),
            bytemuck::bytes_of(&b)
        );
    }

    #[test]
    fn unpadded_layers_copy_in_order() {
        let packed = pack(&sample_file());
        for i in 0..WEIGHTS_0_COUNT {
            assert_eq!(packed.data[i], 1000.0 + i as f32);
        }
        for i in 0..WEIGHTS_1_COUNT {
            assert_eq!(packed.data[WEIGHTS_1_OFFSET + i], 3000.0 + i as f32);
        }
        for i in 0..BIAS_0_COUNT {
            assert_eq!(packed.data[BIAS_0_OFFSET + i], 2000.0 + i as f32);
        }
        for i in 0..BIAS_1_COUNT {
            assert_eq!(packed.data[BIAS_1_OFFSET + i], 4000.0 + i as f32);
        }
    }

    #[test]
    fn padded_layers_zero_every_fourth_slot() {
        let packed = pack(&sample_file());

        let w2 = &packed.data[WEIGHTS_2_OFFSET..BIAS_0_OFFSET];
        let mut real = 0usize;
        for (i, &v) in w2.iter().enumerate() {
            if (i + 1) % 4 == 0 {
                assert_eq!(v, 0.0, "slot {} should be padding", i);
            } else {
                assert_eq!(v, 5000.0 + real as f32);
                real += 1;
            }
        }
        assert_eq!(real, 48);

        let b2 = &packed.data[BIAS_2_OFFSET..];
        assert_eq!(b2, &[6000.0, 6001.0, 6002.0, 0.0]);
    }

    #[test]
    fn expected_short_counts_are_the_quiet_path() {
        // 48 layer-2 weights and 3 biases are exactly what a trained model
        // exports; the packer's padding makes up the difference.
        let file = sample_file();
        assert_eq!(flatten(&file.weights_2).len(), WEIGHTS_2_COUNT - 16);
        assert_eq!(file.bias_2.len(), BIAS_2_COUNT - 1);
        let packed = pack(&file);
        assert_eq!(packed.data.len(), PACKED_COUNT);
    }

    #[test]
    fn truncated_layer_packs_best_effort() {
        let mut file = sample_file();
        file.weights_1.truncate(8); // 128 of 256 values
        let packed = pack(&file);
        // Present values keep their order, the tail zero-fills.
        assert_eq!(packed.data[WEIGHTS_1_OFFSET], 3000.0);
        assert_eq!(packed.data[WEIGHTS_1_OFFSET + 127], 3127.0);
        assert_eq!(packed.data[WEIGHTS_1_OFFSET + 128], 0.0);
        assert_eq!(packed.data[WEIGHTS_2_OFFSET - 1], 0.0);
        // Later layers are unaffected by the shortfall.
        assert_eq!(packed.data[BIAS_0_OFFSET], 2000.0);
    }

    #[test]
    fn parses_disk_layout() {
        let json = r#"{
            "obj_num": 2,
            "0_weights": [[1.0, 2.0], [3.0, 4.0]],
            "0_bias": [0.1, 0.2],
            "1_weights": [[5.0]],
            "1_bias": [0.3],
            "2_weights": [[6.0, 7.0, 8.0]],
            "2_bias": [0.4, 0.5, 0.6]
        }"#;
        let file: MlpWeightFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.obj_num, 2);
        assert_eq!(flatten(&file.weights_0), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(file.bias_2, vec![0.4, 0.5, 0.6]);
    }
}
