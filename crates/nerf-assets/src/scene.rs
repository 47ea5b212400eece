//! Scene map parsing and resolution.
//!
//! The scene map is a single JSON object. Top-level keys configure the
//! viewer (`width`, `height`, `texture_type`, `target_model`, `deferred`,
//! `rotation`); every other key is a scene entry. A plain entry names one
//! model directory; a combo entry (`"combo": true`) composes several
//! independently trained models into one scene via parallel `models` /
//! `original` arrays.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Fallback catalog compiled into the binary, used when no external scene
/// map is supplied on the command line.
pub const EMBEDDED_SCENE_MAP: &str = r#"
{
    "width": 0,
    "height": 0,
    "texture_type": "8bit",
    "target_model": "lego_combo",
    "deferred": false,
    "rotation": true,

    "lego_ball": {
        "path": "scenes/morpheus_team/lego_ball_phone/",
        "num_sub_model": 1,
        "original": false,
        "camera": [-1, 1, 1],
        "instancing": { "dim": [1, 1, 1], "interval": [2.0, 2.0, 2.0] }
    },

    "lego_boba_fett": {
        "path": "scenes/morpheus_team/lego_boba_fett_phone/",
        "num_sub_model": 1,
        "original": false,
        "camera": [-1, 1, 1],
        "instancing": { "dim": [1, 1, 1], "interval": [2.0, 2.0, 2.0] }
    },

    "lego_monster_truck": {
        "path": "scenes/morpheus_team/lego_monster_truck_phone/",
        "num_sub_model": 1,
        "original": false,
        "camera": [-1, 1, 1],
        "instancing": { "dim": [1, 1, 1], "interval": [2.0, 2.0, 2.0] }
    },

    "lego_tractor": {
        "path": "scenes/morpheus_team/lego_tractor_phone/",
        "num_sub_model": 1,
        "original": false,
        "camera": [-1, 1, 1],
        "instancing": { "dim": [1, 1, 1], "interval": [2.0, 2.0, 2.0] }
    },

    "lego_combo": {
        "combo": true,
        "models": ["scenes/morpheus_team/lego_ball_phone/",
                   "scenes/morpheus_team/lego_boba_fett_phone/",
                   "scenes/morpheus_team/lego_monster_truck_phone/",
                   "scenes/morpheus_team/lego_tractor_phone/"],
        "original": [false, false, false, false],
        "camera": [-0.0381453, 1.84186, -1.51744],
        "instancing": { "dim": [2, 2, 2], "interval": [1.5, 1.5, 1.5] }
    }
}
"#;

/// Camera position used when a scene entry omits or mangles `camera`.
const DEFAULT_CAMERA_POS: [f32; 3] = [-1.0, 1.0, 1.0];

/// Feature-texture precision. Unrecognized strings degrade to the highest
/// precision rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureQuality {
    Rgba8,
    Rgba16Float,
    Rgba32Float,
}

impl TextureQuality {
    fn parse(s: &str) -> Self {
        match s {
            "8bit" => TextureQuality::Rgba8,
            "16bit" => TextureQuality::Rgba16Float,
            "32bit" => TextureQuality::Rgba32Float,
            other => {
                log::warn!(
                    "Unrecognized feature texture type {:?}, using 32-bit float",
                    other
                );
                TextureQuality::Rgba32Float
            }
        }
    }
}

/// The instancing grid: `dim` cells along each axis, spaced by `interval`
/// and centered on the origin. Immutable once resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceGrid {
    pub dim: [u32; 3],
    pub interval: [f32; 3],
}

impl InstanceGrid {
    pub fn count(&self) -> u32 {
        self.dim[0] * self.dim[1] * self.dim[2]
    }

    /// One offset per grid cell, iterated x-major then y then z, with the
    /// whole block centered so the mean offset is the zero vector.
    pub fn offsets(&self) -> Vec<[f32; 3]> {
        let corner = [
            -self.interval[0] * 0.5 * (self.dim[0] - 1) as f32,
            -self.interval[1] * 0.5 * (self.dim[1] - 1) as f32,
            -self.interval[2] * 0.5 * (self.dim[2] - 1) as f32,
        ];

        let mut out = Vec::with_capacity(self.count() as usize);
        for x in 0..self.dim[0] {
            for y in 0..self.dim[1] {
                for z in 0..self.dim[2] {
                    out.push([
                        corner[0] + self.interval[0] * x as f32,
                        corner[1] + self.interval[1] * y as f32,
                        corner[2] + self.interval[2] * z as f32,
                    ]);
                }
            }
        }
        out
    }

    fn validate(&self) -> Result<()> {
        if self.dim.iter().any(|&d| d == 0) {
            bail!("instancing dimensions must be positive, got {:?}", self.dim);
        }
        if self.interval.iter().any(|&i| !(i > 0.0) || !i.is_finite()) {
            bail!(
                "instancing intervals must be positive, got {:?}",
                self.interval
            );
        }
        Ok(())
    }
}

/// A fully resolved scene: everything the viewer needs to build GPU state.
#[derive(Debug, Clone)]
pub struct SceneDescriptor {
    pub name: String,
    /// One directory per logical model; combo scenes have several.
    pub model_paths: Vec<PathBuf>,
    /// Parallel to `model_paths`; selects the 8-piece mesh layout and
    /// nearest-filtered feature sampling of the original model exports.
    pub original_format: Vec<bool>,
    pub combo: bool,
    pub texture_quality: TextureQuality,
    pub deferred: bool,
    pub rotation: bool,
    /// `None` when the map requests the native window size (width/height 0).
    pub fixed_viewport: Option<[u32; 2]>,
    pub camera_position: [f32; 3],
    pub grid: InstanceGrid,
}

// ---- raw serde layer ----

#[derive(Deserialize)]
struct RawCatalog {
    width: u32,
    height: u32,
    texture_type: String,
    target_model: String,
    deferred: bool,
    rotation: bool,
    #[serde(flatten)]
    scenes: HashMap<String, RawScene>,
}

#[derive(Deserialize)]
struct RawScene {
    #[serde(default)]
    combo: bool,
    path: Option<String>,
    models: Option<Vec<String>>,
    original: Option<RawOriginal>,
    camera: Option<serde_json::Value>,
    instancing: Option<RawInstancing>,
}

/// `original` is a single bool for plain scenes and a parallel array for
/// combo scenes.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOriginal {
    One(bool),
    Many(Vec<bool>),
}

#[derive(Deserialize)]
struct RawInstancing {
    dim: Option<Vec<i64>>,
    interval: Option<Vec<f64>>,
}

/// Parsed scene map; `resolve` picks and validates one entry.
pub struct SceneCatalog {
    raw: RawCatalog,
}

impl SceneCatalog {
    pub fn from_str(json: &str) -> Result<Self> {
        let raw: RawCatalog =
            serde_json::from_str(json).context("failed to parse scene map JSON")?;
        Ok(Self { raw })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene map {}", path.display()))?;
        Self::from_str(&text)
    }

    /// The compiled-in default catalog.
    pub fn embedded() -> Result<Self> {
        Self::from_str(EMBEDDED_SCENE_MAP)
    }

    /// Resolve `target` (or the map's own `target_model`) into a validated
    /// descriptor. Malformed instancing settings are hard errors; the
    /// caller is expected to treat them as fatal.
    pub fn resolve(&self, target: Option<&str>) -> Result<SceneDescriptor> {
        let name = target.unwrap_or(&self.raw.target_model);
        let entry = self
            .raw
            .scenes
            .get(name)
            .ok_or_else(|| anyhow!("scene map has no entry named {:?}", name))?;

        let (model_paths, original_format) = if entry.combo {
            let models = entry
                .models
                .as_ref()
                .ok_or_else(|| anyhow!("combo scene {:?} is missing \"models\"", name))?;
            let original = match &entry.original {
                Some(RawOriginal::Many(flags)) => flags.clone(),
                _ => bail!("combo scene {:?} needs an \"original\" array", name),
            };
            if models.is_empty() {
                bail!("combo scene {:?} lists no models", name);
            }
            if models.len() != original.len() {
                bail!(
                    "combo scene {:?}: {} models but {} original flags",
                    name,
                    models.len(),
                    original.len()
                );
            }
            (models.iter().map(PathBuf::from).collect(), original)
        } else {
            let path = entry
                .path
                .as_ref()
                .ok_or_else(|| anyhow!("scene {:?} is missing \"path\"", name))?;
            let original = match &entry.original {
                Some(RawOriginal::One(flag)) => *flag,
                _ => bail!("scene {:?} needs a boolean \"original\" flag", name),
            };
            (vec![PathBuf::from(path)], vec![original])
        };

        let camera_position = match parse_camera(entry.camera.as_ref()) {
            Some(pos) => pos,
            None => {
                log::warn!(
                    "Scene {:?} has no usable camera position, using {:?}",
                    name,
                    DEFAULT_CAMERA_POS
                );
                DEFAULT_CAMERA_POS
            }
        };

        let grid = parse_grid(name, entry.instancing.as_ref())?;
        grid.validate()?;

        let fixed_viewport = if self.raw.width == 0 || self.raw.height == 0 {
            None
        } else {
            Some([self.raw.width, self.raw.height])
        };

        Ok(SceneDescriptor {
            name: name.to_owned(),
            model_paths,
            original_format,
            combo: entry.combo,
            texture_quality: TextureQuality::parse(&self.raw.texture_type),
            deferred: self.raw.deferred,
            rotation: self.raw.rotation,
            fixed_viewport,
            camera_position,
            grid,
        })
    }
}

fn parse_camera(value: Option<&serde_json::Value>) -> Option<[f32; 3]> {
    let arr = value?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    let mut pos = [0.0f32; 3];
    for (slot, v) in pos.iter_mut().zip(arr) {
        *slot = v.as_f64()? as f32;
    }
    Some(pos)
}

fn parse_grid(name: &str, raw: Option<&RawInstancing>) -> Result<InstanceGrid> {
    let raw = raw.ok_or_else(|| anyhow!("scene {:?} is missing \"instancing\"", name))?;

    let dim = raw
        .dim
        .as_ref()
        .filter(|d| d.len() == 3 && d.iter().all(|&v| v >= 0))
        .ok_or_else(|| anyhow!("scene {:?} has a malformed instancing dimension", name))?;
    let interval = raw
        .interval
        .as_ref()
        .filter(|i| i.len() == 3)
        .ok_or_else(|| anyhow!("scene {:?} has a malformed instancing interval", name))?;

    Ok(InstanceGrid {
        dim: [dim[0] as u32, dim[1] as u32, dim[2] as u32],
        interval: [interval[0] as f32, interval[1] as f32, interval[2] as f32],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_map_resolves_default_target() {
        let catalog = SceneCatalog::embedded().unwrap();
        let scene = catalog.resolve(None).unwrap();
        assert_eq!(scene.name, "lego_combo");
        assert!(scene.combo);
        assert_eq!(scene.model_paths.len(), 4);
        assert_eq!(scene.original_format, vec![false; 4]);
        assert_eq!(scene.grid.dim, [2, 2, 2]);
        assert_eq!(scene.texture_quality, TextureQuality::Rgba8);
        assert!(scene.fixed_viewport.is_none());
        assert!(scene.rotation);
        assert!(!scene.deferred);
    }

    #[test]
    fn resolve_single_model_entry() {
        let catalog = SceneCatalog::embedded().unwrap();
        let scene = catalog.resolve(Some("lego_ball")).unwrap();
        assert!(!scene.combo);
        assert_eq!(scene.model_paths.len(), 1);
        assert_eq!(scene.camera_position, [-1.0, 1.0, 1.0]);
        assert_eq!(scene.grid.count(), 1);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let catalog = SceneCatalog::embedded().unwrap();
        assert!(catalog.resolve(Some("no_such_scene")).is_err());
    }

    #[test]
    fn zero_grid_dimension_is_fatal() {
        let json = r#"{
            "width": 0, "height": 0, "texture_type": "8bit",
            "target_model": "bad", "deferred": false, "rotation": false,
            "bad": {
                "path": "x/", "original": false,
                "instancing": { "dim": [0, 1, 1], "interval": [1.0, 1.0, 1.0] }
            }
        }"#;
        let catalog = SceneCatalog::from_str(json).unwrap();
        assert!(catalog.resolve(None).is_err());
    }

    #[test]
    fn nonpositive_interval_is_fatal() {
        let json = r#"{
            "width": 0, "height": 0, "texture_type": "8bit",
            "target_model": "bad", "deferred": false, "rotation": false,
            "bad": {
                "path": "x/", "original": false,
                "instancing": { "dim": [1, 1, 1], "interval": [1.0, 0.0, 1.0] }
            }
        }"#;
        let catalog = SceneCatalog::from_str(json).unwrap();
        assert!(catalog.resolve(None).is_err());
    }

    #[test]
    fn unknown_texture_type_degrades_to_32bit() {
        let json = r#"{
            "width": 0, "height": 0, "texture_type": "12bit",
            "target_model": "s", "deferred": true, "rotation": false,
            "s": {
                "path": "x/", "original": true,
                "instancing": { "dim": [1, 1, 1], "interval": [1.0, 1.0, 1.0] }
            }
        }"#;
        let scene = SceneCatalog::from_str(json).unwrap().resolve(None).unwrap();
        assert_eq!(scene.texture_quality, TextureQuality::Rgba32Float);
        assert!(scene.deferred);
        assert_eq!(scene.original_format, vec![true]);
    }

    #[test]
    fn fixed_viewport_roundtrips() {
        let json = r#"{
            "width": 1280, "height": 720, "texture_type": "16bit",
            "target_model": "s", "deferred": false, "rotation": false,
            "s": {
                "path": "x/", "original": false,
                "instancing": { "dim": [1, 1, 1], "interval": [1.0, 1.0, 1.0] }
            }
        }"#;
        let scene = SceneCatalog::from_str(json).unwrap().resolve(None).unwrap();
        assert_eq!(scene.fixed_viewport, Some([1280, 720]));
        assert_eq!(scene.texture_quality, TextureQuality::Rgba16Float);
    }

    #[test]
    fn missing_camera_uses_default() {
        let json = r#"{
            "width": 0, "height": 0, "texture_type": "8bit",
            "target_model": "s", "deferred": false, "rotation": false,
            "s": {
                "path": "x/", "original": false,
                "instancing": { "dim": [1, 1, 1], "interval": [1.0, 1.0, 1.0] }
            }
        }"#;
        let scene = SceneCatalog::from_str(json).unwrap().resolve(None).unwrap();
        assert_eq!(scene.camera_position, DEFAULT_CAMERA_POS);
    }

    #[test]
    fn grid_offsets_cover_every_cell_and_center_on_origin() {
        let grid = InstanceGrid {
            dim: [3, 2, 4],
            interval: [1.0, 2.0, 0.5],
        };
        let offsets = grid.offsets();
        assert_eq!(offsets.len(), 24);

        let mut mean = [0.0f64; 3];
        for o in &offsets {
            for axis in 0..3 {
                mean[axis] += o[axis] as f64;
            }
        }
        for axis in 0..3 {
            assert!((mean[axis] / offsets.len() as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn two_cube_grid_spans_half_intervals() {
        let grid = InstanceGrid {
            dim: [2, 2, 2],
            interval: [1.5, 1.5, 1.5],
        };
        let offsets = grid.offsets();
        assert_eq!(offsets.len(), 8);
        for o in &offsets {
            for axis in 0..3 {
                assert!((o[axis].abs() - 0.75).abs() < 1e-6);
            }
        }
        // Every sign combination appears exactly once.
        let mut seen = std::collections::HashSet::new();
        for o in &offsets {
            seen.insert([o[0] > 0.0, o[1] > 0.0, o[2] > 0.0]);
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn single_cell_grid_sits_at_origin() {
        let grid = InstanceGrid {
            dim: [1, 1, 1],
            interval: [2.0, 2.0, 2.0],
        };
        assert_eq!(grid.offsets(), vec![[0.0, 0.0, 0.0]]);
    }
}
