//! Asset formats for the rasterized NeRF viewer.
//!
//! Two sidecar JSON formats travel with every trained model:
//!
//! - The *scene map*: a catalog keyed by scene name, selecting the model
//!   paths, feature-texture precision, forward/deferred pipeline flag and
//!   the instancing grid. See [`scene`].
//! - The *MLP weight file* (`mlp.json`): the pretrained per-model network
//!   as nested float arrays, repacked here into the flat, 16-byte-aligned
//!   record the evaluation shader reads. See [`mlp`].
//!
//! Everything in this crate is plain CPU data preparation; the viewer
//! crate owns all GPU resources built from it.

pub mod mlp;
pub mod scene;

pub use mlp::{pack, MlpWeightFile, PackedMlp};
pub use scene::{InstanceGrid, SceneCatalog, SceneDescriptor, TextureQuality};
