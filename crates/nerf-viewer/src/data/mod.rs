//! CPU-side asset ingestion and the GPU upload path.

pub mod mesh;
pub mod texture;
pub mod types;
pub mod upload;
