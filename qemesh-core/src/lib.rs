//! Core data structures and geometry primitives for qemesh
//!
//! This crate provides the indexed triangle mesh exchanged between a loader,
//! the simplifier and a renderer, OBJ face-corner resolution, and the vector
//! and quadric helpers the simplifier is built on.

pub mod point;
pub mod mesh;
pub mod obj_faces;
pub mod geometry;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use obj_faces::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

// Type aliases for easier imports
pub type Mesh = TriangleMesh;
