//! Mesh simplification by quadric error edge collapse
//!
//! The crate is split along the stages of one simplification step:
//! - [`topology`]: vertex/triangle/edge store with per-vertex adjacency
//! - [`quadric`]: quadric accumulation, optimal collapse point and cost
//! - [`scheduler`]: cheapest-first edge worklist
//! - [`contraction`]: the contraction step and the [`QemMesh`] session
//!
//! [`QuadricErrorSimplifier`] wraps a session behind the [`MeshSimplifier`]
//! trait for one-shot use.

pub mod config;
pub mod contraction;
pub mod error;
pub mod quadric;
pub mod quadric_error;
pub mod scheduler;
pub mod stats;
pub mod topology;

pub use config::*;
pub use contraction::*;
pub use error::*;
pub use quadric_error::*;
pub use scheduler::CollapseScheduler;
pub use stats::*;
pub use topology::{Edge, EdgeId, MeshTopology, TriangleId};

use qemesh_core::TriangleMesh;

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}
