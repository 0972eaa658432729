//! Quadric error decimation

use crate::config::QemConfig;
use crate::contraction::QemMesh;
use crate::error::{Result, SimplificationError};
use crate::MeshSimplifier;
use qemesh_core::TriangleMesh;

/// Quadric error decimation simplifier
///
/// Runs a [`QemMesh`] session over a copy of the input and returns the
/// reduced mesh.
#[derive(Debug, Clone, Default)]
pub struct QuadricErrorSimplifier {
    pub config: QemConfig,
}

impl QuadricErrorSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QemConfig) -> Self {
        Self { config }
    }
}

impl MeshSimplifier for QuadricErrorSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        if mesh.is_empty() {
            return Err(SimplificationError::EmptyMesh);
        }
        if !(0.0..=1.0).contains(&reduction_ratio) {
            return Err(SimplificationError::InvalidRatio(reduction_ratio));
        }

        let target = ((1.0 - reduction_ratio) * mesh.face_count() as f32) as usize;
        if target >= mesh.face_count() {
            return Ok(mesh.clone());
        }

        let mut session = QemMesh::with_config(mesh, self.config.clone())?;
        session.simplify(target)?;
        Ok(session.to_triangle_mesh())
    }
}
