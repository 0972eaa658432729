//! Bookkeeping for simplification sessions.

use qemesh_core::Point3f;

/// Outcome of a single edge contraction.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseRecord {
    /// Slot of the surviving vertex after the collapse
    pub kept: usize,
    /// Slot the removed vertex occupied before the collapse
    pub removed: usize,
    /// New position of the surviving vertex
    pub position: Point3f,
    pub cost: f64,
    pub triangles_removed: usize,
}

/// Cumulative counters for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseStats {
    pub collapses_performed: usize,
    /// Edges popped from the worklist but not collapsed
    pub collapses_rejected: usize,
    pub triangles_removed: usize,
}

impl CollapseStats {
    pub fn record(&mut self, collapse: &CollapseRecord) {
        self.collapses_performed += 1;
        self.triangles_removed += collapse.triangles_removed;
    }

    pub fn was_simplified(&self) -> bool {
        self.collapses_performed > 0
    }
}

impl std::fmt::Display for CollapseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} collapses ({} rejected), {} triangles removed",
            self.collapses_performed, self.collapses_rejected, self.triangles_removed
        )
    }
}
