//! Configuration for quadric error simplification

use qemesh_core::geometry::DEFAULT_SINGULAR_EPSILON;

/// Tuning knobs for a [`QemMesh`](crate::QemMesh) session.
#[derive(Debug, Clone, PartialEq)]
pub struct QemConfig {
    /// Determinant magnitude below which an error quadric is treated as
    /// singular and the edge midpoint is used instead of the optimum.
    pub singular_epsilon: f64,
    /// Stop early once the cheapest remaining collapse costs more than this
    pub max_error: Option<f64>,
    /// Average normals and uvs of the two merged vertices. When false the
    /// surviving vertex keeps its own attributes.
    pub interpolate_attributes: bool,
}

impl Default for QemConfig {
    fn default() -> Self {
        Self {
            singular_epsilon: DEFAULT_SINGULAR_EPSILON,
            max_error: None,
            interpolate_attributes: true,
        }
    }
}

impl QemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        singular_epsilon: f64,
        max_error: Option<f64>,
        interpolate_attributes: bool,
    ) -> Self {
        Self {
            singular_epsilon,
            max_error,
            interpolate_attributes,
        }
    }

    #[must_use]
    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    #[must_use]
    pub fn with_singular_epsilon(mut self, epsilon: f64) -> Self {
        self.singular_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_interpolate_attributes(mut self, interpolate: bool) -> Self {
        self.interpolate_attributes = interpolate;
        self
    }
}
