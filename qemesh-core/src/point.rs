//! Point types and related functionality

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A texture coordinate
pub type Vector2f = Vector2<f32>;

/// Interleaved vertex layout handed to the renderer for indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct RenderVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

unsafe impl Pod for RenderVertex {}
unsafe impl Zeroable for RenderVertex {}

impl RenderVertex {
    pub fn new(position: &Point3f, normal: Option<&Vector3f>, uv: Option<&Vector2f>) -> Self {
        let normal = normal.copied().unwrap_or_else(|| Vector3f::new(0.0, 0.0, 1.0));
        let uv = uv.copied().unwrap_or_else(Vector2f::zeros);
        Self {
            position: [position.x, position.y, position.z],
            normal: [normal.x, normal.y, normal.z],
            uv: [uv.x, uv.y],
        }
    }
}

impl Default for RenderVertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 0.0, 1.0],
            uv: [0.0; 2],
        }
    }
}
