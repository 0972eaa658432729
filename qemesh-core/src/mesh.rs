//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh with optional per-vertex normals and uvs.
///
/// This is the exchange format between a loader, the simplifier and a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3f>>,
    pub uvs: Option<Vec<Vector2f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
            uvs: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
            uvs: None,
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Set vertex normals; ignored unless there is one per vertex
    pub fn set_normals(&mut self, normals: Vec<Vector3f>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }

    /// Set texture coordinates; ignored unless there is one per vertex
    pub fn set_uvs(&mut self, uvs: Vec<Vector2f>) {
        if uvs.len() == self.vertices.len() {
            self.uvs = Some(uvs);
        }
    }

    /// Flat triangle index list for indexed draw submission
    pub fn index_buffer(&self) -> Vec<u32> {
        self.faces
            .iter()
            .flat_map(|f| f.iter().map(|&i| i as u32))
            .collect()
    }

    /// Interleaved vertex buffer for the renderer
    pub fn render_vertices(&self) -> Vec<RenderVertex> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                RenderVertex::new(
                    p,
                    self.normals.as_ref().and_then(|n| n.get(i)),
                    self.uvs.as_ref().and_then(|u| u.get(i)),
                )
            })
            .collect()
    }

    /// Check that every face references three distinct in-bounds vertices
    /// and that attribute arrays match the vertex count.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&index) = face.iter().find(|&&i| i >= n) {
                return Err(Error::IndexOutOfBounds {
                    what: "vertices",
                    index,
                    len: n,
                });
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                return Err(Error::InvalidData(format!(
                    "face {} is degenerate: {:?}",
                    fi, face
                )));
            }
        }
        if self.normals.as_ref().is_some_and(|v| v.len() != n) {
            return Err(Error::InvalidData("normal count does not match vertex count".to_string()));
        }
        if self.uvs.as_ref().is_some_and(|v| v.len() != n) {
            return Err(Error::InvalidData("uv count does not match vertex count".to_string()));
        }
        Ok(())
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.normals = None;
        self.uvs = None;
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}
