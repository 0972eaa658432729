//! Resolution of OBJ-style face corners into an indexed triangle mesh
//!
//! A loader hands over raw attribute pools and faces whose corners are
//! 1-based `(position, uv, normal)` triples. Polygons are fan-triangulated
//! and corners are resolved to 0-based position indices, so that the
//! resulting [`TriangleMesh`] has exactly one vertex per position.

use crate::error::{Error, Result};
use crate::mesh::TriangleMesh;
use crate::point::*;

/// One corner of an OBJ face, with 1-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceCorner {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceCorner {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            uv: None,
            normal: None,
        }
    }

    pub fn with_uv(mut self, uv: usize) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_normal(mut self, normal: usize) -> Self {
        self.normal = Some(normal);
        self
    }
}

/// Convert a 1-based OBJ index into a 0-based one, checking bounds.
fn resolve(index: usize, len: usize, what: &'static str) -> Result<usize> {
    if index == 0 {
        return Err(Error::InvalidData(format!("{} index 0 is not a valid OBJ index", what)));
    }
    let zero_based = index - 1;
    if zero_based >= len {
        return Err(Error::IndexOutOfBounds {
            what,
            index: zero_based,
            len,
        });
    }
    Ok(zero_based)
}

/// Build a [`TriangleMesh`] from attribute pools and OBJ polygon faces.
///
/// Polygons with `n >= 3` corners become `n - 2` fan triangles; fan
/// triangles that repeat a position index are dropped. Normals and uvs are
/// attached only when their pool is non-empty; each vertex takes the
/// attribute of the first corner that references it, and vertices never
/// given one fall back to `+Z` / `(0, 0)`.
pub fn triangulate_faces(
    positions: &[Point3f],
    normals: &[Vector3f],
    uvs: &[Vector2f],
    faces: &[Vec<FaceCorner>],
) -> Result<TriangleMesh> {
    let mut vertex_normals: Vec<Option<Vector3f>> = vec![None; positions.len()];
    let mut vertex_uvs: Vec<Option<Vector2f>> = vec![None; positions.len()];
    let mut triangles = Vec::with_capacity(faces.len());

    for (fi, polygon) in faces.iter().enumerate() {
        if polygon.len() < 3 {
            return Err(Error::InvalidData(format!(
                "face {} has {} corners, need at least 3",
                fi,
                polygon.len()
            )));
        }

        let mut resolved = Vec::with_capacity(polygon.len());
        for corner in polygon {
            let vi = resolve(corner.position, positions.len(), "positions")?;
            if let Some(ni) = corner.normal.filter(|_| !normals.is_empty()) {
                let ni = resolve(ni, normals.len(), "normals")?;
                vertex_normals[vi].get_or_insert(normals[ni]);
            }
            if let Some(ti) = corner.uv.filter(|_| !uvs.is_empty()) {
                let ti = resolve(ti, uvs.len(), "uvs")?;
                vertex_uvs[vi].get_or_insert(uvs[ti]);
            }
            resolved.push(vi);
        }

        for k in 1..resolved.len() - 1 {
            let tri = [resolved[0], resolved[k], resolved[k + 1]];
            if tri[0] != tri[1] && tri[1] != tri[2] && tri[2] != tri[0] {
                triangles.push(tri);
            }
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_faces(positions.to_vec(), triangles);
    if !normals.is_empty() {
        mesh.set_normals(
            vertex_normals
                .into_iter()
                .map(|n| n.unwrap_or_else(Vector3f::z))
                .collect(),
        );
    }
    if !uvs.is_empty() {
        mesh.set_uvs(
            vertex_uvs
                .into_iter()
                .map(|t| t.unwrap_or_else(Vector2f::zeros))
                .collect(),
        );
    }
    Ok(mesh)
}
