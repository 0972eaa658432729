//! Mesh topology store
//!
//! Dense vertex arrays plus triangle and edge records with per-vertex
//! adjacency. Vertices are identified by their current array slot; removing
//! one shifts every later slot down by one, and [`MeshTopology::remove_vertex`]
//! is the only routine that does so. Triangles and edges live in slot arrays
//! whose ids never move, so a removed record just leaves an empty slot.

use crate::error::{Result, SimplificationError};
use crate::quadric::{self, EdgeCost};
use itertools::Itertools;
use nalgebra::Matrix4;
use qemesh_core::{Point3d, Point3f, TriangleMesh, Vector2f, Vector3f};
use std::collections::{BTreeSet, HashMap};
use tracing::error;

pub type TriangleId = usize;
pub type EdgeId = usize;

/// An undirected edge between two vertices, with its collapse cost.
#[derive(Debug, Clone)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    /// A live triangle containing both endpoints
    pub triangle: TriangleId,
    /// Sum of the triangle quadrics around `a` and around `b`
    pub quadric: Matrix4<f64>,
    /// Position the merged vertex moves to when this edge collapses
    pub target: Point3d,
    pub cost: f64,
}

impl Edge {
    pub fn contains(&self, v: usize) -> bool {
        self.a == v || self.b == v
    }

    /// The endpoint that is not `v`.
    pub fn opposite(&self, v: usize) -> usize {
        if self.a == v {
            self.b
        } else {
            self.a
        }
    }

    fn apply_cost(&mut self, cost: EdgeCost) {
        self.quadric = cost.quadric;
        self.target = cost.target;
        self.cost = cost.cost;
    }
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Indexed triangle mesh with vertex-to-triangle and vertex-to-edge adjacency.
#[derive(Debug, Clone)]
pub struct MeshTopology {
    positions: Vec<Point3f>,
    normals: Option<Vec<Vector3f>>,
    uvs: Option<Vec<Vector2f>>,
    triangles: Vec<Option<[usize; 3]>>,
    live_triangles: usize,
    edges: Vec<Option<Edge>>,
    edge_index: HashMap<(usize, usize), EdgeId>,
    vertex_triangles: Vec<BTreeSet<TriangleId>>,
    vertex_edges: Vec<BTreeSet<EdgeId>>,
    singular_epsilon: f64,
}

impl MeshTopology {
    /// Create a store holding the given vertices and no triangles.
    pub fn new(
        positions: Vec<Point3f>,
        normals: Option<Vec<Vector3f>>,
        uvs: Option<Vec<Vector2f>>,
        singular_epsilon: f64,
    ) -> Self {
        let n = positions.len();
        Self {
            positions,
            normals: normals.filter(|v| v.len() == n),
            uvs: uvs.filter(|v| v.len() == n),
            triangles: Vec::new(),
            live_triangles: 0,
            edges: Vec::new(),
            edge_index: HashMap::new(),
            vertex_triangles: vec![BTreeSet::new(); n],
            vertex_edges: vec![BTreeSet::new(); n],
            singular_epsilon,
        }
    }

    /// Populate a store from loader output and bring every edge cost up to date.
    pub fn from_triangle_mesh(mesh: &TriangleMesh, singular_epsilon: f64) -> Result<Self> {
        let mut topology = Self::new(
            mesh.vertices.clone(),
            mesh.normals.clone(),
            mesh.uvs.clone(),
            singular_epsilon,
        );
        topology.triangles.reserve(mesh.faces.len());
        topology.edges.reserve(mesh.faces.len() * 3 / 2);
        for face in &mesh.faces {
            topology.add_triangle(face[0], face[1], face[2])?;
        }
        // Costs computed while triangles were still arriving saw partial
        // neighbourhoods.
        quadric::compute_all_costs(&mut topology);
        Ok(topology)
    }

    /// Append triangle `(i, j, k)` and register it with its vertices and edges.
    pub fn add_triangle(&mut self, i: usize, j: usize, k: usize) -> Result<TriangleId> {
        let id = self.triangles.len();
        for v in [i, j, k] {
            self.check_vertex(v, "add_triangle")?;
        }
        if i == j || j == k || k == i {
            return Err(SimplificationError::InvalidTriangle {
                triangle: id,
                reason: format!("repeated vertex in ({}, {}, {})", i, j, k),
            });
        }

        self.triangles.push(Some([i, j, k]));
        self.live_triangles += 1;
        for v in [i, j, k] {
            self.vertex_triangles[v].insert(id);
        }
        for (a, b) in [i, j, k].into_iter().circular_tuple_windows() {
            self.add_edge(a, b, id)?;
        }
        Ok(id)
    }

    /// Create edge `{a, b}` owned by `triangle`, or refresh the existing one.
    ///
    /// The edge's quadric and cost are computed immediately from the current
    /// adjacency.
    pub fn add_edge(&mut self, a: usize, b: usize, triangle: TriangleId) -> Result<EdgeId> {
        self.check_vertex(a, "add_edge")?;
        self.check_vertex(b, "add_edge")?;
        if a == b {
            return Err(SimplificationError::InvalidTriangle {
                triangle,
                reason: format!("edge ({}, {}) is a self-loop", a, b),
            });
        }
        if self.triangle(triangle).is_none() {
            return Err(SimplificationError::IndexOutOfBounds {
                context: "add_edge owning triangle",
                index: triangle,
                len: self.triangles.len(),
            });
        }

        let cost = quadric::compute_edge_cost(self, a, b);
        if let Some(&id) = self.edge_index.get(&edge_key(a, b)) {
            if let Some(edge) = self.edges[id].as_mut() {
                edge.apply_cost(cost);
            }
            return Ok(id);
        }

        let id = self.edges.len();
        self.edges.push(Some(Edge {
            a,
            b,
            triangle,
            quadric: cost.quadric,
            target: cost.target,
            cost: cost.cost,
        }));
        self.edge_index.insert(edge_key(a, b), id);
        self.vertex_edges[a].insert(id);
        self.vertex_edges[b].insert(id);
        Ok(id)
    }

    /// Delete vertex `index`, shifting every stored reference above it down
    /// by one.
    ///
    /// The vertex must already be unreferenced. A live triangle or edge that
    /// still points at it is a reindexing defect and is reported as
    /// [`SimplificationError::IndexOutOfBounds`] before anything is changed.
    pub fn remove_vertex(&mut self, index: usize) -> Result<()> {
        self.check_vertex(index, "remove_vertex")?;
        let stale_triangle = self.live_triangle_ids().find(|&t| {
            self.triangles[t].is_some_and(|tri| tri.contains(&index))
        });
        let stale_edge = self.live_edge_ids().find(|&e| {
            self.edges[e].as_ref().is_some_and(|edge| edge.contains(index))
        });
        if stale_triangle.is_some()
            || stale_edge.is_some()
            || !self.vertex_triangles[index].is_empty()
            || !self.vertex_edges[index].is_empty()
        {
            error!(
                vertex = index,
                ?stale_triangle,
                ?stale_edge,
                "vertex is still referenced while being removed"
            );
            return Err(SimplificationError::IndexOutOfBounds {
                context: "remove_vertex: vertex still referenced",
                index,
                len: self.positions.len(),
            });
        }

        self.positions.remove(index);
        if let Some(normals) = self.normals.as_mut() {
            normals.remove(index);
        }
        if let Some(uvs) = self.uvs.as_mut() {
            uvs.remove(index);
        }
        self.vertex_triangles.remove(index);
        self.vertex_edges.remove(index);

        let shift = |v: &mut usize| {
            if *v > index {
                *v -= 1;
            }
        };
        for tri in self.triangles.iter_mut().flatten() {
            tri.iter_mut().for_each(shift);
        }
        for edge in self.edges.iter_mut().flatten() {
            shift(&mut edge.a);
            shift(&mut edge.b);
        }
        self.edge_index = self
            .edges
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.as_ref().map(|e| (edge_key(e.a, e.b), id)))
            .collect();
        Ok(())
    }

    /// Number of live triangles
    pub fn total_triangles(&self) -> usize {
        self.live_triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    pub fn normals(&self) -> Option<&[Vector3f]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[Vector2f]> {
        self.uvs.as_deref()
    }

    pub fn singular_epsilon(&self) -> f64 {
        self.singular_epsilon
    }

    pub fn triangle(&self, id: TriangleId) -> Option<[usize; 3]> {
        self.triangles.get(id).copied().flatten()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id).and_then(Option::as_ref)
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<EdgeId> {
        self.edge_index.get(&edge_key(a, b)).copied()
    }

    /// Live triangles incident to `v`
    pub fn triangles_of(&self, v: usize) -> &BTreeSet<TriangleId> {
        &self.vertex_triangles[v]
    }

    /// Live edges incident to `v`
    pub fn edges_of(&self, v: usize) -> &BTreeSet<EdgeId> {
        &self.vertex_edges[v]
    }

    pub fn live_triangle_ids(&self) -> impl Iterator<Item = TriangleId> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .filter_map(|(id, t)| t.map(|_| id))
    }

    pub fn live_edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.as_ref().map(|_| id))
    }

    /// Live triangles in id order
    pub fn faces(&self) -> Vec<[usize; 3]> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Flat index list for indexed draw submission
    pub fn index_buffer(&self) -> Vec<u32> {
        self.triangles
            .iter()
            .flatten()
            .flat_map(|t| t.iter().map(|&v| v as u32))
            .collect()
    }

    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        TriangleMesh {
            vertices: self.positions.clone(),
            faces: self.faces(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
        }
    }

    /// Check every structural invariant, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        let oob = |context, index| SimplificationError::IndexOutOfBounds {
            context,
            index,
            len: n,
        };

        if self.vertex_triangles.len() != n || self.vertex_edges.len() != n {
            return Err(oob("adjacency length", self.vertex_triangles.len().max(self.vertex_edges.len())));
        }
        for id in self.live_triangle_ids() {
            let [i, j, k] = self.triangles[id].unwrap_or_default();
            if let Some(&v) = [i, j, k].iter().find(|&&v| v >= n) {
                return Err(oob("triangle vertex", v));
            }
            if i == j || j == k || k == i {
                return Err(SimplificationError::InvalidTriangle {
                    triangle: id,
                    reason: format!("degenerate ({}, {}, {})", i, j, k),
                });
            }
            if [i, j, k].iter().any(|&v| !self.vertex_triangles[v].contains(&id)) {
                return Err(oob("triangle missing from vertex adjacency", id));
            }
        }
        for id in self.live_edge_ids() {
            let Some(edge) = self.edge(id) else { continue };
            if edge.a >= n || edge.b >= n {
                return Err(oob("edge endpoint", edge.a.max(edge.b)));
            }
            if edge.a == edge.b {
                return Err(oob("edge self-loop", edge.a));
            }
            if !self
                .triangle(edge.triangle)
                .is_some_and(|t| t.contains(&edge.a) && t.contains(&edge.b))
            {
                return Err(oob("edge owner is not a live triangle on the edge", edge.triangle));
            }
            if self.find_edge(edge.a, edge.b) != Some(id) {
                return Err(oob("edge missing from edge index", id));
            }
            if !self.vertex_edges[edge.a].contains(&id) || !self.vertex_edges[edge.b].contains(&id) {
                return Err(oob("edge missing from vertex adjacency", id));
            }
        }
        for v in 0..n {
            if let Some(&t) = self.vertex_triangles[v]
                .iter()
                .find(|&&t| !self.triangle(t).is_some_and(|tri| tri.contains(&v)))
            {
                return Err(oob("stale vertex-triangle entry", t));
            }
            if let Some(&e) = self.vertex_edges[v]
                .iter()
                .find(|&&e| !self.edge(e).is_some_and(|edge| edge.contains(v)))
            {
                return Err(oob("stale vertex-edge entry", e));
            }
        }
        Ok(())
    }

    fn check_vertex(&self, v: usize, context: &'static str) -> Result<()> {
        if v >= self.positions.len() {
            return Err(SimplificationError::IndexOutOfBounds {
                context,
                index: v,
                len: self.positions.len(),
            });
        }
        Ok(())
    }

    // ---- mutation helpers for the contraction executor ----

    pub(crate) fn set_position(&mut self, v: usize, position: Point3f) {
        self.positions[v] = position;
    }

    /// Average the attributes of `b` into `a`.
    pub(crate) fn blend_attributes(&mut self, a: usize, b: usize) {
        if let Some(normals) = self.normals.as_mut() {
            let sum = normals[a] + normals[b];
            if let Some(n) = sum.try_normalize(f32::EPSILON) {
                normals[a] = n;
            }
        }
        if let Some(uvs) = self.uvs.as_mut() {
            uvs[a] = (uvs[a] + uvs[b]) * 0.5;
        }
    }

    pub(crate) fn set_edge_cost(&mut self, id: EdgeId, cost: EdgeCost) {
        if let Some(edge) = self.edges[id].as_mut() {
            edge.apply_cost(cost);
        }
    }

    /// Remove a triangle from the mesh and from its vertices' adjacency.
    pub(crate) fn remove_triangle(&mut self, id: TriangleId) {
        if let Some(tri) = self.triangles[id].take() {
            for v in tri {
                self.vertex_triangles[v].remove(&id);
            }
            self.live_triangles -= 1;
        }
    }

    /// Rewrite every `from` reference in triangle `id` to `to`.
    pub(crate) fn retarget_triangle(&mut self, id: TriangleId, from: usize, to: usize) {
        if let Some(tri) = self.triangles[id].as_mut() {
            for v in tri.iter_mut().filter(|v| **v == from) {
                *v = to;
            }
            self.vertex_triangles[from].remove(&id);
            self.vertex_triangles[to].insert(id);
        }
    }

    /// Remove an edge from the mesh and from its endpoints' adjacency.
    pub(crate) fn remove_edge(&mut self, id: EdgeId) {
        if let Some(edge) = self.edges[id].take() {
            self.vertex_edges[edge.a].remove(&id);
            self.vertex_edges[edge.b].remove(&id);
            if self.edge_index.get(&edge_key(edge.a, edge.b)) == Some(&id) {
                self.edge_index.remove(&edge_key(edge.a, edge.b));
            }
        }
    }

    /// Move the `from` endpoint of edge `id` to `to`.
    pub(crate) fn retarget_edge(&mut self, id: EdgeId, from: usize, to: usize) {
        let Some(edge) = self.edges[id].as_mut() else { return };
        let old_key = edge_key(edge.a, edge.b);
        if edge.a == from {
            edge.a = to;
        }
        if edge.b == from {
            edge.b = to;
        }
        let new_key = edge_key(edge.a, edge.b);
        self.edge_index.remove(&old_key);
        self.edge_index.insert(new_key, id);
        self.vertex_edges[from].remove(&id);
        self.vertex_edges[to].insert(id);
    }

    /// Point edge `id` at a live triangle containing both endpoints.
    /// Returns false when no such triangle exists.
    pub(crate) fn refresh_edge_owner(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.edges[id].as_ref() else { return false };
        let (a, b, owner) = (edge.a, edge.b, edge.triangle);
        let owns = |t: TriangleId| self.triangle(t).is_some_and(|tri| tri.contains(&a) && tri.contains(&b));
        if owns(owner) {
            return true;
        }
        let replacement = self.vertex_triangles[a].iter().copied().find(|&t| owns(t));
        match (replacement, self.edges[id].as_mut()) {
            (Some(t), Some(edge)) => {
                edge.triangle = t;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qemesh_core::geometry::DEFAULT_SINGULAR_EPSILON;

    fn tetrahedron() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.5, 1.0, 0.0),
                Point3f::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    fn store(mesh: &TriangleMesh) -> MeshTopology {
        MeshTopology::from_triangle_mesh(mesh, DEFAULT_SINGULAR_EPSILON).unwrap()
    }

    #[test]
    fn test_tetrahedron_adjacency() {
        let topo = store(&tetrahedron());
        assert_eq!(topo.total_triangles(), 4);
        assert_eq!(topo.vertex_count(), 4);
        assert_eq!(topo.edge_count(), 6);
        for v in 0..4 {
            assert_eq!(topo.triangles_of(v).len(), 3);
            assert_eq!(topo.edges_of(v).len(), 3);
        }
        topo.validate().unwrap();
    }

    #[test]
    fn test_add_edge_dedupes_unordered_pairs() {
        let mut topo = store(&tetrahedron());
        let id = topo.find_edge(0, 1).unwrap();
        assert_eq!(topo.add_edge(1, 0, 0).unwrap(), id);
        assert_eq!(topo.edge_count(), 6);
        assert_eq!(topo.find_edge(1, 0), Some(id));
    }

    #[test]
    fn test_add_triangle_rejects_bad_indices() {
        let mut topo = store(&tetrahedron());
        assert!(matches!(
            topo.add_triangle(0, 1, 9),
            Err(SimplificationError::IndexOutOfBounds { index: 9, .. })
        ));
        assert!(matches!(
            topo.add_triangle(0, 1, 1),
            Err(SimplificationError::InvalidTriangle { .. })
        ));
        assert_eq!(topo.total_triangles(), 4);
        topo.validate().unwrap();
    }

    #[test]
    fn test_remove_unreferenced_vertex_shifts_indices() {
        let mut mesh = tetrahedron();
        // Unreferenced vertex in slot 0 pushes every face index up by one
        mesh.vertices.insert(0, Point3f::new(9.0, 9.0, 9.0));
        for face in &mut mesh.faces {
            face.iter_mut().for_each(|v| *v += 1);
        }
        let mut topo = store(&mesh);
        let edge = topo.find_edge(1, 2).unwrap();

        topo.remove_vertex(0).unwrap();

        assert_eq!(topo.vertex_count(), 4);
        assert_eq!(topo.faces(), tetrahedron().faces);
        assert_eq!(topo.find_edge(0, 1), Some(edge));
        assert_eq!(topo.positions()[0], Point3f::new(0.0, 0.0, 0.0));
        topo.validate().unwrap();
    }

    #[test]
    fn test_remove_referenced_vertex_is_rejected() {
        let mut topo = store(&tetrahedron());
        let before = topo.faces();
        assert!(matches!(
            topo.remove_vertex(2),
            Err(SimplificationError::IndexOutOfBounds { index: 2, .. })
        ));
        assert!(topo.remove_vertex(17).is_err());
        assert_eq!(topo.faces(), before);
        assert_eq!(topo.vertex_count(), 4);
    }

    #[test]
    fn test_remove_vertex_keeps_attributes_in_lockstep() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(5.0, 5.0, 5.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 2, 3]],
        );
        mesh.set_normals((0..4).map(|i| Vector3f::new(i as f32, 0.0, 1.0)).collect());
        mesh.set_uvs((0..4).map(|i| Vector2f::new(i as f32, 0.0)).collect());
        let mut topo = store(&mesh);

        topo.remove_vertex(1).unwrap();

        assert_eq!(topo.faces(), vec![[0, 1, 2]]);
        assert_eq!(topo.normals().unwrap()[1], Vector3f::new(2.0, 0.0, 1.0));
        assert_eq!(topo.uvs().unwrap()[2], Vector2f::new(3.0, 0.0));
        topo.validate().unwrap();
    }

    #[test]
    fn test_mismatched_attributes_are_dropped() {
        let mut mesh = tetrahedron();
        mesh.normals = Some(vec![Vector3f::z(); 2]);
        let topo = store(&mesh);
        assert!(topo.normals().is_none());
    }

    #[test]
    fn test_remove_triangle_updates_adjacency() {
        let mut topo = store(&tetrahedron());
        topo.remove_triangle(0);
        assert_eq!(topo.total_triangles(), 3);
        assert!(!topo.triangles_of(0).contains(&0));
        assert!(topo.triangle(0).is_none());
        // Edges owned by the removed triangle are stale until re-owned
        assert!(topo.validate().is_err());
        let edges: Vec<EdgeId> = topo.live_edge_ids().collect();
        for e in edges {
            assert!(topo.refresh_edge_owner(e));
        }
        topo.validate().unwrap();
    }

    #[test]
    fn test_edge_opposite() {
        let topo = store(&tetrahedron());
        let edge = topo.edge(topo.find_edge(2, 3).unwrap()).unwrap();
        assert_eq!(edge.opposite(2), 3);
        assert_eq!(edge.opposite(3), 2);
        assert!(topo.triangle(edge.triangle).unwrap().contains(&2));
    }
}
