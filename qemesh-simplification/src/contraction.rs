//! Edge contraction and the simplification session
//!
//! One contraction step runs to completion before the next begins:
//!
//! 1. select the cheapest scheduled edge `{a, b}`
//! 2. validate it, discarding self-loops and stale entries
//! 3. move `a` to the edge's target position; `b` is the vertex to remove
//! 4. drop triangles containing both `a` and `b`, rewrite `b` to `a` elsewhere
//! 5. fold `b`'s edges into `a`, dropping self-loops and duplicates, then
//!    compact the vertex array through [`MeshTopology::remove_vertex`]
//! 6. recompute and reschedule the edges around the surviving vertex

use crate::config::QemConfig;
use crate::error::{Result, SimplificationError};
use crate::quadric;
use crate::scheduler::CollapseScheduler;
use crate::stats::{CollapseRecord, CollapseStats};
use crate::topology::{EdgeId, MeshTopology, TriangleId};
use qemesh_core::{Point3f, RenderVertex, TriangleMesh, Vector2f, Vector3f};
use tracing::{debug, error, info, trace};

/// A mesh owned by a simplification session.
///
/// The session is a self-contained value: build one per mesh, call
/// [`simplify`](Self::simplify) or step with
/// [`collapse_cheapest`](Self::collapse_cheapest), and read the buffers back
/// between calls.
#[derive(Debug, Clone)]
pub struct QemMesh {
    topology: MeshTopology,
    scheduler: CollapseScheduler,
    config: QemConfig,
    stats: CollapseStats,
}

impl Default for QemMesh {
    fn default() -> Self {
        Self::new(QemConfig::default())
    }
}

impl QemMesh {
    /// Create an empty session.
    pub fn new(config: QemConfig) -> Self {
        Self {
            topology: MeshTopology::new(Vec::new(), None, None, config.singular_epsilon),
            scheduler: CollapseScheduler::new(),
            config,
            stats: CollapseStats::default(),
        }
    }

    pub fn from_triangle_mesh(mesh: &TriangleMesh) -> Result<Self> {
        Self::with_config(mesh, QemConfig::default())
    }

    pub fn with_config(mesh: &TriangleMesh, config: QemConfig) -> Result<Self> {
        let topology = MeshTopology::from_triangle_mesh(mesh, config.singular_epsilon)?;
        let scheduler = CollapseScheduler::from_topology(&topology);
        debug!(
            vertices = topology.vertex_count(),
            triangles = topology.total_triangles(),
            edges = scheduler.len(),
            "built simplification session"
        );
        Ok(Self {
            topology,
            scheduler,
            config,
            stats: CollapseStats::default(),
        })
    }

    /// Add a triangle over existing vertices and schedule the edges around it.
    pub fn add_triangle(&mut self, i: usize, j: usize, k: usize) -> Result<TriangleId> {
        let id = self.topology.add_triangle(i, j, k)?;
        for v in [i, j, k] {
            for (edge, cost) in quadric::recompute_affected(&mut self.topology, v) {
                self.scheduler.schedule(edge, cost);
            }
        }
        Ok(id)
    }

    /// Drop all geometry, keeping the configuration.
    pub fn clear(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn config(&self) -> &QemConfig {
        &self.config
    }

    pub fn stats(&self) -> CollapseStats {
        self.stats
    }

    pub fn topology(&self) -> &MeshTopology {
        &self.topology
    }

    pub fn scheduler(&self) -> &CollapseScheduler {
        &self.scheduler
    }

    pub fn total_triangles(&self) -> usize {
        self.topology.total_triangles()
    }

    pub fn vertex_count(&self) -> usize {
        self.topology.vertex_count()
    }

    pub fn positions(&self) -> &[Point3f] {
        self.topology.positions()
    }

    pub fn normals(&self) -> Option<&[Vector3f]> {
        self.topology.normals()
    }

    pub fn uvs(&self) -> Option<&[Vector2f]> {
        self.topology.uvs()
    }

    pub fn index_buffer(&self) -> Vec<u32> {
        self.topology.index_buffer()
    }

    pub fn render_vertices(&self) -> Vec<RenderVertex> {
        let normals = self.normals();
        let uvs = self.uvs();
        self.positions()
            .iter()
            .enumerate()
            .map(|(i, p)| {
                RenderVertex::new(p, normals.and_then(|n| n.get(i)), uvs.and_then(|u| u.get(i)))
            })
            .collect()
    }

    pub fn to_triangle_mesh(&self) -> TriangleMesh {
        self.topology.to_triangle_mesh()
    }

    pub fn validate(&self) -> Result<()> {
        self.topology.validate()
    }

    /// Collapse edges until at most `target` triangles remain or no edge is
    /// left to collapse.
    ///
    /// Fails without touching the mesh when it is empty or already at or
    /// below `target`.
    pub fn simplify(&mut self, target: usize) -> Result<()> {
        let current = self.total_triangles();
        if current == 0 {
            return Err(SimplificationError::EmptyMesh);
        }
        if target >= current {
            return Err(SimplificationError::AlreadyBelowTarget { current, target });
        }

        info!(current, target, "starting simplification");
        let performed_before = self.stats.collapses_performed;
        while self.total_triangles() > target {
            if self.collapse_cheapest()?.is_none() {
                debug!(remaining = self.total_triangles(), "no collapsible edge left");
                break;
            }
        }
        info!(
            triangles = self.total_triangles(),
            vertices = self.vertex_count(),
            collapses = self.stats.collapses_performed - performed_before,
            "simplification finished"
        );
        Ok(())
    }

    /// Signed entry point; negative targets are rejected before anything else.
    pub fn simplify_to(&mut self, target: i64) -> Result<()> {
        let target =
            usize::try_from(target).map_err(|_| SimplificationError::InvalidTargetCount(target))?;
        self.simplify(target)
    }

    /// Perform up to `remove_count` contractions, returning how many ran.
    pub fn contract(&mut self, remove_count: usize) -> Result<usize> {
        if self.total_triangles() == 0 {
            return Err(SimplificationError::EmptyMesh);
        }
        let mut performed = 0;
        while performed < remove_count && self.collapse_cheapest()?.is_some() {
            performed += 1;
        }
        Ok(performed)
    }

    /// Run one contraction on the cheapest valid edge.
    ///
    /// Returns `Ok(None)` when the worklist is exhausted or the cheapest cost
    /// exceeds [`QemConfig::max_error`].
    pub fn collapse_cheapest(&mut self) -> Result<Option<CollapseRecord>> {
        loop {
            let Some((id, cost)) = self.scheduler.peek_cheapest() else {
                return Ok(None);
            };
            if self.config.max_error.is_some_and(|max| cost > max) {
                debug!(edge = id, cost, "cheapest collapse exceeds max error");
                return Ok(None);
            }
            self.scheduler.pop_cheapest();

            let Some((a, b)) = self.topology.edge(id).map(|e| (e.a, e.b)) else {
                debug!(edge = id, "skipping stale edge");
                self.stats.collapses_rejected += 1;
                continue;
            };
            if a == b {
                debug!(edge = id, vertex = a, "skipping self-loop edge");
                self.topology.remove_edge(id);
                self.stats.collapses_rejected += 1;
                continue;
            }
            let len = self.topology.vertex_count();
            if a >= len || b >= len {
                error!(edge = id, a, b, len, "scheduled edge points outside the mesh");
                return Err(SimplificationError::IndexOutOfBounds {
                    context: "collapse endpoint",
                    index: a.max(b),
                    len,
                });
            }

            let record = self.contract_edge(id, a, b)?;
            trace!(
                kept = record.kept,
                removed = record.removed,
                cost = record.cost,
                triangles_removed = record.triangles_removed,
                "collapsed edge"
            );
            self.stats.record(&record);
            return Ok(Some(record));
        }
    }

    /// Contract a specific live edge regardless of its rank in the worklist.
    pub fn collapse_edge(&mut self, id: EdgeId) -> Result<CollapseRecord> {
        let len = self.topology.vertex_count();
        let (a, b) = self
            .topology
            .edge(id)
            .map(|e| (e.a, e.b))
            .filter(|&(a, b)| a != b && a < len && b < len)
            .ok_or(SimplificationError::IndexOutOfBounds {
                context: "collapse_edge: no such live edge",
                index: id,
                len: self.topology.edge_count(),
            })?;
        self.scheduler.remove(id);
        let record = self.contract_edge(id, a, b)?;
        self.stats.record(&record);
        Ok(record)
    }

    fn contract_edge(&mut self, id: EdgeId, a: usize, b: usize) -> Result<CollapseRecord> {
        let (target, cost) = match self.topology.edge(id) {
            Some(edge) => (edge.target, edge.cost),
            None => {
                return Err(SimplificationError::IndexOutOfBounds {
                    context: "contract_edge",
                    index: id,
                    len: self.topology.live_edge_ids().count(),
                })
            }
        };

        let position = Point3f::new(target.x as f32, target.y as f32, target.z as f32);
        self.topology.set_position(a, position);
        if self.config.interpolate_attributes {
            self.topology.blend_attributes(a, b);
        }

        let triangles_removed = self.prune_triangles(a, b);
        self.reindex_adjacency(a, b)?;

        let kept = if a > b { a - 1 } else { a };
        for (edge, cost) in quadric::recompute_affected(&mut self.topology, kept) {
            self.scheduler.schedule(edge, cost);
        }

        Ok(CollapseRecord {
            kept,
            removed: b,
            position,
            cost,
            triangles_removed,
        })
    }

    /// Remove triangles spanning `{a, b}` and point the rest of `b`'s at `a`.
    fn prune_triangles(&mut self, a: usize, b: usize) -> usize {
        let incident: Vec<TriangleId> = self.topology.triangles_of(b).iter().copied().collect();
        let mut removed = 0;
        for t in incident {
            let Some(tri) = self.topology.triangle(t) else { continue };
            if tri.contains(&a) {
                self.topology.remove_triangle(t);
                removed += 1;
            } else {
                self.topology.retarget_triangle(t, b, a);
            }
        }
        removed
    }

    /// Move `b`'s edges onto `a`, discard edges left without a triangle, and
    /// compact `b` out of the vertex array.
    fn reindex_adjacency(&mut self, a: usize, b: usize) -> Result<()> {
        let incident: Vec<EdgeId> = self.topology.edges_of(b).iter().copied().collect();
        for e in incident {
            let Some(c) = self.topology.edge(e).map(|edge| edge.opposite(b)) else { continue };
            if c == a || self.topology.find_edge(a, c).is_some() {
                self.topology.remove_edge(e);
                self.scheduler.remove(e);
            } else {
                self.topology.retarget_edge(e, b, a);
            }
        }

        let around: Vec<EdgeId> = self.topology.edges_of(a).iter().copied().collect();
        for e in around {
            if !self.topology.refresh_edge_owner(e) {
                self.topology.remove_edge(e);
                self.scheduler.remove(e);
            }
        }

        self.topology.remove_vertex(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn plane_grid(size: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..size {
            for x in 0..size {
                vertices.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        let mut faces = Vec::new();
        for y in 0..(size - 1) {
            for x in 0..(size - 1) {
                let tl = y * size + x;
                let tr = tl + 1;
                let bl = (y + 1) * size + x;
                let br = bl + 1;
                faces.push([tl, bl, tr]);
                faces.push([tr, bl, br]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    #[test]
    fn test_single_collapse_on_tetrahedron() {
        let mut mesh = QemMesh::from_triangle_mesh(&tetrahedron()).unwrap();
        let record = mesh.collapse_cheapest().unwrap().unwrap();
        assert_eq!(record.triangles_removed, 2);
        assert_eq!(mesh.total_triangles(), 2);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions()[record.kept], record.position);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_edges_of_removed_vertex_are_merged() {
        let mut mesh = QemMesh::from_triangle_mesh(&tetrahedron()).unwrap();
        mesh.collapse_cheapest().unwrap();
        // Three remaining vertices, each pair joined by exactly one edge
        assert_eq!(mesh.topology().edge_count(), 3);
        assert_eq!(mesh.scheduler().len(), 3);
    }

    #[test]
    fn test_contract_counts_steps() {
        let mut mesh = QemMesh::from_triangle_mesh(&plane_grid(5)).unwrap();
        let before = mesh.total_triangles();
        assert_eq!(mesh.contract(3).unwrap(), 3);
        assert_eq!(mesh.stats().collapses_performed, 3);
        assert!(mesh.total_triangles() < before);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_max_error_stops_early() {
        let config = QemConfig::default().with_max_error(-1.0);
        let mut mesh = QemMesh::with_config(&tetrahedron(), config).unwrap();
        assert!(mesh.collapse_cheapest().unwrap().is_none());
        assert_eq!(mesh.total_triangles(), 4);
        // The cheapest edge stays scheduled
        assert_eq!(mesh.scheduler().len(), 6);
    }

    #[test]
    fn test_attributes_follow_vertices() {
        let mut source = plane_grid(4);
        source.set_normals(vec![Vector3f::z(); source.vertex_count()]);
        source.set_uvs(
            source
                .vertices
                .iter()
                .map(|p| Vector2f::new(p.x / 3.0, p.y / 3.0))
                .collect(),
        );
        let mut mesh = QemMesh::from_triangle_mesh(&source).unwrap();
        mesh.simplify(8).unwrap();
        assert_eq!(mesh.normals().unwrap().len(), mesh.vertex_count());
        assert_eq!(mesh.uvs().unwrap().len(), mesh.vertex_count());
        for n in mesh.normals().unwrap() {
            assert!((n.z - 1.0).abs() < 1e-6);
        }
        assert_eq!(mesh.render_vertices().len(), mesh.vertex_count());
    }

    #[test]
    fn test_add_triangle_schedules_edges() {
        let mut mesh = QemMesh::from_triangle_mesh(&TriangleMesh::from_vertices_and_faces(
            tetrahedron().vertices,
            vec![],
        ))
        .unwrap();
        assert_eq!(mesh.scheduler().len(), 0);
        mesh.add_triangle(0, 1, 2).unwrap();
        mesh.add_triangle(0, 2, 3).unwrap();
        assert_eq!(mesh.scheduler().len(), 5);
        assert_eq!(mesh.total_triangles(), 2);
    }

    #[test]
    fn test_clear_keeps_config() {
        let config = QemConfig::default().with_max_error(2.0);
        let mut mesh = QemMesh::with_config(&tetrahedron(), config.clone()).unwrap();
        mesh.clear();
        assert_eq!(mesh.total_triangles(), 0);
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.config(), &config);
        assert_eq!(mesh.simplify(0), Err(SimplificationError::EmptyMesh));
    }
}
