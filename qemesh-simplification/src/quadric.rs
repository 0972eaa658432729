//! Quadric cost engine
//!
//! Computes triangle quadrics, accumulates them per edge, solves for the
//! optimal collapse position and evaluates the error of collapsing there.

use crate::topology::{EdgeId, MeshTopology, TriangleId};
use nalgebra::{Matrix4, Vector4};
use qemesh_core::geometry::{self, homogeneous, quadratic_form, to_f64, try_invert};
use qemesh_core::Point3d;

/// Result of evaluating one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCost {
    pub quadric: Matrix4<f64>,
    /// Optimal (or midpoint fallback) position of the merged vertex
    pub target: Point3d,
    pub cost: f64,
    /// True when the quadric was singular and the midpoint was used
    pub singular: bool,
}

/// Quadric of a single triangle from three positions.
pub fn compute_triangle_quadric(a: &Point3d, b: &Point3d, c: &Point3d) -> Matrix4<f64> {
    geometry::triangle_quadric(a, b, c)
}

/// Quadric of a live triangle in the store, zero for dead slots.
pub fn triangle_quadric(topology: &MeshTopology, id: TriangleId) -> Matrix4<f64> {
    let Some([i, j, k]) = topology.triangle(id) else {
        return Matrix4::zeros();
    };
    let p = topology.positions();
    compute_triangle_quadric(&to_f64(&p[i]), &to_f64(&p[j]), &to_f64(&p[k]))
}

/// Sum of the quadrics of every triangle incident to `v`.
pub fn vertex_quadric(topology: &MeshTopology, v: usize) -> Matrix4<f64> {
    topology
        .triangles_of(v)
        .iter()
        .fold(Matrix4::zeros(), |acc, &t| geometry::add(&acc, &triangle_quadric(topology, t)))
}

/// Evaluate collapsing edge `{a, b}`.
///
/// `Q` is the sum of the triangle quadrics around `a` plus those around `b`.
/// The target solves `Q' w = (0, 0, 0, 1)` where `Q'` is `Q` with its last row
/// replaced by `[0, 0, 0, 1]`; when `Q'` is singular the midpoint of `a` and
/// `b` is used. The cost is `w^T Q w`, clamped at zero.
pub fn compute_edge_cost(topology: &MeshTopology, a: usize, b: usize) -> EdgeCost {
    let quadric = vertex_quadric(topology, a) + vertex_quadric(topology, b);
    let pa = to_f64(&topology.positions()[a]);
    let pb = to_f64(&topology.positions()[b]);
    evaluate(&quadric, &pa, &pb, topology.singular_epsilon())
}

/// Solve and evaluate a quadric for a collapse between `pa` and `pb`.
pub fn evaluate(quadric: &Matrix4<f64>, pa: &Point3d, pb: &Point3d, epsilon: f64) -> EdgeCost {
    let mut solve = *quadric;
    solve.set_row(3, &Vector4::new(0.0, 0.0, 0.0, 1.0).transpose());

    let optimum = try_invert(&solve, epsilon)
        .map(|inv| geometry::mul_matrix_vector(&inv, &Vector4::w()))
        .map(|w| Point3d::new(w.x, w.y, w.z))
        .filter(|p| p.coords.iter().all(|c| c.is_finite()));

    let (target, singular) = match optimum {
        Some(p) => (p, false),
        None => (Point3d::from((pa.coords + pb.coords) * 0.5), true),
    };
    // Round-off can yield -0.0 or tiny negatives; both rank as exactly zero.
    let cost = match quadratic_form(quadric, &homogeneous(&target)) {
        c if c.is_nan() => f64::MAX,
        c if c > 0.0 => c,
        _ => 0.0,
    };
    EdgeCost {
        quadric: *quadric,
        target,
        cost,
        singular,
    }
}

/// Recompute the cost of every edge incident to `v`, returning the updated
/// `(edge, cost)` pairs so they can be rescheduled.
pub fn recompute_affected(topology: &mut MeshTopology, v: usize) -> Vec<(EdgeId, f64)> {
    let edges: Vec<EdgeId> = topology.edges_of(v).iter().copied().collect();
    edges
        .into_iter()
        .filter_map(|id| {
            let (a, b) = topology.edge(id).map(|e| (e.a, e.b))?;
            let cost = compute_edge_cost(topology, a, b);
            topology.set_edge_cost(id, cost);
            Some((id, cost.cost))
        })
        .collect()
}

/// Recompute every live edge.
pub fn compute_all_costs(topology: &mut MeshTopology) {
    let edges: Vec<EdgeId> = topology.live_edge_ids().collect();
    for id in edges {
        if let Some((a, b)) = topology.edge(id).map(|e| (e.a, e.b)) {
            let cost = compute_edge_cost(topology, a, b);
            topology.set_edge_cost(id, cost);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qemesh_core::geometry::DEFAULT_SINGULAR_EPSILON;
    use qemesh_core::{Point3f, TriangleMesh};

    fn store(mesh: &TriangleMesh) -> MeshTopology {
        MeshTopology::from_triangle_mesh(mesh, DEFAULT_SINGULAR_EPSILON).unwrap()
    }

    /// Unit cube corner: three orthogonal faces meeting at the origin
    fn corner() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2]],
        )
    }

    #[test]
    fn test_triangle_quadric_zero_area() {
        let p = Point3d::new(1.0, 2.0, 3.0);
        assert_eq!(compute_triangle_quadric(&p, &p, &p), Matrix4::zeros());
    }

    #[test]
    fn test_vertex_quadric_is_sum_of_incident() {
        let topo = store(&corner());
        let expected = topo
            .triangles_of(0)
            .iter()
            .map(|&t| triangle_quadric(&topo, t))
            .fold(Matrix4::zeros(), |a, b| a + b);
        assert_relative_eq!(vertex_quadric(&topo, 0), expected, epsilon = 1e-12);
        assert_eq!(topo.triangles_of(0).len(), 3);
    }

    #[test]
    fn test_corner_optimum_is_the_corner() {
        let topo = store(&corner());
        // Vertex 0 sees all three planes, so the edge quadric has full rank
        let cost = compute_edge_cost(&topo, 0, 1);
        assert!(!cost.singular);
        assert_relative_eq!(cost.target, Point3d::origin(), epsilon = 1e-9);
        assert_relative_eq!(cost.cost, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coplanar_edge_falls_back_to_midpoint() {
        let quad = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let topo = store(&quad);
        let cost = compute_edge_cost(&topo, 0, 2);
        assert!(cost.singular);
        assert_relative_eq!(cost.target, Point3d::new(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert!(cost.cost <= 1e-12);
    }

    #[test]
    fn test_coincident_vertices_do_not_produce_nan() {
        let p = Point3f::new(2.0, 2.0, 2.0);
        let mesh = TriangleMesh::from_vertices_and_faces(vec![p; 4], vec![[0, 1, 2], [0, 2, 3]]);
        let topo = store(&mesh);
        for id in topo.live_edge_ids() {
            let edge = topo.edge(id).unwrap();
            let cost = compute_edge_cost(&topo, edge.a, edge.b);
            assert!(cost.singular);
            assert_eq!(cost.cost, 0.0);
            assert_relative_eq!(cost.target, Point3d::new(2.0, 2.0, 2.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cost_measures_distance_from_planes() {
        // Single plane z = 0, collapse to a point 2 units above it
        let q = compute_triangle_quadric(
            &Point3d::new(0.0, 0.0, 0.0),
            &Point3d::new(1.0, 0.0, 0.0),
            &Point3d::new(0.0, 1.0, 0.0),
        );
        let cost = evaluate(&q, &Point3d::new(0.0, 0.0, 2.0), &Point3d::new(0.0, 0.0, 2.0), DEFAULT_SINGULAR_EPSILON);
        assert!(cost.singular);
        assert_relative_eq!(cost.cost, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recompute_affected_touches_only_incident_edges() {
        let mut topo = store(&corner());
        let untouched = topo.find_edge(1, 2).unwrap();
        let before = topo.edge(untouched).unwrap().cost;

        topo.set_position(0, Point3f::new(0.0, 0.0, 0.5));
        let updated = recompute_affected(&mut topo, 3);

        let ids: Vec<EdgeId> = updated.iter().map(|&(id, _)| id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&untouched));
        assert_eq!(topo.edge(untouched).unwrap().cost, before);
        for (id, cost) in updated {
            assert_eq!(topo.edge(id).unwrap().cost, cost);
        }
    }
}
