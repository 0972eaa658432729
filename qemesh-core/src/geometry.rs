//! Geometry primitives used by quadric error metrics
//!
//! Vector and 4x4 matrix helpers over nalgebra, plus plane and quadric
//! construction for triangles. Everything here is computed in double
//! precision regardless of the `f32` storage used by meshes.

use crate::point::{Point3d, Point3f, Vector3d};
use nalgebra::{Matrix4, RowVector4, Vector4};

/// Default determinant threshold below which a matrix is treated as singular.
pub const DEFAULT_SINGULAR_EPSILON: f64 = 1e-10;

/// Squared length below which a triangle normal is considered degenerate.
const DEGENERATE_NORMAL_EPSILON: f64 = 1e-24;

/// Widen a stored position to double precision.
#[inline]
pub fn to_f64(p: &Point3f) -> Point3d {
    p.cast::<f64>()
}

/// Difference of two points as a vector (`a - b`).
#[inline]
pub fn subtract(a: &Point3d, b: &Point3d) -> Vector3d {
    a - b
}

#[inline]
pub fn cross(a: &Vector3d, b: &Vector3d) -> Vector3d {
    a.cross(b)
}

#[inline]
pub fn dot(a: &Vector4<f64>, b: &Vector4<f64>) -> f64 {
    a.dot(b)
}

/// Unit vector in the direction of `v`, or `None` for a (near) zero vector.
pub fn normalize(v: &Vector3d) -> Option<Vector3d> {
    if v.norm_squared() <= DEGENERATE_NORMAL_EPSILON {
        return None;
    }
    let n = v.normalize();
    n.iter().all(|c| c.is_finite()).then_some(n)
}

/// Component-wise sum of two 4x4 matrices.
#[inline]
pub fn add(a: &Matrix4<f64>, b: &Matrix4<f64>) -> Matrix4<f64> {
    a + b
}

/// Invert `m`, reporting singularity explicitly.
///
/// Returns `None` when `|det(m)| < epsilon` or when the inverse contains
/// non-finite entries.
pub fn try_invert(m: &Matrix4<f64>, epsilon: f64) -> Option<Matrix4<f64>> {
    if m.determinant().abs() < epsilon {
        return None;
    }
    m.try_inverse()
        .filter(|inv| inv.iter().all(|c| c.is_finite()))
}

/// Matrix times column vector (`M * v`).
#[inline]
pub fn mul_matrix_vector(m: &Matrix4<f64>, v: &Vector4<f64>) -> Vector4<f64> {
    m * v
}

/// Row vector times matrix (`v^T * M`).
#[inline]
pub fn mul_vector_matrix(v: &Vector4<f64>, m: &Matrix4<f64>) -> RowVector4<f64> {
    v.transpose() * m
}

/// Evaluate `v^T * Q * v`.
#[inline]
pub fn quadratic_form(q: &Matrix4<f64>, v: &Vector4<f64>) -> f64 {
    (mul_vector_matrix(v, q) * v)[0]
}

/// Homogeneous coordinates of a point (`w = 1`).
#[inline]
pub fn homogeneous(p: &Point3d) -> Vector4<f64> {
    Vector4::new(p.x, p.y, p.z, 1.0)
}

/// Plane `(nx, ny, nz, d)` through a triangle, with `n` the unit normal and
/// `d = -n . a`. Returns `None` for zero-area triangles.
pub fn triangle_plane(a: &Point3d, b: &Point3d, c: &Point3d) -> Option<Vector4<f64>> {
    let ab = subtract(b, a);
    let bc = subtract(c, b);
    let n = normalize(&cross(&ab, &bc))?;
    let d = -n.dot(&a.coords);
    Some(Vector4::new(n.x, n.y, n.z, d))
}

/// Fundamental error quadric `K = p p^T` of a plane.
pub fn plane_quadric(p: &Vector4<f64>) -> Matrix4<f64> {
    p * p.transpose()
}

/// Quadric of a triangle; degenerate triangles contribute the zero matrix.
pub fn triangle_quadric(a: &Point3d, b: &Point3d, c: &Point3d) -> Matrix4<f64> {
    triangle_plane(a, b, c)
        .map(|p| plane_quadric(&p))
        .unwrap_or_else(Matrix4::zeros)
}
