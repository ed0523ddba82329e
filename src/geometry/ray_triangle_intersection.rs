use super::{BarycentricCoordinates, FloatType, Ray, WorldPoint, WorldVector};

const DETERMINANT_EPSILON: FloatType = 1e-8;

/// Calculates ray intersection with the (two sided) triangle `a, a + ba, a + ca`.
/// Returns distance along the ray (possibly negative) and barycentric uv coordinates,
/// None if the ray misses the triangle or is parallel to it.
/// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm#Rust_implementation
pub fn intersect_triangle(
    a: &WorldPoint,
    ba: &WorldVector,
    ca: &WorldVector,
    ray: &Ray,
) -> Option<(FloatType, BarycentricCoordinates)> {
    let ray_cross_e2 = ray.direction.cross(ca);
    let det = ba.dot(&ray_cross_e2);

    if det.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = inv_det * s.dot(&ray_cross_e2);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let s_cross_e1 = s.cross(ba);
    let v = inv_det * ray.direction.dot(&s_cross_e1);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * ca.dot(&s_cross_e1);
    Some((t, BarycentricCoordinates { u, v }))
}
