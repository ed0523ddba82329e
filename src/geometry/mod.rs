mod aabb;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

use nalgebra::{Matrix4, Point2, Point3, Vector3, Vector4};

pub use aabb::AABB;
pub use ray_box_intersection::RayIntersectionExt;
pub use ray_triangle_intersection::intersect_triangle;
pub use triangle::BarycentricCoordinates;

pub type FloatType = f32;

pub const EPSILON: FloatType = 1e-6;

pub type ScreenPoint = Point2<FloatType>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

/// Homogeneous position produced by a vertex shader.
pub type ClipPoint = Vector4<FloatType>;
pub type Matrix = Matrix4<FloatType>;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction = direction.normalize();
        let inv_direction = direction.map(|x| if x == 0.0 { FloatType::INFINITY } else { 1.0 / x });

        Ray {
            origin,
            direction,
            inv_direction,
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}

/// Signed parallelogram area spanned by `a -> b` and `a -> c` in screen space.
/// Positive when `c` lies on the inner side of the edge `a -> b` for counter-clockwise
/// (in normalized device coordinates) triangles.
pub fn edge_function(a: &ScreenPoint, b: &ScreenPoint, c: &ScreenPoint) -> FloatType {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}
