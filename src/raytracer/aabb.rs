use crate::{
    geometry::{FloatType, Ray, RayIntersectionExt as _, WorldBox},
    raytracer::triangle::Triangle,
};

/// Bounding box of one shape together with all of the shape's triangles.
///
/// Rays that miss the box skip the shape, rays that hit it test every triangle in turn.
#[derive(Clone, Debug)]
pub struct Aabb<V> {
    bounds: WorldBox,
    triangles: Vec<Triangle<V>>,
}

impl<V> Default for Aabb<V> {
    fn default() -> Self {
        Aabb {
            bounds: WorldBox::empty(),
            triangles: Vec::new(),
        }
    }
}

impl<V> Aabb<V> {
    pub fn add_triangle(&mut self, triangle: Triangle<V>) {
        self.bounds.grow(&triangle.a);
        self.bounds.grow(&triangle.b);
        self.bounds.grow(&triangle.c);
        self.triangles.push(triangle);
    }

    pub fn get_triangles(&self) -> &[Triangle<V>] {
        &self.triangles
    }

    pub fn bounds(&self) -> &WorldBox {
        &self.bounds
    }

    /// Can the ray hit anything inside the box between `min_t` and `max_t`?
    pub fn aabb_test(&self, ray: &Ray, min_t: FloatType, max_t: FloatType) -> bool {
        !self.bounds.is_empty() && self.bounds.hit_in_range(ray, min_t, max_t)
    }
}
