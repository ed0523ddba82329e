use crate::geometry::{FloatType, Ray, WorldBox};

pub trait RayIntersectionExt {
    /// Parameters of the points where the ray's line enters and leaves the box.
    /// The line misses the box when the first is greater than the second.
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType);

    /// Does the ray hit the box at any distance in `min_t..=max_t`?
    fn hit_in_range(&self, ray: &Ray, min_t: FloatType, max_t: FloatType) -> bool {
        let (enter, leave) = self.intersect(ray);
        enter <= leave && leave >= min_t && enter <= max_t
    }
}

impl RayIntersectionExt for WorldBox {
    fn intersect(&self, ray: &Ray) -> (FloatType, FloatType) {
        // 0 * inf happens for a ray parallel to a slab that starts on its boundary plane,
        // such a slab does not limit the range
        let slab_near = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|t| if t.is_nan() { FloatType::NEG_INFINITY } else { t });
        let slab_far = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|t| if t.is_nan() { FloatType::INFINITY } else { t });

        let enter = slab_near.zip_map(&slab_far, FloatType::min).max();
        let leave = slab_near.zip_map(&slab_far, FloatType::max).min();
        (enter, leave)
    }
}

#[cfg(test)]
mod tests {
    use assert2::assert;
    use test_case::test_case;

    use super::*;
    use crate::geometry::{WorldPoint, WorldVector};

    fn cube() -> WorldBox {
        WorldBox::new(WorldPoint::new(5.0, 5.0, 5.0), WorldPoint::new(10.0, 10.0, 10.0))
    }

    #[test_case([0.0, 7.0, 7.0], [1.0, 0.0, 0.0], (5.0, 10.0) ; "along x")]
    #[test_case([7.0, 7.0, 20.0], [0.0, 0.0, -1.0], (10.0, 15.0) ; "along negative z")]
    #[test_case([7.0, 7.0, 7.0], [0.0, 1.0, 0.0], (-2.0, 3.0) ; "from inside")]
    #[test_case([5.0, 5.0, 0.0], [0.0, 0.0, 1.0], (5.0, 10.0) ; "grazing an edge")]
    fn entry_and_exit(origin: [f32; 3], direction: [f32; 3], expected: (f32, f32)) {
        let ray = Ray::new(WorldPoint::from(origin), WorldVector::from(direction));
        let (enter, leave) = cube().intersect(&ray);
        assert!((enter - expected.0).abs() < 1e-5);
        assert!((leave - expected.1).abs() < 1e-5);
    }

    #[test_case([0.0, 7.0, 7.0], [0.0, 1.0, 0.0] ; "parallel below the x slab")]
    #[test_case([12.0, 7.0, 7.0], [0.0, 1.0, 0.0] ; "parallel above the x slab")]
    #[test_case([7.0, 7.0, 12.0], [1.0, 0.0, 0.0] ; "parallel above the z slab")]
    #[test_case([0.0, 0.0, 0.0], [-1.0, 1.0, 1.0] ; "pointing away")]
    #[test_case([0.0, 5.0, 7.0], [1.0, 0.0, 1.0] ; "passing a corner")]
    fn misses(origin: [f32; 3], direction: [f32; 3]) {
        let ray = Ray::new(WorldPoint::from(origin), WorldVector::from(direction));
        let (enter, leave) = cube().intersect(&ray);
        assert!(enter > leave);
        assert!(!cube().hit_in_range(&ray, 0.0, FloatType::INFINITY));
    }

    #[test]
    fn range_limits_hits() {
        let ray = Ray::new(WorldPoint::new(7.0, 7.0, 20.0), WorldVector::new(0.0, 0.0, -1.0));
        assert!(cube().hit_in_range(&ray, 0.0, 1000.0));
        assert!(!cube().hit_in_range(&ray, 0.0, 5.0));
        assert!(!cube().hit_in_range(&ray, 16.0, 1000.0));

        let away = Ray::new(WorldPoint::new(7.0, 7.0, 20.0), WorldVector::new(0.0, 0.0, 1.0));
        assert!(!cube().hit_in_range(&away, 0.0, 1000.0));
    }
}
