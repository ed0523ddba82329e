use crate::{
    color::Color,
    geometry::{BarycentricCoordinates, FloatType, Ray, WorldPoint, WorldVector, intersect_triangle},
    vertex::SurfaceVertex,
};

/// Triangle prepared for ray intersection, with the surface terms shaders need.
///
/// Material colors are taken from the first vertex, all vertices of a shape share them.
#[derive(Clone, Debug)]
pub struct Triangle<V> {
    pub vertices: [V; 3],

    pub a: WorldPoint,
    pub b: WorldPoint,
    pub c: WorldPoint,
    pub ba: WorldVector,
    pub ca: WorldVector,

    pub na: WorldVector,
    pub nb: WorldVector,
    pub nc: WorldVector,

    pub ambient: Color,
    pub diffuse: Color,
    pub emissive: Color,
}

impl<V: SurfaceVertex> Triangle<V> {
    pub fn new(vertex_a: V, vertex_b: V, vertex_c: V) -> Self {
        let a = vertex_a.position();
        let b = vertex_b.position();
        let c = vertex_c.position();
        Triangle {
            vertices: [vertex_a, vertex_b, vertex_c],
            a,
            b,
            c,
            ba: b - a,
            ca: c - a,
            na: vertex_a.normal(),
            nb: vertex_b.normal(),
            nc: vertex_c.normal(),
            ambient: vertex_a.ambient(),
            diffuse: vertex_a.diffuse(),
            emissive: vertex_a.emissive(),
        }
    }
}

impl<V> Triangle<V> {
    /// Distance and barycentric coordinates of the ray hit, if there is one.
    /// Both faces are hit, the distance may be negative.
    pub fn intersect(&self, ray: &Ray) -> Option<(FloatType, BarycentricCoordinates)> {
        intersect_triangle(&self.a, &self.ba, &self.ca, ray)
    }

    pub fn position_at(&self, bary: &BarycentricCoordinates) -> WorldPoint {
        self.a + self.ba * bary.u + self.ca * bary.v
    }

    /// Shading normal at the given point, interpolated from the vertex normals.
    /// Zero if the vertex normals cancel out.
    pub fn normal_at(&self, bary: &BarycentricCoordinates) -> WorldVector {
        let normal = bary.interpolate(self.na, self.nb, self.nc);
        normal.try_normalize(0.0).unwrap_or(normal)
    }

    pub fn geometric_normal(&self) -> WorldVector {
        self.ba.cross(&self.ca).normalize()
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::vertex::Vertex;
    use assert2::{assert, let_assert};

    pub fn make_triangle(points: [[FloatType; 3]; 3], normal: WorldVector) -> Triangle<Vertex> {
        let [a, b, c] = points.map(|p| {
            let mut v = Vertex::default();
            v.set_position(&WorldPoint::from(p));
            v.set_normal(&normal);
            v
        });
        Triangle::new(a, b, c)
    }

    #[test]
    fn edges_are_precomputed() {
        let triangle = make_triangle(
            [[1.0, 0.0, 0.0], [3.0, 0.0, 0.0], [1.0, 2.0, 0.0]],
            WorldVector::z(),
        );
        assert!(triangle.ba == WorldVector::new(2.0, 0.0, 0.0));
        assert!(triangle.ca == WorldVector::new(0.0, 2.0, 0.0));
        assert!(triangle.geometric_normal() == WorldVector::z());
    }

    #[test]
    fn hit_point_matches_barycentric_position() {
        let triangle = make_triangle(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            WorldVector::z(),
        );
        let ray = Ray::new(WorldPoint::new(0.25, 0.25, 2.0), -WorldVector::z());
        let_assert!(Some((t, bary)) = triangle.intersect(&ray));
        assert!((t - 2.0).abs() < 1e-5);
        assert!((triangle.position_at(&bary) - ray.point_at(t)).norm() < 1e-5);
    }

    #[test]
    fn normal_is_interpolated_and_normalized() {
        let mut triangle = make_triangle(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            WorldVector::z(),
        );
        triangle.nb = WorldVector::x();
        let normal = triangle.normal_at(&BarycentricCoordinates::new(0.5, 0.0));
        assert!((normal.norm() - 1.0).abs() < 1e-5);
        assert!((normal.x - normal.z).abs() < 1e-5);
    }

    #[test]
    fn cancelling_normals_give_zero() {
        let mut triangle = make_triangle(
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            WorldVector::z(),
        );
        triangle.nb = -WorldVector::z();
        let normal = triangle.normal_at(&BarycentricCoordinates::new(0.5, 0.0));
        assert!(normal == WorldVector::zeros());
    }
}
