mod aabb;
mod payload;
mod triangle;

use std::{
    cell::{Cell, RefCell, RefMut},
    rc::Rc,
};

use itertools::iproduct;
use nalgebra::Vector2;
use rand::{Rng as _, SeedableRng, rngs::SmallRng};
use rand_distr::UnitSphere;

pub use aabb::Aabb;
pub use payload::Payload;
pub use triangle::Triangle;

use crate::{
    camera::CameraBasis,
    color::{Color, PixelFormat},
    error::{Binding, RenderError, ShaderStage},
    geometry::{FloatType, Ray, WorldVector},
    rasterizer::Viewport,
    resource::Resource,
    vertex::SurfaceVertex,
};

pub const DEFAULT_MAX_T: FloatType = 1000.0;
pub const DEFAULT_MIN_T: FloatType = 0.001;

pub type MissShader<'a> = Box<dyn Fn(&Ray) -> Payload + 'a>;

/// Shades the closest hit. Gets the tracer itself so that it can trace secondary rays,
/// with the remaining recursion depth.
pub type ClosestHitShader<'a, V, P> =
    Box<dyn Fn(&RayTracer<'a, V, P>, &Ray, Payload, &Triangle<V>, u32) -> Payload + 'a>;

/// Called for the first hit found, ends the trace early.
pub type AnyHitShader<'a, V> = Box<dyn Fn(&Ray, Payload, &Triangle<V>) -> Payload + 'a>;

/// Called after each finished row of ray generation with the number of finished rows
/// and the total over all accumulation frames.
pub type ProgressCallback<'a> = Box<dyn Fn(usize, usize) + 'a>;

/// Counters of the work done while tracing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceStatistics {
    pub rays: u64,
    pub aabb_rejects: u64,
    pub triangle_tests: u64,
}

/// Recursive ray tracer over per shape bounding boxes.
///
/// Geometry buffers and the render target are borrowed for the lifetime of the tracer.
/// Acceleration structures are reference counted so that a second tracer (for example for
/// shadow rays) can share them.
pub struct RayTracer<'a, V, P> {
    render_target: Option<&'a mut Resource<P>>,
    viewport: Option<Viewport>,

    vertex_buffers: Vec<&'a Resource<V>>,
    index_buffers: Vec<&'a Resource<u32>>,
    acceleration_structures: Option<Rc<[Aabb<V>]>>,

    miss_shader: Option<MissShader<'a>>,
    closest_hit_shader: Option<ClosestHitShader<'a, V, P>>,
    any_hit_shader: Option<AnyHitShader<'a, V>>,
    progress_callback: Option<ProgressCallback<'a>>,

    rng: RefCell<SmallRng>,
    statistics: Cell<TraceStatistics>,
}

impl<'a, V: SurfaceVertex, P: PixelFormat> Default for RayTracer<'a, V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V: SurfaceVertex, P: PixelFormat> RayTracer<'a, V, P> {
    pub fn new() -> Self {
        RayTracer {
            render_target: None,
            viewport: None,
            vertex_buffers: Vec::new(),
            index_buffers: Vec::new(),
            acceleration_structures: None,
            miss_shader: None,
            closest_hit_shader: None,
            any_hit_shader: None,
            progress_callback: None,
            rng: RefCell::new(SmallRng::from_os_rng()),
            statistics: Cell::default(),
        }
    }

    /// Unless set explicitly, the viewport covers the whole render target.
    pub fn set_render_target(&mut self, render_target: &'a mut Resource<P>) {
        if self.viewport.is_none() {
            self.viewport = Some(Viewport {
                width: render_target.width(),
                height: render_target.height(),
            });
        }
        self.render_target = Some(render_target);
    }

    pub fn clear_render_target(&mut self, color: P) {
        if let Some(render_target) = self.render_target.as_deref_mut() {
            render_target.fill(color);
        }
    }

    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.viewport = Some(Viewport { width, height });
    }

    /// One vertex buffer per shape, in the same order as the index buffers.
    pub fn set_vertex_buffers(&mut self, vertex_buffers: impl IntoIterator<Item = &'a Resource<V>>) {
        self.vertex_buffers = vertex_buffers.into_iter().collect();
    }

    pub fn set_index_buffers(&mut self, index_buffers: impl IntoIterator<Item = &'a Resource<u32>>) {
        self.index_buffers = index_buffers.into_iter().collect();
    }

    pub fn set_miss_shader(&mut self, shader: impl Fn(&Ray) -> Payload + 'a) {
        self.miss_shader = Some(Box::new(shader));
    }

    pub fn set_closest_hit_shader(
        &mut self,
        shader: impl Fn(&RayTracer<'a, V, P>, &Ray, Payload, &Triangle<V>, u32) -> Payload + 'a,
    ) {
        self.closest_hit_shader = Some(Box::new(shader));
    }

    pub fn set_any_hit_shader(&mut self, shader: impl Fn(&Ray, Payload, &Triangle<V>) -> Payload + 'a) {
        self.any_hit_shader = Some(Box::new(shader));
    }

    pub fn set_progress_callback(&mut self, callback: impl Fn(usize, usize) + 'a) {
        self.progress_callback = Some(Box::new(callback));
    }

    /// Reseeds the generator used by [`Self::random_direction`].
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = RefCell::new(SmallRng::seed_from_u64(seed));
    }

    /// Builds one bounding box per shape from the bound buffers, replacing any previous
    /// acceleration structure.
    pub fn build_acceleration_structure(&mut self) -> Result<(), RenderError> {
        if self.vertex_buffers.is_empty() {
            return Err(RenderError::MissingBinding(Binding::VertexBuffer));
        }
        if self.index_buffers.len() != self.vertex_buffers.len() {
            return Err(RenderError::MissingBinding(Binding::IndexBuffer));
        }

        let structures: Vec<Aabb<V>> = self
            .vertex_buffers
            .iter()
            .zip(&self.index_buffers)
            .map(|(vertices, indices)| {
                let mut aabb = Aabb::default();
                for corners in indices.get_data().chunks_exact(3) {
                    let [a, b, c] = [corners[0], corners[1], corners[2]]
                        .map(|index| *vertices.item(index as usize));
                    aabb.add_triangle(Triangle::new(a, b, c));
                }
                aabb
            })
            .collect();

        log::debug!(
            "Built {} acceleration structures with {} triangles",
            structures.len(),
            structures.iter().map(|s| s.get_triangles().len()).sum::<usize>()
        );
        self.acceleration_structures = Some(structures.into());
        Ok(())
    }

    pub fn get_acceleration_structures(&self) -> Option<Rc<[Aabb<V>]>> {
        self.acceleration_structures.clone()
    }

    pub fn set_acceleration_structures(&mut self, structures: Rc<[Aabb<V>]>) {
        self.acceleration_structures = Some(structures);
    }

    pub fn statistics(&self) -> TraceStatistics {
        self.statistics.get()
    }

    pub fn reset_statistics(&self) {
        self.statistics.set(TraceStatistics::default());
    }

    /// Traces `accumulation_num` jittered primary rays per pixel and writes their average to
    /// the render target.
    pub fn ray_generation(
        &mut self,
        camera: &CameraBasis,
        depth: u32,
        accumulation_num: u32,
    ) -> Result<(), RenderError> {
        let Some(viewport) = self.viewport else {
            return Err(RenderError::MissingBinding(Binding::RenderTarget));
        };
        if self.render_target.is_none() {
            return Err(RenderError::MissingBinding(Binding::RenderTarget));
        }

        let frames = accumulation_num.max(1);
        let total_rows = viewport.height * frames as usize;
        let mut history = Resource::<Color>::new_2d(viewport.width, viewport.height);

        for frame in 0..frames {
            let jitter = get_jitter(frame);
            for y in 0..viewport.height {
                for x in 0..viewport.width {
                    let ray = primary_ray(camera, &viewport, x, y, &jitter);
                    let payload = self.trace_ray(&ray, depth, DEFAULT_MAX_T, DEFAULT_MIN_T)?;
                    *history.item_at_mut(x, y) += payload.color;
                }
                if let Some(callback) = &self.progress_callback {
                    callback(frame as usize * viewport.height + y + 1, total_rows);
                }
            }
        }

        let render_target = self
            .render_target
            .as_deref_mut()
            .ok_or(RenderError::MissingBinding(Binding::RenderTarget))?;
        let scale = 1.0 / frames as FloatType;
        for (y, x) in iproduct!(0..viewport.height, 0..viewport.width) {
            *render_target.item_at_mut(x, y) = P::from_color(*history.item_at(x, y) * scale);
        }

        let statistics = self.statistics();
        log::info!(
            "Traced {} rays, {} shape bounding boxes rejected, {} triangle tests",
            statistics.rays,
            statistics.aabb_rejects,
            statistics.triangle_tests
        );
        Ok(())
    }

    /// Finds what the ray hits between `min_t` and `max_t` and runs the matching shader.
    ///
    /// With an any-hit shader installed the first hit found ends the search, otherwise the
    /// closest hit is shaded. Rays with no remaining depth return [`Payload::terminal`].
    pub fn trace_ray(
        &self,
        ray: &Ray,
        depth: u32,
        max_t: FloatType,
        min_t: FloatType,
    ) -> Result<Payload, RenderError> {
        let miss_shader = self
            .miss_shader
            .as_ref()
            .ok_or(RenderError::MissingShader(ShaderStage::Miss))?;
        if self.closest_hit_shader.is_none() && self.any_hit_shader.is_none() {
            return Err(RenderError::MissingShader(ShaderStage::ClosestHit));
        }
        let structures = self
            .acceleration_structures
            .as_ref()
            .ok_or(RenderError::MissingBinding(Binding::AccelerationStructure))?;

        if depth == 0 {
            return Ok(Payload::terminal());
        }

        let mut statistics = self.statistics.get();
        statistics.rays += 1;

        let mut closest: Option<(Payload, &Triangle<V>)> = None;
        let mut closest_t = max_t;

        for aabb in structures.iter() {
            if !aabb.aabb_test(ray, min_t, closest_t) {
                statistics.aabb_rejects += 1;
                continue;
            }

            for triangle in aabb.get_triangles() {
                statistics.triangle_tests += 1;
                let payload = self.intersection_shader(triangle, ray, min_t, closest_t);
                if !payload.is_hit() {
                    continue;
                }

                if let Some(any_hit_shader) = &self.any_hit_shader {
                    self.statistics.set(statistics);
                    return Ok(any_hit_shader(ray, payload, triangle));
                }

                closest_t = payload.t;
                closest = Some((payload, triangle));
            }
        }
        self.statistics.set(statistics);

        match (closest, &self.closest_hit_shader) {
            (Some((payload, triangle)), Some(closest_hit_shader)) => {
                Ok(closest_hit_shader(self, ray, payload, triangle, depth))
            }
            _ => Ok(miss_shader(ray)),
        }
    }

    /// Ray-triangle test. Returns a payload with the hit distance and barycentric
    /// coordinates, or a miss (negative `t`) when there is no hit within `min_t..=max_t`.
    pub fn intersection_shader(
        &self,
        triangle: &Triangle<V>,
        ray: &Ray,
        min_t: FloatType,
        max_t: FloatType,
    ) -> Payload {
        match triangle.intersect(ray) {
            Some((t, bary)) if (min_t..=max_t).contains(&t) => Payload {
                t,
                bary,
                color: Color::BLACK,
            },
            _ => Payload::terminal(),
        }
    }

    /// Uniformly distributed direction in the hemisphere around `normal`.
    pub fn random_direction(&self, normal: &WorldVector) -> WorldVector {
        let [x, y, z]: [FloatType; 3] = self.rng().sample(UnitSphere);
        let direction = WorldVector::new(x, y, z);
        if direction.dot(normal) < 0.0 {
            -direction
        } else {
            direction
        }
    }

    /// Random generator for use in shaders.
    /// Must not be held across a nested [`Self::trace_ray`] call.
    pub fn rng(&self) -> RefMut<'_, SmallRng> {
        self.rng.borrow_mut()
    }
}

/// Sub-pixel offset of the given accumulation frame, in -0.5..0.5 pixels.
/// The first frame samples pixel centres, later ones follow the Halton (2, 3) sequence.
pub fn get_jitter(frame: u32) -> Vector2<FloatType> {
    if frame == 0 {
        return Vector2::zeros();
    }
    Vector2::new(halton(frame, 2) - 0.5, halton(frame, 3) - 0.5)
}

fn halton(mut index: u32, base: u32) -> FloatType {
    let mut fraction = 1.0;
    let mut result = 0.0;
    while index > 0 {
        fraction /= base as FloatType;
        result += fraction * (index % base) as FloatType;
        index /= base;
    }
    result
}

fn primary_ray(
    camera: &CameraBasis,
    viewport: &Viewport,
    x: usize,
    y: usize,
    jitter: &Vector2<FloatType>,
) -> Ray {
    let u = ((x as FloatType + 0.5 + jitter.x) / viewport.width as FloatType) * 2.0 - 1.0;
    let v = 1.0 - ((y as FloatType + 0.5 + jitter.y) / viewport.height as FloatType) * 2.0;

    let direction = camera.direction
        + camera.right * (u * camera.tan_half_fov * camera.aspect_ratio)
        + camera.up * (v * camera.tan_half_fov);
    Ray::new(camera.position, direction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        camera::Camera,
        color::UnsignedColor,
        geometry::{BarycentricCoordinates, WorldPoint},
        model::{Model, test::TRIANGLE_OBJ},
        vertex::Vertex,
    };
    use assert2::{assert, let_assert};
    use test_case::test_case;

    type Tracer<'a> = RayTracer<'a, Vertex, UnsignedColor>;

    /// Two shapes, a triangle in the z = 0 plane around the origin and one far off to the side.
    const TWO_SHAPES_OBJ: &str = "\
o Center
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o Side
v 9.0 -1.0 0.0
v 11.0 -1.0 0.0
v 10.0 1.0 0.0
f 4 5 6
";

    fn model(obj: &str) -> Model {
        let_assert!(Ok(model) = Model::from_sources(obj, None, ""));
        model
    }

    fn bind<'a>(tracer: &mut Tracer<'a>, model: &'a Model) {
        tracer.set_vertex_buffers(model.get_vertex_buffers());
        tracer.set_index_buffers(model.get_index_buffers());
        tracer.build_acceleration_structure().unwrap();
    }

    fn towards_origin() -> Ray {
        Ray::new(WorldPoint::new(0.0, 0.0, 5.0), -WorldVector::z())
    }

    #[test_case(1.0)]
    #[test_case(4.0)]
    #[test_case(25.0)]
    fn centroid_hit_distance(distance: FloatType) {
        let model = model(TRIANGLE_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::terminal());
        tracer.set_closest_hit_shader(|_, _, payload, _, _| payload);

        let centroid = WorldPoint::new(0.0, -1.0 / 3.0, 0.0);
        let ray = Ray::new(centroid + WorldVector::z() * distance, -WorldVector::z());
        let_assert!(Ok(payload) = tracer.trace_ray(&ray, 1, DEFAULT_MAX_T, DEFAULT_MIN_T));

        assert!((payload.t - distance).abs() < 1e-4 * distance);
        let [w, u, v] = payload.bary.weights();
        assert!((w + u + v - 1.0).abs() < 1e-5);
        assert!((u - 1.0 / 3.0).abs() < 1e-4);
        assert!((v - 1.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn ray_outside_shape_box_skips_its_triangles() {
        let model = model(TWO_SHAPES_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::terminal());
        tracer.set_closest_hit_shader(|_, _, payload, _, _| payload);

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload.is_hit());
        assert!(
            tracer.statistics()
                == TraceStatistics {
                    rays: 1,
                    aabb_rejects: 1,
                    triangle_tests: 1,
                }
        );

        tracer.reset_statistics();
        let away = Ray::new(WorldPoint::new(0.0, 0.0, 5.0), WorldVector::z());
        let_assert!(Ok(payload) = tracer.trace_ray(&away, 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(!payload.is_hit());
        assert!(tracer.statistics().aabb_rejects == 2);
        assert!(tracer.statistics().triangle_tests == 0);
    }

    #[test]
    fn hits_outside_range_are_rejected() {
        let model = model(TRIANGLE_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::from_color(Color::new(0.0, 0.0, 1.0)));
        tracer.set_closest_hit_shader(|_, _, payload, _, _| payload);

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, 4.0, DEFAULT_MIN_T));
        assert!(payload.color == Color::new(0.0, 0.0, 1.0));
        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, 6.0));
        assert!(!payload.is_hit());
    }

    #[test]
    fn closest_of_overlapping_triangles_is_shaded() {
        let obj = "\
v -1.0 -1.0 -2.0
v 1.0 -1.0 -2.0
v 0.0 1.0 -2.0
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 0.0 1.0 1.0
f 1 2 3
f 4 5 6
";
        let model = model(obj);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::terminal());
        tracer.set_closest_hit_shader(|_, _, payload, _, _| payload);

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!((payload.t - 4.0).abs() < 1e-4);
    }

    #[test]
    fn zero_depth_terminates_without_shading() {
        let model = model(TRIANGLE_OBJ);
        let calls = Cell::new(0);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::from_color(Color::new(0.0, 0.0, 1.0)));
        tracer.set_closest_hit_shader(|tracer, ray, payload, _, depth| {
            calls.set(calls.get() + 1);
            let bounce = Ray::new(ray.point_at(payload.t), -ray.direction);
            let next = tracer
                .trace_ray(&bounce, depth - 1, DEFAULT_MAX_T, DEFAULT_MIN_T)
                .unwrap();
            Payload {
                color: next.color + Color::new(0.5, 0.0, 0.0),
                ..payload
            }
        });

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 0, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload == Payload::terminal());
        assert!(calls.get() == 0);

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(calls.get() == 1);
        assert!(payload.color == Color::new(0.5, 0.0, 0.0));

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 2, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload.color == Color::new(0.5, 0.0, 1.0));
    }

    #[test]
    fn any_hit_takes_precedence_over_closest_hit() {
        // Far triangle comes first in the buffer, so it is the first hit found
        let obj = "\
v -1.0 -1.0 -2.0
v 1.0 -1.0 -2.0
v 0.0 1.0 -2.0
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 0.0 1.0 1.0
f 1 2 3
f 4 5 6
";
        let model = model(obj);
        let closest_hit_calls = Cell::new(0);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::terminal());
        tracer.set_closest_hit_shader(|_, _, payload, _, _| {
            closest_hit_calls.set(closest_hit_calls.get() + 1);
            Payload {
                color: Color::new(0.0, 1.0, 0.0),
                ..payload
            }
        });
        tracer.set_any_hit_shader(|_, payload, _| Payload {
            color: Color::new(1.0, 0.0, 0.0),
            ..payload
        });

        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload.color == Color::new(1.0, 0.0, 0.0));
        assert!((payload.t - 7.0).abs() < 1e-4);
        assert!(closest_hit_calls.get() == 0);
    }

    #[test]
    fn any_hit_ends_search_early() {
        let model = model(TWO_SHAPES_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        tracer.set_miss_shader(|_| Payload::terminal());
        tracer.set_any_hit_shader(|_, payload, _| Payload {
            color: Color::new(1.0, 1.0, 1.0),
            ..payload
        });

        // Long ray along x passes through both boxes
        let ray = Ray::new(WorldPoint::new(-5.0, 0.0, 0.0), WorldVector::x());
        let_assert!(Ok(payload) = tracer.trace_ray(&ray, 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        // The ray lies in the triangles' plane, so it's parallel and misses both
        assert!(!payload.is_hit());

        tracer.reset_statistics();
        let_assert!(Ok(payload) = tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload.color == Color::new(1.0, 1.0, 1.0));
        assert!(tracer.statistics().triangle_tests == 1);
    }

    #[test]
    fn missing_shaders_are_errors() {
        let model = model(TRIANGLE_OBJ);
        let mut tracer = Tracer::new();
        assert!(
            tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T)
                == Err(RenderError::MissingShader(ShaderStage::Miss))
        );

        tracer.set_miss_shader(|_| Payload::terminal());
        assert!(
            tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T)
                == Err(RenderError::MissingShader(ShaderStage::ClosestHit))
        );

        tracer.set_closest_hit_shader(|_, _, payload, _, _| payload);
        assert!(
            tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T)
                == Err(RenderError::MissingBinding(Binding::AccelerationStructure))
        );

        bind(&mut tracer, &model);
        assert!(tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T).is_ok());
    }

    #[test]
    fn build_without_buffers_is_an_error() {
        let mut tracer = Tracer::new();
        assert!(
            tracer.build_acceleration_structure()
                == Err(RenderError::MissingBinding(Binding::VertexBuffer))
        );
    }

    #[test]
    fn acceleration_structures_can_be_shared() {
        let model = model(TRIANGLE_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);

        let mut shadow_tracer = Tracer::new();
        let_assert!(Some(structures) = tracer.get_acceleration_structures());
        shadow_tracer.set_acceleration_structures(structures);
        shadow_tracer.set_miss_shader(|_| Payload::terminal());
        shadow_tracer.set_any_hit_shader(|_, payload, _| payload);

        let_assert!(Ok(payload) = shadow_tracer.trace_ray(&towards_origin(), 1, DEFAULT_MAX_T, DEFAULT_MIN_T));
        assert!(payload.is_hit());
    }

    #[test]
    fn ray_generation_fills_render_target() {
        let model = model(TRIANGLE_OBJ);
        let mut target = Resource::<UnsignedColor>::new_2d(16, 16);
        let rows = Cell::new(0);
        {
            let mut tracer = Tracer::new();
            tracer.set_render_target(&mut target);
            tracer.clear_render_target(UnsignedColor::new(255, 0, 0));
            bind(&mut tracer, &model);
            tracer.set_miss_shader(|_| Payload::from_color(Color::new(0.0, 0.0, 1.0)));
            tracer.set_closest_hit_shader(|_, _, payload, _, _| Payload {
                color: Color::new(1.0, 1.0, 1.0),
                ..payload
            });
            tracer.set_progress_callback(|done, total| {
                assert!(total == 32);
                rows.set(done);
            });

            let camera = Camera::builder()
                .position(WorldPoint::new(0.0, 0.0, 3.0))
                .width(16.0)
                .height(16.0)
                .build();
            assert!(tracer.ray_generation(&camera.basis(), 1, 2).is_ok());
            assert!(tracer.statistics().rays == 2 * 16 * 16);
        }

        assert!(rows.get() == 32);
        assert!(*target.item_at(8, 8) == UnsignedColor::new(255, 255, 255));
        assert!(*target.item_at(0, 0) == UnsignedColor::new(0, 0, 255));
        assert!(target.iter().all(|&c| c != UnsignedColor::new(255, 0, 0)));
    }

    #[test]
    fn ray_generation_needs_render_target() {
        let mut tracer = Tracer::new();
        assert!(
            tracer.ray_generation(&Camera::default().basis(), 1, 1)
                == Err(RenderError::MissingBinding(Binding::RenderTarget))
        );
    }

    #[test]
    fn random_directions_face_the_normal() {
        let mut tracer = Tracer::new();
        tracer.set_seed(7);
        let normal = WorldVector::new(0.0, 1.0, 0.0);
        for _ in 0..100 {
            let direction = tracer.random_direction(&normal);
            assert!(direction.dot(&normal) >= 0.0);
            assert!((direction.norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test_case(0, 0.0, 0.0)]
    #[test_case(1, 0.0, 1.0 / 3.0 - 0.5)]
    #[test_case(2, -0.25, 2.0 / 3.0 - 0.5)]
    #[test_case(3, 0.25, 1.0 / 9.0 - 0.5)]
    fn jitter_follows_halton_sequence(frame: u32, x: FloatType, y: FloatType) {
        let jitter = get_jitter(frame);
        assert!((jitter.x - x).abs() < 1e-6);
        assert!((jitter.y - y).abs() < 1e-6);
    }

    #[test]
    fn intersection_shader_reports_miss_as_negative_t() {
        let model = model(TRIANGLE_OBJ);
        let mut tracer = Tracer::new();
        bind(&mut tracer, &model);
        let_assert!(Some(structures) = tracer.get_acceleration_structures());
        let triangle = &structures[0].get_triangles()[0];

        let miss = Ray::new(WorldPoint::new(5.0, 5.0, 5.0), -WorldVector::z());
        assert!(!tracer.intersection_shader(triangle, &miss, DEFAULT_MIN_T, DEFAULT_MAX_T).is_hit());

        let hit = tracer.intersection_shader(triangle, &towards_origin(), DEFAULT_MIN_T, DEFAULT_MAX_T);
        assert!(hit.is_hit());
        assert!(hit.bary != BarycentricCoordinates::default());
    }
}
