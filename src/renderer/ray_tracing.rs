use crate::{
    camera::Camera,
    color::{Color, UnsignedColor},
    error::Error,
    geometry::{EPSILON, FloatType, Ray, WorldPoint, WorldVector},
    input::InputState,
    model::Model,
    raytracer::{DEFAULT_MAX_T, DEFAULT_MIN_T, Payload, RayTracer},
    renderer::{Renderer, save_result},
    resource::Resource,
    settings::Settings,
    vertex::Vertex,
};

/// Color of rays that leave the scene.
pub const MISS_COLOR: Color = Color::new(0.0, 0.0, 0.3);

const CLEAR_COLOR: UnsignedColor = UnsignedColor::new(255, 0, 0);

/// Point light.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub position: WorldPoint,
    pub color: Color,
}

/// Path traces the model with direct lighting from point lights.
///
/// Every hit adds the surface's emission, the light of each visible point light and one
/// randomly chosen diffuse bounce.
pub struct RayTracingRenderer {
    settings: Settings,
    camera: Camera,
    model: Option<Model>,
    lights: Vec<Light>,
    seed: Option<u64>,
    progress_callback: Option<Box<dyn Fn(usize, usize)>>,

    render_target: Resource<UnsignedColor>,
}

impl Light {
    /// Unit vector towards the light and the distance to it.
    /// `None` when `position` is at the light itself.
    pub fn direction_from(&self, position: &WorldPoint) -> Option<(WorldVector, FloatType)> {
        let to_light = self.position - position;
        let distance = to_light.norm();
        to_light
            .try_normalize(EPSILON)
            .map(|direction| (direction, distance))
    }
}

impl RayTracingRenderer {
    pub fn new(settings: Settings) -> Self {
        RayTracingRenderer {
            camera: settings.camera(),
            render_target: Resource::new_2d(settings.width, settings.height),
            model: None,
            lights: vec![Light {
                position: WorldPoint::new(0.0, 1.58, -0.03),
                color: Color::new(0.78, 0.78, 0.78),
            }],
            seed: None,
            progress_callback: None,
            settings,
        }
    }

    pub fn init_with_model(&mut self, model: Model) -> Result<(), Error> {
        self.camera = self.settings.camera();
        self.model = Some(model);
        Ok(())
    }

    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
    }

    /// Makes the random bounces repeatable.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Reports finished rows of ray generation, see [`RayTracer::set_progress_callback`].
    pub fn set_progress_callback(&mut self, callback: impl Fn(usize, usize) + 'static) {
        self.progress_callback = Some(Box::new(callback));
    }

    pub fn render_target(&self) -> &Resource<UnsignedColor> {
        &self.render_target
    }

    /// Renders into the render target without saving it.
    pub fn render_frame(&mut self) -> Result<(), Error> {
        let Self {
            settings,
            camera,
            model,
            lights,
            seed,
            progress_callback,
            render_target,
        } = self;
        let model = model.as_ref().ok_or(Error::NotInitialized)?;
        let lights = lights.as_slice();

        let mut shadow_tracer = RayTracer::<Vertex, UnsignedColor>::new();
        shadow_tracer.set_miss_shader(|_ray| Payload::terminal());
        shadow_tracer.set_any_hit_shader(|_ray, payload, _triangle| payload);

        let mut tracer = RayTracer::<Vertex, UnsignedColor>::new();
        tracer.set_render_target(render_target);
        tracer.set_viewport(settings.width, settings.height);
        tracer.clear_render_target(CLEAR_COLOR);
        tracer.set_vertex_buffers(model.get_vertex_buffers());
        tracer.set_index_buffers(model.get_index_buffers());
        tracer.build_acceleration_structure()?;
        if let Some(structures) = tracer.get_acceleration_structures() {
            shadow_tracer.set_acceleration_structures(structures);
        }
        if let Some(seed) = *seed {
            tracer.set_seed(seed);
        }
        if let Some(callback) = progress_callback.as_deref() {
            tracer.set_progress_callback(callback);
        }

        let shadow_tracer = &shadow_tracer;
        tracer.set_miss_shader(|_ray| Payload::from_color(MISS_COLOR));
        tracer.set_closest_hit_shader(move |tracer, ray, payload, triangle, depth| {
            let position = ray.point_at(payload.t);
            let mut normal = triangle.normal_at(&payload.bary);
            if normal.dot(&ray.direction) > 0.0 {
                normal = -normal;
            }

            let mut color = triangle.emissive;

            for light in lights {
                let Some((direction, distance)) = light.direction_from(&position) else {
                    continue;
                };
                let shadow = shadow_tracer
                    .trace_ray(&Ray::new(position, direction), 1, distance, DEFAULT_MIN_T)
                    .unwrap_or_else(|error| unreachable!("Shadow tracer is set up: {error}"));
                if shadow.is_hit() {
                    continue;
                }
                let cosine = normal.dot(&direction).max(0.0);
                color += triangle.diffuse.component_mul(light.color) * cosine;
            }

            let bounce = Ray::new(position, tracer.random_direction(&normal));
            let next = tracer
                .trace_ray(&bounce, depth - 1, DEFAULT_MAX_T, DEFAULT_MIN_T)
                .unwrap_or_else(|error| unreachable!("Tracer is set up: {error}"));
            color += triangle.diffuse.component_mul(next.color) * normal.dot(&bounce.direction).max(0.0);

            Payload { color, ..payload }
        });

        tracer.ray_generation(
            &camera.basis(),
            settings.raytracing_depth,
            settings.accumulation_num,
        )?;
        Ok(())
    }
}

impl Renderer for RayTracingRenderer {
    fn init(&mut self) -> Result<(), Error> {
        let model = Model::load_obj(&self.settings.model_path)?;
        self.init_with_model(model)
    }

    fn update(&mut self, input: &InputState, frame_seconds: FloatType) -> Result<(), Error> {
        self.camera.apply_input(input, frame_seconds);
        Ok(())
    }

    fn render(&mut self) -> Result<(), Error> {
        let start = std::time::Instant::now();
        self.render_frame()?;
        log::info!("Ray tracing took {:?}", start.elapsed());
        save_result(&self.settings, &self.render_target)
    }

    fn result(&mut self) -> Result<Resource<UnsignedColor>, Error> {
        Ok(self.render_target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        color::PixelFormat as _,
        model::test::TRIANGLE_OBJ,
        renderer::test::{quad_model, settings},
    };
    use assert2::{assert, let_assert};
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn empty_view_shows_miss_color() {
        let_assert!(Ok(model) = Model::from_sources(TRIANGLE_OBJ, None, ""));
        let mut renderer = RayTracingRenderer::new(Settings {
            camera_theta: 180.0,
            ..settings(4.0)
        });
        assert!(renderer.init_with_model(model).is_ok());
        assert!(renderer.render().is_ok());

        let miss = UnsignedColor::from_color(MISS_COLOR);
        assert!(renderer.render_target().iter().all(|&c| c == miss));
    }

    #[test]
    fn unlit_triangle_is_black_on_miss_color() {
        let_assert!(Ok(model) = Model::from_sources(TRIANGLE_OBJ, None, ""));
        let mut renderer = RayTracingRenderer::new(settings(4.0));
        assert!(renderer.init_with_model(model).is_ok());
        assert!(renderer.render_frame().is_ok());

        let image = renderer.render_target();
        let black = image.iter().filter(|&&c| c == UnsignedColor::new(0, 0, 0)).count();
        assert!(black.abs_diff(32) <= 1);
        assert!(*image.item_at(0, 0) == UnsignedColor::from_color(MISS_COLOR));
    }

    #[test]
    fn emission_and_direct_light_add_up() {
        let mut renderer = RayTracingRenderer::new(settings(1.0));
        renderer.set_seed(3);
        renderer.set_lights(vec![Light {
            position: WorldPoint::new(0.0, 0.0, 1.0),
            color: Color::new(0.5, 0.5, 0.5),
        }]);
        assert!(renderer.init_with_model(quad_model()).is_ok());
        assert!(renderer.render_frame().is_ok());

        // Bounces leave the quad and find the miss color, which has no red or green
        let image = renderer.render_target();
        let red = *image.item_at(28, 20);
        let green = *image.item_at(3, 10);
        assert!(red.r > 30 && red.g == 0);
        assert!(green.g == 255);
        assert!(green.r == 0);
    }

    #[test]
    fn occluded_light_contributes_nothing() {
        // Second, larger quad between the light and the lit one
        let obj = "\
o Floor
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
usemtl white
f 1 2 3
f 1 3 4
o Blocker
v -5.0 -5.0 3.0
v 5.0 -5.0 3.0
v 5.0 5.0 3.0
v -5.0 5.0 3.0
usemtl black
f 5 6 7
f 5 7 8
";
        let mtl = "\
newmtl white
Ns 10.0
Ka 0.0 0.0 0.0
Kd 1.0 1.0 1.0
Ks 0.0 0.0 0.0
d 1.0
illum 2
newmtl black
Ns 10.0
Ka 0.0 0.0 0.0
Kd 0.0 0.0 0.0
Ks 0.0 0.0 0.0
d 1.0
illum 2
";
        let_assert!(Ok(model) = Model::from_sources(obj, Some(mtl), ""));
        let mut renderer = RayTracingRenderer::new(Settings {
            raytracing_depth: 1,
            ..settings(1.0)
        });
        renderer.set_lights(vec![Light {
            position: WorldPoint::new(0.0, 0.0, 4.0),
            color: Color::new(1.0, 1.0, 1.0),
        }]);
        assert!(renderer.init_with_model(model).is_ok());
        assert!(renderer.render_frame().is_ok());

        assert!(*renderer.render_target().item_at(16, 16) == UnsignedColor::new(0, 0, 0));
    }

    #[test]
    fn light_direction_is_normalized() {
        let light = Light {
            position: WorldPoint::new(0.0, 3.0, 4.0),
            color: Color::new(1.0, 1.0, 1.0),
        };
        let_assert!(Some((direction, distance)) = light.direction_from(&WorldPoint::origin()));
        assert!((distance - 5.0).abs() < 1e-5);
        assert!((direction - WorldVector::new(0.0, 0.6, 0.8)).norm() < 1e-5);
    }

    #[test]
    fn surface_point_at_the_light_gets_no_direction() {
        let light = Light {
            position: WorldPoint::new(0.5, 0.0, 0.0),
            color: Color::new(1.0, 1.0, 1.0),
        };
        assert!(light.direction_from(&light.position).is_none());
    }

    #[test]
    fn light_in_the_surface_plane_adds_nothing() {
        let mut renderer = RayTracingRenderer::new(Settings {
            raytracing_depth: 1,
            ..settings(1.0)
        });
        renderer.set_lights(vec![Light {
            position: WorldPoint::origin(),
            color: Color::new(1.0, 1.0, 1.0),
        }]);
        assert!(renderer.init_with_model(quad_model()).is_ok());
        assert!(renderer.render_frame().is_ok());

        // Green triangle is emissive, the light adds nothing in its plane
        let image = renderer.render_target();
        assert!(*image.item_at(3, 10) == UnsignedColor::new(0, 255, 0));
        assert!(*image.item_at(28, 20) == UnsignedColor::new(0, 0, 0));
    }

    #[test]
    fn progress_reaches_all_rows() {
        let_assert!(Ok(model) = Model::from_sources(TRIANGLE_OBJ, None, ""));
        let mut renderer = RayTracingRenderer::new(settings(4.0));
        let last = Rc::new(Cell::new((0, 0)));
        let reported = Rc::clone(&last);
        renderer.set_progress_callback(move |done, total| reported.set((done, total)));
        assert!(renderer.init_with_model(model).is_ok());
        assert!(renderer.render_frame().is_ok());
        assert!(last.get() == (32, 32));
    }
}
