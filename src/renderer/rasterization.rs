use crate::{
    camera::Camera,
    color::{Color, UnsignedColor},
    error::Error,
    geometry::FloatType,
    image_io::{load_texture, sample_texture},
    input::InputState,
    model::Model,
    rasterizer::{AttributeInterpolation, Rasterizer},
    renderer::{Renderer, save_result},
    resource::Resource,
    settings::Settings,
    vertex::{SurfaceVertex as _, Vertex},
};

pub const CLEAR_COLOR: UnsignedColor = UnsignedColor::new(100, 149, 237);

/// Draws the model with the software rasterizer.
pub struct RasterizationRenderer {
    settings: Settings,
    camera: Camera,
    scene: Option<Scene>,

    render_target: Resource<UnsignedColor>,
    depth_buffer: Resource<FloatType>,
}

struct Scene {
    model: Model,
    /// Loaded texture of each shape
    textures: Vec<Option<Resource<UnsignedColor>>>,
}

impl RasterizationRenderer {
    pub fn new(settings: Settings) -> Self {
        RasterizationRenderer {
            camera: settings.camera(),
            render_target: Resource::new_2d(settings.width, settings.height),
            depth_buffer: Resource::new_2d(settings.width, settings.height),
            scene: None,
            settings,
        }
    }

    /// Initializes with an already loaded model instead of reading the configured file.
    pub fn init_with_model(&mut self, model: Model) -> Result<(), Error> {
        let textures = model
            .get_per_shape_texture_files()
            .into_iter()
            .map(|path| path.map(load_texture).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        self.camera = self.settings.camera();
        self.scene = Some(Scene { model, textures });
        Ok(())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn render_target(&self) -> &Resource<UnsignedColor> {
        &self.render_target
    }

    /// Renders into the render target without saving it.
    pub fn render_frame(&mut self) -> Result<(), Error> {
        let Self {
            settings,
            camera,
            scene,
            render_target,
            depth_buffer,
        } = self;
        let scene = scene.as_ref().ok_or(Error::NotInitialized)?;

        let world_view_projection = camera.get_projection_matrix()
            * camera.get_view_matrix()
            * scene.model.get_world_matrix();
        let textured = settings.attribute_interpolation == AttributeInterpolation::Barycentric;

        let mut rasterizer = Rasterizer::<Vertex, UnsignedColor>::new();
        rasterizer.set_render_target(render_target, Some(depth_buffer));
        rasterizer.clear_render_target(CLEAR_COLOR);
        rasterizer.set_interpolation(settings.attribute_interpolation);
        rasterizer.set_vertex_shader(move |position, vertex| (world_view_projection * position, *vertex));

        for (shape, texture) in scene.model.shapes().iter().zip(&scene.textures) {
            match texture {
                Some(texture) if textured => rasterizer.set_pixel_shader(move |vertex, _depth| {
                    Color::from(sample_texture(texture, vertex.texture_coordinates()))
                }),
                _ => rasterizer.set_pixel_shader(|vertex, _depth| vertex.ambient()),
            }
            rasterizer.set_vertex_buffer(shape.vertex_buffer());
            rasterizer.set_index_buffer(shape.index_buffer());
            rasterizer.draw(shape.index_buffer().get_number_of_elements(), 0)?;
        }

        Ok(())
    }
}

impl Renderer for RasterizationRenderer {
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
        log::info!("Rasterization took {:?}", start.elapsed());
        save_result(&self.settings, &self.render_target)
    }

    fn result(&mut self) -> Result<Resource<UnsignedColor>, Error> {
        Ok(self.render_target.clone())
    }
}
