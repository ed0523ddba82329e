pub mod hardware;
pub mod rasterization;
pub mod ray_tracing;

pub use hardware::HardwareRenderer;
pub use rasterization::RasterizationRenderer;
pub use ray_tracing::{Light, RayTracingRenderer};

use crate::{
    color::UnsignedColor, error::Error, geometry::FloatType, image_io, input::InputState,
    resource::Resource, settings::Settings,
};

/// Frame loop driven by the application: `init` once, then `update` and `render` for every
/// frame, `destroy` at the end.
pub trait Renderer {
    /// Loads the model and prepares the engine.
    fn init(&mut self) -> Result<(), Error>;

    /// Applies one frame of user input and refreshes per-frame data.
    fn update(&mut self, input: &InputState, frame_seconds: FloatType) -> Result<(), Error>;

    fn render(&mut self) -> Result<(), Error>;

    /// Copy of the most recently rendered image.
    fn result(&mut self) -> Result<Resource<UnsignedColor>, Error>;

    fn destroy(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Writes the image to the configured result path, if there is one.
fn save_result(settings: &Settings, image: &Resource<UnsignedColor>) -> Result<(), Error> {
    match &settings.result_path {
        Some(path) => image_io::save_resource(image, path),
        None => Ok(()),
    }
}
