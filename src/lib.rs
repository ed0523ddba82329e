pub mod camera;
pub mod color;
pub mod error;
pub mod geometry;
pub mod image_io;
pub mod input;
pub mod model;
pub mod rasterizer;
pub mod raytracer;
pub mod renderer;
pub mod resource;
pub mod settings;
pub mod vertex;

pub use camera::Camera;
pub use error::Error;
pub use model::Model;
pub use rasterizer::Rasterizer;
pub use raytracer::RayTracer;
pub use renderer::{HardwareRenderer, RasterizationRenderer, RayTracingRenderer, Renderer};
pub use resource::Resource;
pub use settings::Settings;
