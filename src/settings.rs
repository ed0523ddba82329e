use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    camera::Camera,
    geometry::{FloatType, WorldPoint},
    rasterizer::AttributeInterpolation,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Everything a renderer needs to know to produce an image.
/// Missing fields in a settings file take their default values.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub model_path: PathBuf,
    /// Where the rendered image is written, nothing is written when unset
    pub result_path: Option<PathBuf>,

    pub width: usize,
    pub height: usize,

    pub camera_position: [FloatType; 3],
    /// Degrees
    pub camera_theta: FloatType,
    /// Degrees
    pub camera_phi: FloatType,
    /// Vertical field of view, degrees
    pub camera_angle_of_view: FloatType,
    pub camera_z_near: FloatType,
    pub camera_z_far: FloatType,

    /// Maximum number of bounces of a path, including the primary ray
    pub raytracing_depth: u32,
    /// Number of jittered frames averaged per pixel
    pub accumulation_num: u32,

    pub attribute_interpolation: AttributeInterpolation,

    /// Number of frames the hardware renderer presents before it finishes
    pub frame_count: u32,

    /// Filter in env_logger syntax, overrides `RUST_LOG` when set
    pub log_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            model_path: PathBuf::from("data/cornell_box.obj"),
            result_path: Some(PathBuf::from("result.png")),
            width: 1920,
            height: 1080,
            camera_position: [0.0, 0.75, 2.5],
            camera_theta: 0.0,
            camera_phi: 0.0,
            camera_angle_of_view: 60.0,
            camera_z_near: 0.001,
            camera_z_far: 100.0,
            raytracing_depth: 3,
            accumulation_num: 1,
            attribute_interpolation: AttributeInterpolation::Flat,
            frame_count: 2,
            log_filter: None,
        }
    }
}

impl Settings {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Settings, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Camera placed and oriented as configured, with the output image's aspect ratio.
    pub fn camera(&self) -> Camera {
        Camera::builder()
            .position(WorldPoint::from(self.camera_position))
            .theta(self.camera_theta)
            .phi(self.camera_phi)
            .angle_of_view(self.camera_angle_of_view)
            .width(self.width as FloatType)
            .height(self.height as FloatType)
            .z_near(self.camera_z_near)
            .z_far(self.camera_z_far)
            .build()
    }
}
