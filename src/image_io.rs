use std::path::Path;

use image::RgbImage;

use crate::{
    color::UnsignedColor,
    error::{AssetLoadError, Error},
    resource::Resource,
};

/// Writes a 2D render target to an image file, format is picked from the extension.
pub fn save_resource(resource: &Resource<UnsignedColor>, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let image = to_image(resource);
    image.save(path)?;
    log::info!(
        "Saved {}x{} image to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

pub fn to_image(resource: &Resource<UnsignedColor>) -> RgbImage {
    let width = resource.width() as u32;
    let height = resource.height() as u32;
    RgbImage::from_raw(width, height, resource.as_bytes().to_vec())
        .unwrap_or_else(|| unreachable!("Resource size always matches its dimensions"))
}

/// Loads an image file into a 2D resource.
pub fn load_texture(path: impl AsRef<Path>) -> Result<Resource<UnsignedColor>, AssetLoadError> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|source| AssetLoadError::Texture {
            path: path.to_owned(),
            source,
        })?
        .into_rgb8();

    let mut texture = Resource::new_2d(image.width() as usize, image.height() as usize);
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        *texture.item_at_mut(x as usize, y as usize) = UnsignedColor::new(r, g, b);
    }
    log::debug!(
        "Loaded texture {} ({}x{})",
        path.display(),
        texture.width(),
        texture.height()
    );
    Ok(texture)
}

/// Nearest neighbour lookup with wrapping, `v` grows upwards as in OBJ files.
/// Empty textures sample as black.
pub fn sample_texture(texture: &Resource<UnsignedColor>, uv: [f32; 2]) -> UnsignedColor {
    if texture.get_number_of_elements() == 0 {
        return UnsignedColor::default();
    }
    let width = texture.width();
    let height = texture.height();
    let x = (uv[0].rem_euclid(1.0) * width as f32) as usize;
    let y = ((1.0 - uv[1].rem_euclid(1.0)) * height as f32) as usize;
    *texture.item_at(x.min(width - 1), y.min(height - 1))
}
