use crate::{
    color::Color,
    geometry::{BarycentricCoordinates, FloatType},
};

/// Result of tracing a single ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Payload {
    /// Distance along the ray to the hit, negative when nothing was hit
    pub t: FloatType,
    pub bary: BarycentricCoordinates,
    pub color: Color,
}

impl Payload {
    pub const MISS_T: FloatType = -1.0;

    /// Result of a ray that hit nothing and carries no light.
    pub fn terminal() -> Self {
        Payload {
            t: Self::MISS_T,
            bary: BarycentricCoordinates::default(),
            color: Color::BLACK,
        }
    }

    pub fn from_color(color: Color) -> Self {
        Payload {
            color,
            ..Self::terminal()
        }
    }

    pub fn is_hit(&self) -> bool {
        self.t >= 0.0
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::terminal()
    }
}
