use std::ops::{Add, AddAssign, Mul};

use bytemuck::{Pod, Zeroable};

use crate::geometry::{FloatType, WorldVector};

/// Linear floating point color, nominally in 0-1 range.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Color {
    pub r: FloatType,
    pub g: FloatType,
    pub b: FloatType,
}

/// 8 bit per channel color, the pixel format of saved images.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct UnsignedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Pixel types that a render target can be made of.
pub trait PixelFormat: Copy {
    fn from_color(color: Color) -> Self;
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: FloatType, g: FloatType, b: FloatType) -> Self {
        Color { r, g, b }
    }

    pub fn from_float3(value: WorldVector) -> Self {
        Color::new(value.x, value.y, value.z)
    }

    pub fn to_float3(self) -> WorldVector {
        WorldVector::new(self.r, self.g, self.b)
    }

    /// Componentwise product, used for filtering light by a surface color.
    pub fn component_mul(self, other: Color) -> Color {
        Color::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }
}

impl UnsignedColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        UnsignedColor { r, g, b }
    }

    pub fn from_float3(value: WorldVector) -> Self {
        Self::from_color(Color::from_float3(value))
    }

    pub fn to_float3(self) -> WorldVector {
        WorldVector::new(
            self.r as FloatType / 255.0,
            self.g as FloatType / 255.0,
            self.b as FloatType / 255.0,
        )
    }
}

/// Maps a 0-1 float channel to a byte, rounding half away from zero.
fn channel_to_byte(value: FloatType) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

impl PixelFormat for UnsignedColor {
    fn from_color(color: Color) -> Self {
        UnsignedColor {
            r: channel_to_byte(color.r),
            g: channel_to_byte(color.g),
            b: channel_to_byte(color.b),
        }
    }
}

impl PixelFormat for Color {
    fn from_color(color: Color) -> Self {
        color
    }
}

impl From<UnsignedColor> for Color {
    fn from(value: UnsignedColor) -> Self {
        Color::from_float3(value.to_float3())
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

impl Mul<FloatType> for Color {
    type Output = Color;

    fn mul(self, rhs: FloatType) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}
