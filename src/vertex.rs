use bytemuck::{Pod, Zeroable};

use crate::{
    color::Color,
    geometry::{BarycentricCoordinates, FloatType, WorldPoint, WorldVector},
};

/// Vertex layout shared by the model loader and all the renderers.
/// Field order is the layout uploaded to GPU vertex buffers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub x: FloatType,
    pub y: FloatType,
    pub z: FloatType,

    pub nx: FloatType,
    pub ny: FloatType,
    pub nz: FloatType,

    pub ambient_r: FloatType,
    pub ambient_g: FloatType,
    pub ambient_b: FloatType,

    pub diffuse_r: FloatType,
    pub diffuse_g: FloatType,
    pub diffuse_b: FloatType,

    pub emissive_r: FloatType,
    pub emissive_g: FloatType,
    pub emissive_b: FloatType,

    pub u: FloatType,
    pub v: FloatType,
}

/// What the rasterizer needs to know about a vertex type.
pub trait VertexData: Copy {
    fn position(&self) -> WorldPoint;

    /// Blend three vertices' attributes with the given weights.
    fn interpolate(vertices: &[Self; 3], bary: &BarycentricCoordinates) -> Self;
}

/// Vertex types that carry the surface description used by the ray tracer.
pub trait SurfaceVertex: VertexData {
    fn normal(&self) -> WorldVector;
    fn ambient(&self) -> Color;
    fn diffuse(&self) -> Color;
    fn emissive(&self) -> Color;
}

impl Vertex {
    pub fn set_position(&mut self, position: &WorldPoint) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }

    pub fn set_normal(&mut self, normal: &WorldVector) {
        self.nx = normal.x;
        self.ny = normal.y;
        self.nz = normal.z;
    }

    pub fn set_ambient(&mut self, color: Color) {
        [self.ambient_r, self.ambient_g, self.ambient_b] = [color.r, color.g, color.b];
    }

    pub fn set_diffuse(&mut self, color: Color) {
        [self.diffuse_r, self.diffuse_g, self.diffuse_b] = [color.r, color.g, color.b];
    }

    pub fn set_emissive(&mut self, color: Color) {
        [self.emissive_r, self.emissive_g, self.emissive_b] = [color.r, color.g, color.b];
    }

    pub fn texture_coordinates(&self) -> [FloatType; 2] {
        [self.u, self.v]
    }

    fn as_array(&self) -> &[FloatType; 17] {
        bytemuck::cast_ref(self)
    }
}

impl VertexData for Vertex {
    fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y, self.z)
    }

    fn interpolate(vertices: &[Self; 3], bary: &BarycentricCoordinates) -> Self {
        let [wa, wb, wc] = bary.weights();
        let [a, b, c] = vertices.each_ref().map(Vertex::as_array);
        let blended: [FloatType; 17] = std::array::from_fn(|i| a[i] * wa + b[i] * wb + c[i] * wc);
        bytemuck::cast(blended)
    }
}

impl SurfaceVertex for Vertex {
    fn normal(&self) -> WorldVector {
        WorldVector::new(self.nx, self.ny, self.nz)
    }

    fn ambient(&self) -> Color {
        Color::new(self.ambient_r, self.ambient_g, self.ambient_b)
    }

    fn diffuse(&self) -> Color {
        Color::new(self.diffuse_r, self.diffuse_g, self.diffuse_b)
    }

    fn emissive(&self) -> Color {
        Color::new(self.emissive_r, self.emissive_g, self.emissive_b)
    }
}
