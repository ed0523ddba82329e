use itertools::iproduct;
use serde::Deserialize;

use crate::{
    color::{Color, PixelFormat},
    error::{Binding, RenderError, ShaderStage},
    geometry::{BarycentricCoordinates, ClipPoint, EPSILON, FloatType, ScreenPoint, edge_function},
    resource::Resource,
    vertex::VertexData,
};

/// Value a depth buffer is cleared to, everything drawn is nearer than this.
pub const DEPTH_CLEAR_VALUE: FloatType = FloatType::INFINITY;

/// Maps a model space position (with `w = 1`) and its vertex to a clip space position and
/// the attributes passed on to the pixel shader.
pub type VertexShader<'a, V> = Box<dyn Fn(ClipPoint, &V) -> (ClipPoint, V) + 'a>;

/// Computes the color of a covered pixel from vertex attributes and interpolated depth.
pub type PixelShader<'a, V> = Box<dyn Fn(&V, FloatType) -> Color + 'a>;

/// What vertex data the pixel shader gets to see.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeInterpolation {
    /// Vertex shader output of the triangle's first vertex, for every pixel.
    #[default]
    Flat,
    /// Vertex shader outputs blended with the pixel's screen space barycentric weights.
    Barycentric,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

/// Triangle scan conversion with programmable vertex and pixel stages.
///
/// The rasterizer borrows everything it works with for the duration of a render pass.
/// Triangles are drawn when they are counter-clockwise in normalized device coordinates,
/// others are culled. Depth is linearly interpolated in screen space, smaller is nearer.
pub struct Rasterizer<'a, V, P> {
    render_target: Option<&'a mut Resource<P>>,
    depth_buffer: Option<&'a mut Resource<FloatType>>,
    viewport: Option<Viewport>,

    vertex_buffer: Option<&'a Resource<V>>,
    index_buffer: Option<&'a Resource<u32>>,

    vertex_shader: Option<VertexShader<'a, V>>,
    pixel_shader: Option<PixelShader<'a, V>>,

    interpolation: AttributeInterpolation,
}

/// Vertex after the vertex shader and the viewport transform.
#[derive(Copy, Clone, Debug)]
struct ProjectedVertex {
    screen: ScreenPoint,
    depth: FloatType,
}

impl<'a, V: VertexData, P: PixelFormat> Default for Rasterizer<'a, V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, V: VertexData, P: PixelFormat> Rasterizer<'a, V, P> {
    pub fn new() -> Self {
        Rasterizer {
            render_target: None,
            depth_buffer: None,
            viewport: None,
            vertex_buffer: None,
            index_buffer: None,
            vertex_shader: None,
            pixel_shader: None,
            interpolation: AttributeInterpolation::default(),
        }
    }

    /// Binds the 2D render target and optional depth buffer.
    /// Unless set explicitly, the viewport covers the whole render target.
    pub fn set_render_target(
        &mut self,
        render_target: &'a mut Resource<P>,
        depth_buffer: Option<&'a mut Resource<FloatType>>,
    ) {
        if self.viewport.is_none() {
            self.viewport = Some(Viewport {
                width: render_target.width(),
                height: render_target.height(),
            });
        }
        self.render_target = Some(render_target);
        self.depth_buffer = depth_buffer;
    }

    /// Fills the render target with `color` and the depth buffer with [`DEPTH_CLEAR_VALUE`].
    pub fn clear_render_target(&mut self, color: P) {
        self.clear_render_target_with_depth(color, DEPTH_CLEAR_VALUE);
    }

    pub fn clear_render_target_with_depth(&mut self, color: P, depth: FloatType) {
        if let Some(render_target) = self.render_target.as_deref_mut() {
            render_target.fill(color);
        }
        if let Some(depth_buffer) = self.depth_buffer.as_deref_mut() {
            depth_buffer.fill(depth);
        }
    }

    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.viewport = Some(Viewport { width, height });
    }

    pub fn get_viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn set_vertex_buffer(&mut self, vertex_buffer: &'a Resource<V>) {
        self.vertex_buffer = Some(vertex_buffer);
    }

    pub fn set_index_buffer(&mut self, index_buffer: &'a Resource<u32>) {
        self.index_buffer = Some(index_buffer);
    }

    pub fn set_vertex_shader(&mut self, shader: impl Fn(ClipPoint, &V) -> (ClipPoint, V) + 'a) {
        self.vertex_shader = Some(Box::new(shader));
    }

    pub fn set_pixel_shader(&mut self, shader: impl Fn(&V, FloatType) -> Color + 'a) {
        self.pixel_shader = Some(Box::new(shader));
    }

    pub fn set_interpolation(&mut self, interpolation: AttributeInterpolation) {
        self.interpolation = interpolation;
    }

    /// Draws `count` indices starting at `offset` of the bound index buffer as a triangle list.
    /// A trailing group of less than three indices is ignored.
    pub fn draw(&mut self, count: usize, offset: usize) -> Result<(), RenderError> {
        let vertex_shader = self
            .vertex_shader
            .as_ref()
            .ok_or(RenderError::MissingShader(ShaderStage::Vertex))?;
        let pixel_shader = self
            .pixel_shader
            .as_ref()
            .ok_or(RenderError::MissingShader(ShaderStage::Pixel))?;
        let vertex_buffer = self
            .vertex_buffer
            .ok_or(RenderError::MissingBinding(Binding::VertexBuffer))?;
        let index_buffer = self
            .index_buffer
            .ok_or(RenderError::MissingBinding(Binding::IndexBuffer))?;
        let render_target = self
            .render_target
            .as_deref_mut()
            .ok_or(RenderError::MissingBinding(Binding::RenderTarget))?;
        let Some(viewport) = self.viewport else {
            return Err(RenderError::MissingBinding(Binding::RenderTarget));
        };
        let mut depth_buffer = self.depth_buffer.as_deref_mut();

        let mut culled = 0usize;
        let triangle_count = count / 3;

        for triangle in 0..triangle_count {
            let first = offset + triangle * 3;
            let vertices: [V; 3] = std::array::from_fn(|i| {
                *vertex_buffer.item(*index_buffer.item(first + i) as usize)
            });

            let shaded = vertices.map(|vertex| {
                let p = vertex.position();
                vertex_shader(ClipPoint::new(p.x, p.y, p.z, 1.0), &vertex)
            });

            let Some(projected) = project_triangle(&shaded.map(|(clip, _)| clip), &viewport) else {
                culled += 1;
                continue;
            };
            let attributes = shaded.map(|(_, attributes)| attributes);

            let [s0, s1, s2] = projected.map(|v| v.screen);
            let area = edge_function(&s0, &s1, &s2);
            if area < EPSILON {
                culled += 1;
                continue;
            }

            let Some((x_range, y_range)) = bounding_box(&projected, &viewport) else {
                culled += 1;
                continue;
            };

            for (y, x) in iproduct!(y_range, x_range.clone()) {
                let pixel = ScreenPoint::new(x as FloatType + 0.5, y as FloatType + 0.5);
                let e0 = edge_function(&s1, &s2, &pixel);
                let e1 = edge_function(&s2, &s0, &pixel);
                let e2 = edge_function(&s0, &s1, &pixel);
                if e0 < 0.0 || e1 < 0.0 || e2 < 0.0 {
                    continue;
                }

                let bary = BarycentricCoordinates::new(e1 / area, e2 / area);
                let depth = bary.interpolate(projected[0].depth, projected[1].depth, projected[2].depth);

                if let Some(depth_buffer) = depth_buffer.as_deref_mut() {
                    let stored = depth_buffer.item_at_mut(x, y);
                    if *stored <= depth {
                        continue;
                    }
                    *stored = depth;
                }

                let color = match self.interpolation {
                    AttributeInterpolation::Flat => pixel_shader(&attributes[0], depth),
                    AttributeInterpolation::Barycentric => {
                        pixel_shader(&V::interpolate(&attributes, &bary), depth)
                    }
                };
                *render_target.item_at_mut(x, y) = P::from_color(color);
            }
        }

        log::trace!("Drew {triangle_count} triangles, {culled} culled or clipped");
        Ok(())
    }
}

/// Perspective divide and viewport transform. Returns `None` for triangles that can't be
/// drawn: a vertex behind the eye or a position that isn't finite.
fn project_triangle(clip: &[ClipPoint; 3], viewport: &Viewport) -> Option<[ProjectedVertex; 3]> {
    if clip.iter().any(|p| p.w <= 0.0) {
        return None;
    }

    let width = viewport.width as FloatType;
    let height = viewport.height as FloatType;
    let projected = clip.map(|p| {
        let ndc = p.xyz() / p.w;
        ProjectedVertex {
            screen: ScreenPoint::new((ndc.x + 1.0) * width / 2.0, (-ndc.y + 1.0) * height / 2.0),
            depth: ndc.z,
        }
    });

    let finite = projected
        .iter()
        .all(|v| v.screen.x.is_finite() && v.screen.y.is_finite() && v.depth.is_finite());
    finite.then_some(projected)
}

/// Inclusive pixel ranges touched by the triangle, clamped to the viewport.
fn bounding_box(
    vertices: &[ProjectedVertex; 3],
    viewport: &Viewport,
) -> Option<(std::ops::RangeInclusive<usize>, std::ops::RangeInclusive<usize>)> {
    if viewport.width == 0 || viewport.height == 0 {
        return None;
    }

    let min_x = vertices.iter().map(|v| v.screen.x).fold(FloatType::INFINITY, FloatType::min);
    let max_x = vertices.iter().map(|v| v.screen.x).fold(FloatType::NEG_INFINITY, FloatType::max);
    let min_y = vertices.iter().map(|v| v.screen.y).fold(FloatType::INFINITY, FloatType::min);
    let max_y = vertices.iter().map(|v| v.screen.y).fold(FloatType::NEG_INFINITY, FloatType::max);

    let last_x = (viewport.width - 1) as FloatType;
    let last_y = (viewport.height - 1) as FloatType;
    if max_x < 0.0 || max_y < 0.0 || min_x.floor() > last_x || min_y.floor() > last_y {
        return None;
    }

    let x_range = (min_x.floor().max(0.0) as usize)..=(max_x.floor().min(last_x) as usize);
    let y_range = (min_y.floor().max(0.0) as usize)..=(max_y.floor().min(last_y) as usize);
    Some((x_range, y_range))
}
