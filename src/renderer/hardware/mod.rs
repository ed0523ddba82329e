//! Frontend for a double buffered native graphics API.
//!
//! The renderer owns the frame synchronisation: one fence value per back buffer, a CPU wait
//! before a back buffer and its command allocator are reused, and a full GPU flush on
//! initialization and teardown. The device itself sits behind [`GraphicsDevice`];
//! [`SoftwareDevice`] runs the recorded commands with the software rasterizer.

mod device;
mod fence;
mod frame;
mod software_device;

pub use device::{BufferHandle, BufferKind, Command, CommandList, GraphicsDevice, ResourceState};
pub use fence::Fence;
pub use frame::CommandAllocator;
pub use software_device::SoftwareDevice;

use std::sync::Arc;

use crate::{
    camera::{Camera, to_row_vector_layout},
    color::UnsignedColor,
    error::Error,
    geometry::{FloatType, Matrix},
    input::InputState,
    model::Model,
    renderer::{Renderer, save_result},
    resource::Resource,
    settings::Settings,
    vertex::Vertex,
};

/// Number of back buffers in the swap chain.
pub const FRAME_COUNT: usize = 2;

pub const CLEAR_COLOR: UnsignedColor = UnsignedColor::new(0, 51, 102);

pub struct HardwareRenderer<D: GraphicsDevice> {
    settings: Settings,
    camera: Camera,
    device: D,
    fence: Arc<Fence>,
    assets: Option<Assets>,

    frame_index: usize,
    fence_values: [u64; FRAME_COUNT],
    allocators: [CommandAllocator; FRAME_COUNT],
    last_presented: Option<usize>,
}

/// Device buffers of the loaded model.
struct Assets {
    world_matrix: Matrix,
    shapes: Vec<ShapeBuffers>,
    constant_buffer: BufferHandle,
}

struct ShapeBuffers {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: usize,
}

impl HardwareRenderer<SoftwareDevice> {
    /// Renderer on a [`SoftwareDevice`] sized for the configured image.
    pub fn with_software_device(settings: Settings) -> Result<Self, Error> {
        let device = SoftwareDevice::new(settings.width, settings.height)?;
        Ok(Self::new(settings, device))
    }
}

impl<D: GraphicsDevice> HardwareRenderer<D> {
    pub fn new(settings: Settings, device: D) -> Self {
        HardwareRenderer {
            camera: settings.camera(),
            fence: device.fence(),
            frame_index: device.current_back_buffer_index(),
            fence_values: [0; FRAME_COUNT],
            allocators: std::array::from_fn(CommandAllocator::new),
            assets: None,
            last_presented: None,
            device,
            settings,
        }
    }

    /// Uploads an already loaded model instead of reading the configured file.
    pub fn init_with_model(&mut self, model: Model) -> Result<(), Error> {
        self.camera = self.settings.camera();
        self.load_assets(&model)?;

        // Uploads must finish before the first frame
        self.fence_values[self.frame_index] += 1;
        self.wait_for_gpu()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Back buffer the next frame renders into.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn fence_values(&self) -> [u64; FRAME_COUNT] {
        self.fence_values
    }

    fn load_assets(&mut self, model: &Model) -> Result<(), Error> {
        let shapes = model
            .shapes()
            .iter()
            .map(|shape| -> Result<ShapeBuffers, Error> {
                let vertex_buffer = self.device.create_buffer(
                    BufferKind::Vertex {
                        stride: size_of::<Vertex>(),
                    },
                    shape.vertex_buffer().as_bytes(),
                )?;
                let index_buffer = self
                    .device
                    .create_buffer(BufferKind::Index, shape.index_buffer().as_bytes())?;
                log::debug!(
                    "Uploaded shape {}: {} vertices, {} indices",
                    shape.name,
                    shape.vertex_buffer().get_number_of_elements(),
                    shape.index_buffer().get_number_of_elements()
                );
                Ok(ShapeBuffers {
                    vertex_buffer,
                    index_buffer,
                    index_count: shape.index_buffer().get_number_of_elements(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let world_matrix = model.get_world_matrix();
        let constants = self.world_view_projection(&world_matrix);
        let constant_buffer = self
            .device
            .create_buffer(BufferKind::Constant, bytemuck::bytes_of(&constants))?;

        log::info!("Uploaded {} shapes to the device", shapes.len());
        self.assets = Some(Assets {
            world_matrix,
            shapes,
            constant_buffer,
        });
        Ok(())
    }

    fn world_view_projection(&self, world_matrix: &Matrix) -> [[FloatType; 4]; 4] {
        to_row_vector_layout(
            &(self.camera.get_projection_matrix() * self.camera.get_view_matrix() * world_matrix),
        )
    }

    fn populate_command_list(&mut self) -> Result<CommandList, Error> {
        let assets = self.assets.as_ref().ok_or(Error::NotInitialized)?;
        let back_buffer = self.frame_index;

        let mut list = self.allocators[back_buffer].begin(&self.fence)?;
        list.record(Command::ResourceBarrier {
            back_buffer,
            state: ResourceState::RenderTarget,
        });
        list.record(Command::SetViewport {
            width: self.settings.width,
            height: self.settings.height,
        });
        list.record(Command::SetRenderTarget(back_buffer));
        list.record(Command::ClearRenderTarget {
            back_buffer,
            color: CLEAR_COLOR,
        });
        list.record(Command::ClearDepth(1.0));
        list.record(Command::SetConstantBuffer(assets.constant_buffer));

        for shape in &assets.shapes {
            list.record(Command::SetVertexBuffer(shape.vertex_buffer));
            list.record(Command::SetIndexBuffer(shape.index_buffer));
            list.record(Command::DrawIndexed {
                index_count: shape.index_count,
                start_index: 0,
            });
        }

        list.record(Command::ResourceBarrier {
            back_buffer,
            state: ResourceState::Present,
        });
        Ok(list)
    }

    /// Blocks until the GPU has finished everything submitted so far.
    fn wait_for_gpu(&mut self) -> Result<(), Error> {
        let value = self.fence_values[self.frame_index];
        self.device.signal(value)?;
        self.fence.wait(value)?;
        self.fence_values[self.frame_index] += 1;
        Ok(())
    }

    /// Signals the end of the current frame and waits until the next back buffer is free.
    fn move_to_next_frame(&mut self) -> Result<(), Error> {
        let current_value = self.fence_values[self.frame_index];
        self.device.signal(current_value)?;

        self.frame_index = self.device.current_back_buffer_index();
        let next_value = self.fence_values[self.frame_index];
        if self.fence.completed_value() < next_value {
            self.fence.wait(next_value)?;
        }
        self.fence_values[self.frame_index] = current_value + 1;
        Ok(())
    }
}

impl<D: GraphicsDevice> Renderer for HardwareRenderer<D> {
    fn init(&mut self) -> Result<(), Error> {
        let model = Model::load_obj(&self.settings.model_path)?;
        self.init_with_model(model)
    }

    fn update(&mut self, input: &InputState, frame_seconds: FloatType) -> Result<(), Error> {
        let assets = self.assets.as_ref().ok_or(Error::NotInitialized)?;
        self.camera.apply_input(input, frame_seconds);

        let constants = self.world_view_projection(&assets.world_matrix);
        self.device
            .write_buffer(assets.constant_buffer, bytemuck::bytes_of(&constants))?;
        Ok(())
    }

    fn render(&mut self) -> Result<(), Error> {
        let list = self.populate_command_list()?;
        self.device.execute_command_list(list)?;
        self.allocators[self.frame_index].submitted(self.fence_values[self.frame_index]);

        self.device.present()?;
        self.last_presented = Some(self.frame_index);
        log::debug!(
            "Presented back buffer {} with fence value {}",
            self.frame_index,
            self.fence_values[self.frame_index]
        );

        self.move_to_next_frame()
    }

    fn result(&mut self) -> Result<Resource<UnsignedColor>, Error> {
        let back_buffer = self.last_presented.ok_or(Error::NotInitialized)?;
        self.wait_for_gpu()?;
        Ok(self.device.read_back_buffer(back_buffer)?)
    }

    /// Flushes the GPU and saves the last presented image.
    fn destroy(&mut self) -> Result<(), Error> {
        if self.assets.is_none() {
            return Ok(());
        }
        self.wait_for_gpu()?;
        if let Some(back_buffer) = self.last_presented {
            let image = self.device.read_back_buffer(back_buffer)?;
            save_result(&self.settings, &image)?;
        }
        self.assets = None;
        Ok(())
    }
}
