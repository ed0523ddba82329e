use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use crate::{
    color::UnsignedColor,
    error::{Binding, Error, NativeApiError, RenderError},
    geometry::Matrix,
    rasterizer::{AttributeInterpolation, Rasterizer, Viewport},
    renderer::hardware::{
        FRAME_COUNT,
        device::{BufferHandle, BufferKind, Command, CommandList, GraphicsDevice, ResourceState},
        fence::Fence,
    },
    resource::Resource,
    vertex::{SurfaceVertex as _, Vertex},
};

/// Size of the world-view-projection matrix at the start of a constant buffer.
const MATRIX_SIZE: usize = size_of::<[[f32; 4]; 4]>();

/// Graphics device whose GPU is a thread running the software rasterizer.
///
/// Everything submitted is sent to the `gpu` thread over a channel and executed there in
/// order. Uploads are validated here, so that mistakes are reported by the call that made
/// them. Any failure on the GPU thread loses the device: the fence wakes its waiters with
/// [`NativeApiError::DeviceLost`] and every later call fails the same way.
///
/// The pipeline is fixed: vertices are transformed by the matrix in the bound constant
/// buffer and pixels take the barycentrically interpolated ambient color.
pub struct SoftwareDevice {
    sender: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
    fence: Arc<Fence>,

    buffers: Vec<BufferKind>,
    back_buffer_index: usize,
}

enum Message {
    CreateBuffer {
        kind: BufferKind,
        data: Vec<u8>,
    },
    WriteBuffer {
        buffer: BufferHandle,
        data: Vec<u8>,
    },
    Execute(CommandList),
    Signal(u64),
    Present {
        back_buffer: usize,
    },
    ReadBack {
        back_buffer: usize,
        reply: Sender<Resource<UnsignedColor>>,
    },
}

impl SoftwareDevice {
    /// Creates the device with `FRAME_COUNT` back buffers of the given size and starts its
    /// GPU thread.
    pub fn new(width: usize, height: usize) -> Result<Self, NativeApiError> {
        let (sender, receiver) = mpsc::channel();
        let fence = Arc::new(Fence::new());

        let worker = {
            let fence = Arc::clone(&fence);
            thread::Builder::new()
                .name("gpu".to_owned())
                .spawn(move || run_gpu(&fence, receiver, width, height))
                .map_err(|error| {
                    log::error!("Failed to start the GPU thread: {error}");
                    NativeApiError::DeviceLost
                })?
        };
        log::debug!("Software device with {FRAME_COUNT} back buffers of {width}x{height}");

        Ok(SoftwareDevice {
            sender: Some(sender),
            worker: Some(worker),
            fence,
            buffers: Vec::new(),
            back_buffer_index: 0,
        })
    }

    fn send(&self, message: Message) -> Result<(), NativeApiError> {
        if self.fence.is_lost() {
            return Err(NativeApiError::DeviceLost);
        }
        self.sender
            .as_ref()
            .ok_or(NativeApiError::DeviceLost)?
            .send(message)
            .map_err(|_| NativeApiError::DeviceLost)
    }

    fn check_buffer(&self, buffer: BufferHandle) -> Result<BufferKind, NativeApiError> {
        self.buffers
            .get(buffer.0)
            .copied()
            .ok_or(NativeApiError::UnknownBuffer(buffer.0))
    }
}

/// Uploads must be a whole number of elements and vertices must have the layout of [`Vertex`].
fn check_upload(kind: BufferKind, data: &[u8]) -> Result<(), NativeApiError> {
    let stride = kind.stride();
    let wrong_layout = matches!(kind, BufferKind::Vertex { stride } if stride != size_of::<Vertex>());
    if stride == 0 || wrong_layout || data.len() % stride != 0 {
        return Err(NativeApiError::MalformedUpload {
            size: data.len(),
            stride,
        });
    }
    Ok(())
}

impl GraphicsDevice for SoftwareDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferHandle, NativeApiError> {
        check_upload(kind, data)?;
        self.send(Message::CreateBuffer {
            kind,
            data: data.to_vec(),
        })?;
        self.buffers.push(kind);
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), NativeApiError> {
        let kind = self.check_buffer(buffer)?;
        check_upload(kind, data)?;
        self.send(Message::WriteBuffer {
            buffer,
            data: data.to_vec(),
        })
    }

    fn execute_command_list(&mut self, list: CommandList) -> Result<(), NativeApiError> {
        for buffer in list.commands().iter().filter_map(Command::buffer) {
            self.check_buffer(buffer)?;
        }
        self.send(Message::Execute(list))
    }

    fn signal(&mut self, value: u64) -> Result<(), NativeApiError> {
        self.send(Message::Signal(value))
    }

    fn present(&mut self) -> Result<(), NativeApiError> {
        self.send(Message::Present {
            back_buffer: self.back_buffer_index,
        })?;
        self.back_buffer_index = (self.back_buffer_index + 1) % FRAME_COUNT;
        Ok(())
    }

    fn current_back_buffer_index(&self) -> usize {
        self.back_buffer_index
    }

    fn fence(&self) -> Arc<Fence> {
        Arc::clone(&self.fence)
    }

    fn read_back_buffer(&mut self, back_buffer: usize) -> Result<Resource<UnsignedColor>, NativeApiError> {
        if back_buffer >= FRAME_COUNT {
            return Err(NativeApiError::UnknownBuffer(back_buffer));
        }
        let (reply, replies) = mpsc::channel();
        self.send(Message::ReadBack { back_buffer, reply })?;
        replies.recv().map_err(|_| NativeApiError::DeviceLost)
    }
}

impl Drop for SoftwareDevice {
    fn drop(&mut self) {
        // Closing the channel stops the GPU thread once it has drained the queue
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("GPU thread panicked");
            }
        }
    }
}

fn run_gpu(fence: &Fence, receiver: Receiver<Message>, width: usize, height: usize) {
    let _lost_on_panic = LostOnPanic(fence);
    let mut gpu = Gpu::new(fence, width, height);

    for message in receiver {
        if let Err(error) = gpu.process(message) {
            log::error!("Device lost: {error}");
            fence.mark_lost();
            return;
        }
    }
    log::debug!("GPU thread finished");
}

struct LostOnPanic<'a>(&'a Fence);

impl Drop for LostOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.mark_lost();
        }
    }
}

/// State owned by the GPU thread.
struct Gpu<'a> {
    fence: &'a Fence,
    buffers: Vec<GpuBuffer>,
    back_buffers: Vec<BackBuffer>,
    depth_buffer: Resource<f32>,
}

enum GpuBuffer {
    Vertex(Resource<Vertex>),
    Index(Resource<u32>),
    Constant(Vec<u8>),
}

struct BackBuffer {
    image: Resource<UnsignedColor>,
    state: ResourceState,
}

/// Bindings of the command list being executed. Nothing carries over between lists.
#[derive(Default)]
struct Pipeline {
    viewport: Option<Viewport>,
    render_target: Option<usize>,
    constant_buffer: Option<BufferHandle>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

impl GpuBuffer {
    fn upload(kind: BufferKind, data: &[u8]) -> Self {
        match kind {
            BufferKind::Vertex { .. } => GpuBuffer::Vertex(Resource::from_vec(bytemuck::pod_collect_to_vec(data))),
            BufferKind::Index => GpuBuffer::Index(Resource::from_vec(bytemuck::pod_collect_to_vec(data))),
            BufferKind::Constant => GpuBuffer::Constant(data.to_vec()),
        }
    }

    fn kind(&self) -> BufferKind {
        match self {
            GpuBuffer::Vertex(_) => BufferKind::Vertex {
                stride: size_of::<Vertex>(),
            },
            GpuBuffer::Index(_) => BufferKind::Index,
            GpuBuffer::Constant(_) => BufferKind::Constant,
        }
    }
}

impl<'a> Gpu<'a> {
    fn new(fence: &'a Fence, width: usize, height: usize) -> Self {
        Gpu {
            fence,
            buffers: Vec::new(),
            back_buffers: (0..FRAME_COUNT)
                .map(|_| BackBuffer {
                    image: Resource::new_2d(width, height),
                    state: ResourceState::Present,
                })
                .collect(),
            depth_buffer: Resource::new_2d(width, height),
        }
    }

    fn process(&mut self, message: Message) -> Result<(), Error> {
        match message {
            Message::CreateBuffer { kind, data } => self.buffers.push(GpuBuffer::upload(kind, &data)),
            Message::WriteBuffer { buffer, data } => {
                let slot = self
                    .buffers
                    .get_mut(buffer.0)
                    .ok_or(NativeApiError::UnknownBuffer(buffer.0))?;
                *slot = GpuBuffer::upload(slot.kind(), &data);
            }
            Message::Execute(list) => {
                let mut pipeline = Pipeline::default();
                for command in list.commands() {
                    self.execute(command, &mut pipeline)?;
                }
                log::trace!("Executed {} commands of frame {}", list.commands().len(), list.frame());
            }
            Message::Signal(value) => self.fence.signal(value),
            Message::Present { back_buffer } => {
                back_buffer_in_state(&mut self.back_buffers, back_buffer, ResourceState::Present)?;
                log::trace!("Presented back buffer {back_buffer}");
            }
            Message::ReadBack { back_buffer, reply } => {
                let image = back_buffer_in_state(&mut self.back_buffers, back_buffer, ResourceState::Present)?;
                // The caller may have stopped waiting, which is not the GPU's problem
                let _ = reply.send(image.clone());
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: &Command, pipeline: &mut Pipeline) -> Result<(), Error> {
        match *command {
            Command::ResourceBarrier { back_buffer, state } => {
                self.back_buffers
                    .get_mut(back_buffer)
                    .ok_or(NativeApiError::UnknownBuffer(back_buffer))?
                    .state = state;
            }
            Command::SetViewport { width, height } => pipeline.viewport = Some(Viewport { width, height }),
            Command::SetRenderTarget(back_buffer) => pipeline.render_target = Some(back_buffer),
            Command::ClearRenderTarget { back_buffer, color } => {
                back_buffer_in_state(&mut self.back_buffers, back_buffer, ResourceState::RenderTarget)?.fill(color);
            }
            Command::ClearDepth(depth) => self.depth_buffer.fill(depth),
            Command::SetConstantBuffer(buffer) => pipeline.constant_buffer = Some(buffer),
            Command::SetVertexBuffer(buffer) => pipeline.vertex_buffer = Some(buffer),
            Command::SetIndexBuffer(buffer) => pipeline.index_buffer = Some(buffer),
            Command::DrawIndexed {
                index_count,
                start_index,
            } => self.draw_indexed(pipeline, index_count, start_index)?,
        }
        Ok(())
    }

    fn draw_indexed(&mut self, pipeline: &Pipeline, index_count: usize, start_index: usize) -> Result<(), Error> {
        let constants = bound(&self.buffers, pipeline.constant_buffer, Binding::ConstantBuffer, |buffer| {
            match buffer {
                GpuBuffer::Constant(bytes) => Some(bytes.as_slice()),
                _ => None,
            }
        })?;
        let vertices = bound(&self.buffers, pipeline.vertex_buffer, Binding::VertexBuffer, |buffer| {
            match buffer {
                GpuBuffer::Vertex(vertices) => Some(vertices),
                _ => None,
            }
        })?;
        let indices = bound(&self.buffers, pipeline.index_buffer, Binding::IndexBuffer, |buffer| {
            match buffer {
                GpuBuffer::Index(indices) => Some(indices),
                _ => None,
            }
        })?;

        // Row-vector layout stores the matrix transposed, which is exactly nalgebra's
        // column major order
        let native: [[f32; 4]; 4] = constants
            .get(..MATRIX_SIZE)
            .and_then(|bytes| bytemuck::try_pod_read_unaligned(bytes).ok())
            .ok_or(NativeApiError::MalformedUpload {
                size: constants.len(),
                stride: MATRIX_SIZE,
            })?;
        let world_view_projection = Matrix::from(native);

        let render_target = pipeline
            .render_target
            .ok_or(RenderError::MissingBinding(Binding::RenderTarget))?;
        let image = back_buffer_in_state(&mut self.back_buffers, render_target, ResourceState::RenderTarget)?;

        let mut rasterizer = Rasterizer::<Vertex, UnsignedColor>::new();
        rasterizer.set_render_target(image, Some(&mut self.depth_buffer));
        if let Some(viewport) = pipeline.viewport {
            rasterizer.set_viewport(viewport.width, viewport.height);
        }
        rasterizer.set_interpolation(AttributeInterpolation::Barycentric);
        rasterizer.set_vertex_shader(move |position, vertex| (world_view_projection * position, *vertex));
        rasterizer.set_pixel_shader(|vertex, _depth| vertex.ambient());
        rasterizer.set_vertex_buffer(vertices);
        rasterizer.set_index_buffer(indices);
        rasterizer.draw(index_count, start_index)?;
        Ok(())
    }
}

fn bound<'b, T: ?Sized>(
    buffers: &'b [GpuBuffer],
    buffer: Option<BufferHandle>,
    binding: Binding,
    select: impl Fn(&'b GpuBuffer) -> Option<&'b T>,
) -> Result<&'b T, Error> {
    let buffer = buffer.ok_or(RenderError::MissingBinding(binding))?;
    let gpu_buffer = buffers
        .get(buffer.0)
        .ok_or(NativeApiError::UnknownBuffer(buffer.0))?;
    Ok(select(gpu_buffer).ok_or(NativeApiError::BufferKindMismatch(buffer.0))?)
}

fn back_buffer_in_state(
    back_buffers: &mut [BackBuffer],
    index: usize,
    expected: ResourceState,
) -> Result<&mut Resource<UnsignedColor>, NativeApiError> {
    let back_buffer = back_buffers
        .get_mut(index)
        .ok_or(NativeApiError::UnknownBuffer(index))?;
    if back_buffer.state != expected {
        return Err(NativeApiError::WrongResourceState {
            back_buffer: index,
            expected,
        });
    }
    Ok(&mut back_buffer.image)
}
