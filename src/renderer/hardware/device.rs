use std::sync::Arc;

use crate::{
    color::UnsignedColor, error::NativeApiError, renderer::hardware::fence::Fence,
    resource::Resource,
};

/// Device side buffer, valid for the lifetime of the device that created it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertices of `stride` bytes each
    Vertex { stride: usize },
    /// 32 bit indices
    Index,
    Constant,
}

impl BufferKind {
    /// Size of one element, uploads must be a whole number of elements.
    pub fn stride(&self) -> usize {
        match self {
            BufferKind::Vertex { stride } => *stride,
            BufferKind::Index => size_of::<u32>(),
            BufferKind::Constant => 1,
        }
    }
}

/// State of a back buffer. Drawing needs `RenderTarget`, presenting needs `Present`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceState {
    Present,
    RenderTarget,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    ResourceBarrier {
        back_buffer: usize,
        state: ResourceState,
    },
    SetViewport {
        width: usize,
        height: usize,
    },
    SetRenderTarget(usize),
    ClearRenderTarget {
        back_buffer: usize,
        color: UnsignedColor,
    },
    ClearDepth(f32),
    SetConstantBuffer(BufferHandle),
    SetVertexBuffer(BufferHandle),
    SetIndexBuffer(BufferHandle),
    DrawIndexed {
        index_count: usize,
        start_index: usize,
    },
}

impl Command {
    /// Buffer the command refers to, if any.
    pub fn buffer(&self) -> Option<BufferHandle> {
        match self {
            Command::SetConstantBuffer(buffer)
            | Command::SetVertexBuffer(buffer)
            | Command::SetIndexBuffer(buffer) => Some(*buffer),
            _ => None,
        }
    }
}

/// Commands recorded for one frame, using the command allocator of that frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandList {
    frame: usize,
    commands: Vec<Command>,
}

impl CommandList {
    pub(super) fn new(frame: usize) -> Self {
        CommandList {
            frame,
            commands: Vec::new(),
        }
    }

    pub fn record(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

/// Native graphics API as seen by the hardware renderer: a device with a single command queue,
/// a swap chain of back buffers and a fence signaled on the queue timeline.
///
/// Work submitted through `write_buffer`, `execute_command_list`, `signal` and `present`
/// executes in submission order, asynchronously to the caller. The fence is the only way to
/// learn that it has finished.
pub trait GraphicsDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferHandle, NativeApiError>;

    /// Replaces the buffer contents, ordered after all previously submitted work.
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> Result<(), NativeApiError>;

    fn execute_command_list(&mut self, list: CommandList) -> Result<(), NativeApiError>;

    /// Enqueues a fence signal to `value` once the work submitted so far completes.
    fn signal(&mut self, value: u64) -> Result<(), NativeApiError>;

    /// Presents the current back buffer and advances to the next one.
    fn present(&mut self) -> Result<(), NativeApiError>;

    fn current_back_buffer_index(&self) -> usize;

    fn fence(&self) -> Arc<Fence>;

    /// Copies a back buffer to CPU memory, after all previously submitted work.
    fn read_back_buffer(&mut self, back_buffer: usize) -> Result<Resource<UnsignedColor>, NativeApiError>;
}
