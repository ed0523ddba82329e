use crate::{
    error::NativeApiError,
    renderer::hardware::{device::CommandList, fence::Fence},
};

/// Backing memory of the command lists of one frame.
///
/// It can only be reset once the GPU has finished the last command list recorded with it,
/// that is once the fence has reached the value signaled after that list.
#[derive(Debug)]
pub struct CommandAllocator {
    frame: usize,
    in_flight_until: u64,
}

impl CommandAllocator {
    pub fn new(frame: usize) -> Self {
        CommandAllocator {
            frame,
            in_flight_until: 0,
        }
    }

    /// Resets the allocator and starts a new command list for its frame.
    pub fn begin(&mut self, fence: &Fence) -> Result<CommandList, NativeApiError> {
        if fence.completed_value() < self.in_flight_until {
            return Err(NativeApiError::AllocatorInUse { frame: self.frame });
        }
        Ok(CommandList::new(self.frame))
    }

    /// Marks the allocator busy until the fence reaches `fence_value`.
    pub fn submitted(&mut self, fence_value: u64) {
        self.in_flight_until = fence_value;
    }
}
