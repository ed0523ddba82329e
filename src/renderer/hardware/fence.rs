use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::NativeApiError;

/// Monotonically increasing counter signaled by the GPU timeline and waited on by the CPU.
///
/// A fence can also be marked lost, which wakes every waiter with
/// [`NativeApiError::DeviceLost`] instead of blocking forever on a value that will never come.
#[derive(Debug, Default)]
pub struct Fence {
    state: Mutex<FenceState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct FenceState {
    value: u64,
    lost: bool,
}

impl Fence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the completed value. Values lower than the current one are ignored.
    pub fn signal(&self, value: u64) {
        let mut state = self.lock();
        if value > state.value {
            state.value = value;
            self.changed.notify_all();
        }
    }

    pub fn completed_value(&self) -> u64 {
        self.lock().value
    }

    /// Blocks until the completed value reaches `value`.
    pub fn wait(&self, value: u64) -> Result<(), NativeApiError> {
        let state = self
            .changed
            .wait_while(self.lock(), |state| state.value < value && !state.lost)
            .unwrap_or_else(PoisonError::into_inner);

        if state.value >= value {
            Ok(())
        } else {
            Err(NativeApiError::DeviceLost)
        }
    }

    pub fn mark_lost(&self) {
        self.lock().lost = true;
        self.changed.notify_all();
    }

    pub fn is_lost(&self) -> bool {
        self.lock().lost
    }

    fn lock(&self) -> MutexGuard<'_, FenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
