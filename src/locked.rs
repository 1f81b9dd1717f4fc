use std::alloc::{GlobalAlloc, Layout};

use spin::{Mutex, MutexGuard};

use crate::{FreeListAllocator, MIN_ALIGN, grower::Grower, list::BlockTracker};

/// Serialises every call into the wrapped allocator behind one spin lock.
///
/// [`FreeListAllocator`] itself assumes a single caller. This wrapper is the
/// only thing in the crate that makes it shareable, and it is also what lets
/// it be installed with `#[global_allocator]`. The logger in use must not
/// allocate, or the first log line re-enters the lock.
pub struct Locked<A> {
  inner: Mutex<A>,
}

// The wrapped allocator only holds pointers into memory it owns, and every
// access goes through the mutex.
unsafe impl<G: Grower, T: BlockTracker> Sync for Locked<FreeListAllocator<G, T>> {}

impl<A> Locked<A> {
  pub const fn new(inner: A) -> Self {
    Self {
      inner: Mutex::new(inner),
    }
  }

  pub fn lock(&self) -> MutexGuard<'_, A> {
    self.inner.lock()
  }
}

impl<G: Grower, T: BlockTracker> Locked<FreeListAllocator<G, T>> {
  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    self.lock().allocate(size)
  }

  /// # Safety
  ///
  /// Same contract as [`FreeListAllocator::release`].
  pub unsafe fn release(
    &self,
    address: *mut u8,
  ) {
    unsafe { self.lock().release(address) }
  }
}

unsafe impl<G: Grower, T: BlockTracker> GlobalAlloc for Locked<FreeListAllocator<G, T>> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > MIN_ALIGN {
      return std::ptr::null_mut();
    }

    self.allocate(layout.size())
  }

  unsafe fn dealloc(
    &self,
    address: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.release(address) }
  }
}
