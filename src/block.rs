use std::{mem, ptr};

use crate::MIN_ALIGN;

/// Metadata written in place at the start of every block.
///
/// ```text
///   ┌──────────────────────────┬──────────────────────────┐
///   │ BlockHeader (HEADER_SIZE)│  size bytes of user data │
///   └──────────────────────────┴──────────────────────────┘
///   ▲                          ▲
///   header                     user_ptr(header)
/// ```
#[repr(C, align(16))]
#[derive(Debug)]
pub struct BlockHeader {
  pub size: usize,
  pub is_free: bool,
  pub next: *mut BlockHeader,
}

/// Bytes occupied by a header, which is also the distance between a header
/// and the pointer handed to the caller.
pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

const _: () = {
  assert!(mem::align_of::<BlockHeader>() == MIN_ALIGN);
  assert!(HEADER_SIZE % MIN_ALIGN == 0);
};

impl BlockHeader {
  pub fn new(size: usize) -> Self {
    Self {
      size,
      is_free: false,
      next: ptr::null_mut(),
    }
  }

  /// Address of the user data behind `header`.
  ///
  /// # Safety
  ///
  /// `header` must point at a header followed by at least its recorded size.
  pub unsafe fn user_ptr(header: *mut BlockHeader) -> *mut u8 {
    unsafe { (header as *mut u8).add(HEADER_SIZE) }
  }

  /// Steps back from a pointer returned by the allocator to its header.
  ///
  /// # Safety
  ///
  /// `data` must have been produced by [`BlockHeader::user_ptr`].
  pub unsafe fn from_user_ptr(data: *mut u8) -> *mut BlockHeader {
    debug_assert!(!data.is_null());
    debug_assert!(data as usize >= HEADER_SIZE, "pointer {data:?} has no room for a header");
    debug_assert_eq!(data as usize % MIN_ALIGN, 0, "pointer {data:?} is not block aligned");

    unsafe { data.sub(HEADER_SIZE) as *mut BlockHeader }
  }
}

/// Snapshot of one block, as seen by [`FreeListAllocator::blocks`].
///
/// [`FreeListAllocator::blocks`]: crate::FreeListAllocator::blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: *const u8,
  pub data: *const u8,
  pub size: usize,
  pub is_free: bool,
}

impl BlockInfo {
  /// # Safety
  ///
  /// `header` must point at a live header.
  pub(crate) unsafe fn read(header: *mut BlockHeader) -> Self {
    unsafe {
      Self {
        header: header as *const u8,
        data: BlockHeader::user_ptr(header),
        size: (*header).size,
        is_free: (*header).is_free,
      }
    }
  }

  /// One past the last usable byte.
  pub fn end(&self) -> *const u8 {
    self.data.wrapping_add(self.size)
  }
}
