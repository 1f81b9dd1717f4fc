use std::ptr;

use log::trace;

use crate::block::{BlockHeader, BlockInfo};

/// Bookkeeping strategy for blocks living in the arena.
///
/// The allocator only ever asks a tracker for a reusable block or hands it a
/// freshly grown one; flipping the free flag stays with the allocator.
///
/// # Safety
///
/// Implementors must only return headers previously passed to
/// [`BlockTracker::append`], and must keep every appended header reachable
/// from [`BlockTracker::head`].
pub unsafe trait BlockTracker {
  /// First block in allocation order that is free and can hold `size` bytes.
  fn find_free(
    &self,
    size: usize,
  ) -> *mut BlockHeader;

  /// Registers a block created by growing the arena.
  ///
  /// # Safety
  ///
  /// `block` must point at an initialised header that is not tracked yet and
  /// that lies above every tracked block.
  unsafe fn append(
    &mut self,
    block: *mut BlockHeader,
  );

  /// First block ever appended, or null.
  fn head(&self) -> *mut BlockHeader;
}

/// Intrusive singly linked list threaded through the headers themselves.
///
/// Nodes are never unlinked, so the list is also the full history of every
/// block the allocator created, in address order.
pub struct BlockList {
  head: *mut BlockHeader,
  tail: *mut BlockHeader,
}

impl BlockList {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
    }
  }

  pub fn tail(&self) -> *mut BlockHeader {
    self.tail
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }
}

impl Default for BlockList {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl BlockTracker for BlockList {
  fn find_free(
    &self,
    size: usize,
  ) -> *mut BlockHeader {
    unsafe {
      let mut current: *mut BlockHeader = self.head;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= size {
          trace!("first fit for {} bytes: {:?} ({} bytes)", size, current, (*current).size);
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  unsafe fn append(
    &mut self,
    block: *mut BlockHeader,
  ) {
    unsafe {
      debug_assert!((*block).next.is_null());
      debug_assert!(self.tail.is_null() || (self.tail as usize) < (block as usize));

      if self.tail.is_null() {
        self.head = block;
        self.tail = block;
      } else {
        (*self.tail).next = block;
        self.tail = block;
      }
    }
  }

  fn head(&self) -> *mut BlockHeader {
    self.head
  }
}

/// Walks a tracker's blocks from the head, following `next` links.
pub struct Blocks<'a> {
  current: *mut BlockHeader,
  _list: std::marker::PhantomData<&'a ()>,
}

impl<'a> Blocks<'a> {
  pub(crate) fn new<T: BlockTracker>(tracker: &'a T) -> Self {
    Self {
      current: tracker.head(),
      _list: std::marker::PhantomData,
    }
  }
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    unsafe {
      let info = BlockInfo::read(self.current);
      self.current = (*self.current).next;
      Some(info)
    }
  }
}
