use std::ptr::{self, NonNull};

use log::{debug, trace};

use crate::{
  AllocError,
  block::{BlockHeader, BlockInfo, HEADER_SIZE},
  checked_align,
  grower::{Grower, SbrkGrower},
  list::{BlockList, BlockTracker, Blocks},
};

/// First-fit allocator that remembers every block it ever created.
///
/// Freed blocks are reused whole: they are never split, merged with their
/// neighbours, or returned to the grower. A block keeps the size it was
/// created with for the lifetime of the allocator.
///
/// The allocator is single threaded; wrap it in [`Locked`](crate::Locked)
/// to share it.
pub struct FreeListAllocator<G: Grower, T: BlockTracker = BlockList> {
  grower: G,
  blocks: T,
}

impl FreeListAllocator<SbrkGrower> {
  /// An allocator growing the real program break.
  pub const fn new() -> Self {
    Self {
      grower: SbrkGrower::new(),
      blocks: BlockList::new(),
    }
  }
}

impl Default for FreeListAllocator<SbrkGrower> {
  fn default() -> Self {
    Self::new()
  }
}

impl<G: Grower> FreeListAllocator<G> {
  pub fn with_grower(grower: G) -> Self {
    Self::with_tracker(grower, BlockList::new())
  }
}

impl<G: Grower, T: BlockTracker> FreeListAllocator<G, T> {
  pub fn with_tracker(
    grower: G,
    blocks: T,
  ) -> Self {
    Self { grower, blocks }
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  /// Returns at least `size` writable bytes, preferring the first free block
  /// that is large enough over growing the arena.
  ///
  /// A zero sized request still yields a distinct block.
  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let free_block = self.blocks.find_free(size);

    if !free_block.is_null() {
      unsafe {
        (*free_block).is_free = false;
        trace!("reusing {:?} ({} bytes) for {} bytes", free_block, (*free_block).size, size);
        return Ok(NonNull::new_unchecked(BlockHeader::user_ptr(free_block)));
      }
    }

    let increment = size
      .checked_add(HEADER_SIZE)
      .and_then(|total| checked_align!(total))
      .ok_or(AllocError::SizeOverflow { size })?;

    let region = self.grower.grow(increment)?;
    let block = region.as_ptr() as *mut BlockHeader;

    unsafe {
      block.write(BlockHeader::new(size));
      self.blocks.append(block);

      debug!("created block {:?} for {} bytes (grew by {})", block, size, increment);
      Ok(NonNull::new_unchecked(BlockHeader::user_ptr(block)))
    }
  }

  /// Like [`try_allocate`](Self::try_allocate) but returns null on failure.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> *mut u8 {
    match self.try_allocate(size) {
      Ok(address) => address.as_ptr(),
      Err(error) => {
        debug!("allocation of {} bytes failed: {}", size, error);
        ptr::null_mut()
      }
    }
  }

  /// Marks the block behind `address` as free. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer returned by this allocator that has
  /// not been released since.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe {
      let block = BlockHeader::from_user_ptr(address);
      debug_assert!(self.owns(block), "{address:?} was not handed out by this allocator");
      debug_assert!(!(*block).is_free, "double release of {address:?}");

      (*block).is_free = true;
      trace!("released {:?} ({} bytes)", block, (*block).size);
    }
  }

  /// Usable size recorded for the block behind `address`.
  ///
  /// # Safety
  ///
  /// `address` must be a non-null pointer returned by this allocator.
  pub unsafe fn capacity(
    &self,
    address: *const u8,
  ) -> usize {
    unsafe { (*BlockHeader::from_user_ptr(address as *mut u8)).size }
  }

  /// Every block in allocation order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks::new(&self.blocks)
  }

  pub fn block_count(&self) -> usize {
    self.blocks().count()
  }

  fn owns(
    &self,
    block: *mut BlockHeader,
  ) -> bool {
    self.blocks().any(|info| info.header == block as *const u8)
  }
}

impl<G: Grower, T: BlockTracker> std::fmt::Debug for FreeListAllocator<G, T> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.debug_list()
      .entries(self.blocks().map(|block: BlockInfo| (block.data, block.size, block.is_free)))
      .finish()
  }
}
