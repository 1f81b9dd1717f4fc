use std::ptr::{self, NonNull};

use libc::{c_void, intptr_t, sbrk};
use log::{debug, warn};
use spin::Mutex;

use crate::{AllocError, MIN_ALIGN, align};

/// The arena growth primitive: extends one contiguous region upwards.
///
/// # Safety
///
/// On success `grow(n)` must return the start of `n` writable bytes that are
/// aligned to [`MIN_ALIGN`], lie above every region returned before, and stay
/// valid for as long as the grower lives. A grower never shrinks.
pub unsafe trait Grower {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, AllocError>;
}

/// Current program break, as reported by `sbrk(0)`.
pub fn program_break() -> *mut u8 {
  unsafe { sbrk(0) as *mut u8 }
}

/// Serialises every read and move of the program break made by this crate.
///
/// `sbrk` reads a cached break and then moves it, so two unsynchronised
/// callers can both be handed the same region.
static SBRK_LOCK: Mutex<()> = Mutex::new(());

/// Grows the process data segment with `sbrk(2)`.
///
/// All `SbrkGrower`s share one process-wide lock, so any number of them may grow
/// concurrently and still receive disjoint regions. Code outside this crate
/// that moves the break (the libc `malloc` included) does not take the lock;
/// such a move between the two `sbrk` calls is detected and patched up once.
#[derive(Debug, Default, Clone, Copy)]
pub struct SbrkGrower;

impl SbrkGrower {
  pub const fn new() -> Self {
    Self
  }
}

unsafe impl Grower for SbrkGrower {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let exhausted = AllocError::Exhausted { requested: increment };

    let _guard = SBRK_LOCK.lock();

    let top = program_break() as usize;
    if top == usize::MAX {
      return Err(exhausted);
    }

    // The initial break is not necessarily aligned.
    let padding = align!(top) - top;
    let total = increment.checked_add(padding).ok_or(exhausted)?;
    if total > intptr_t::MAX as usize {
      return Err(exhausted);
    }

    let previous = unsafe { sbrk(total as intptr_t) };
    if previous as usize == usize::MAX {
      warn!("sbrk refused to grow the break by {} bytes", total);
      return Err(exhausted);
    }

    let previous = previous as *mut u8;
    let data = unsafe { previous.add(align!(previous as usize) - previous as usize) };
    let end = previous as usize + total;
    let needed = data as usize + increment;

    if needed > end {
      // Something outside the lock moved the break after `sbrk(0)`, so the
      // padding was computed for the wrong address. Extend the fresh region
      // by the shortfall if it is still the top of the segment.
      let shortfall = needed - end;
      let extension = unsafe { sbrk(shortfall as intptr_t) };

      if extension as usize != end {
        // The break is never shrunk, so both requests stay mapped but unused.
        warn!("program break moved underneath the allocator, {} bytes abandoned", total);
        return Err(exhausted);
      }

      debug!("extended misaligned region by {} bytes", shortfall);
    }

    debug!("grew program break by {} bytes, region starts at {:?}", total, data);
    NonNull::new(data).ok_or(exhausted)
  }
}

/// A fixed-capacity region reserved up front with `mmap(2)` and handed out
/// monotonically, like a private program break.
///
/// Independent allocators each get their own region, and the whole region is
/// unmapped when the grower is dropped.
#[derive(Debug)]
pub struct RegionGrower {
  base: NonNull<u8>,
  capacity: usize,
  top: usize,
}

impl RegionGrower {
  /// Reserves `capacity` bytes (rounded up to [`MIN_ALIGN`]).
  pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
    let exhausted = AllocError::Exhausted { requested: capacity };
    let capacity = crate::checked_align!(capacity).ok_or(exhausted)?.max(MIN_ALIGN);

    let address = unsafe {
      libc::mmap(
        ptr::null_mut(),
        capacity,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
        -1,
        0,
      )
    };

    if address == libc::MAP_FAILED {
      warn!("mmap could not reserve a region of {} bytes", capacity);
      return Err(exhausted);
    }

    debug!("reserved region of {} bytes at {:?}", capacity, address);

    Ok(Self {
      base: NonNull::new(address as *mut u8).ok_or(exhausted)?,
      capacity,
      top: 0,
    })
  }

  pub fn base(&self) -> *const u8 {
    self.base.as_ptr()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.top
  }
}

unsafe impl Grower for RegionGrower {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let exhausted = AllocError::Exhausted { requested: increment };

    let new_top = self.top.checked_add(increment).ok_or(exhausted)?;
    if new_top > self.capacity {
      warn!(
        "region exhausted: {} of {} bytes used, {} requested",
        self.top, self.capacity, increment
      );
      return Err(exhausted);
    }

    let data = unsafe { self.base.add(self.top) };
    self.top = new_top;

    Ok(data)
  }
}

impl Drop for RegionGrower {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.base.as_ptr() as *mut c_void, self.capacity);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Barrier, thread};

  use super::*;

  #[test]
  fn test_sbrk_grows_aligned_writable_memory() {
    let mut grower = SbrkGrower::new();
    let data = grower.grow(48).unwrap();

    assert_eq!(data.as_ptr() as usize % MIN_ALIGN, 0);
    assert!(program_break() as usize >= data.as_ptr() as usize + 48);

    unsafe {
      ptr::write_bytes(data.as_ptr(), 0x11, 48);
      assert_eq!(*data.as_ptr().add(47), 0x11);
    }
  }

  #[test]
  fn test_concurrent_sbrk_growers_get_disjoint_regions() {
    const ROUNDS: usize = 500;
    const SIZE: usize = 64;

    let barrier = Barrier::new(2);

    let (left, right) = thread::scope(|scope| {
      let grow_all = || {
        let mut grower = SbrkGrower::new();
        let mut regions = Vec::with_capacity(ROUNDS);
        for _ in 0..ROUNDS {
          barrier.wait();
          regions.push(grower.grow(SIZE).unwrap().as_ptr() as usize);
        }
        regions
      };

      let left = scope.spawn(grow_all);
      let right = scope.spawn(grow_all);
      (left.join().unwrap(), right.join().unwrap())
    });

    let mut regions: Vec<usize> = left.into_iter().chain(right).collect();
    regions.sort_unstable();

    for pair in regions.windows(2) {
      assert!(
        pair[1] - pair[0] >= SIZE,
        "regions at {:#x} and {:#x} overlap",
        pair[0],
        pair[1]
      );
    }
  }

  #[test]
  fn test_sbrk_refuses_absurd_growth() {
    let mut grower = SbrkGrower::new();
    assert_eq!(
      grower.grow(usize::MAX),
      Err(AllocError::Exhausted { requested: usize::MAX })
    );
  }

  #[test]
  fn test_region_grows_contiguously() {
    let mut region = RegionGrower::with_capacity(4096).unwrap();

    let first = region.grow(64).unwrap();
    let second = region.grow(32).unwrap();

    assert_eq!(first.as_ptr() as *const u8, region.base());
    assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 64);
    assert_eq!(region.used(), 96);
  }

  #[test]
  fn test_region_exhaustion_leaves_top_alone() {
    let mut region = RegionGrower::with_capacity(128).unwrap();

    region.grow(100).unwrap();
    assert_eq!(region.grow(64), Err(AllocError::Exhausted { requested: 64 }));
    assert_eq!(region.grow(usize::MAX), Err(AllocError::Exhausted { requested: usize::MAX }));
    assert_eq!(region.used(), 100);

    assert!(region.grow(28).is_ok());
  }

  #[test]
  fn test_region_capacity_is_aligned() {
    let region = RegionGrower::with_capacity(100).unwrap();
    assert_eq!(region.capacity(), 112);
    assert_eq!(region.base() as usize % MIN_ALIGN, 0);
  }

  #[test]
  fn test_region_memory_is_writable() {
    let mut region = RegionGrower::with_capacity(256).unwrap();
    let data = region.grow(256).unwrap();

    unsafe {
      ptr::write_bytes(data.as_ptr(), 0xAB, 256);
      assert_eq!(*data.as_ptr().add(255), 0xAB);
    }
  }
}
