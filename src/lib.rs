//! # freelist - A First-Fit Free List Allocator
//!
//! This crate provides a small **free list allocator** that manages a single
//! growable arena, by default the process data segment grown with `sbrk(2)`.
//!
//! ## Overview
//!
//! Every block the allocator creates is preceded by a header, and the headers
//! are chained into a singly linked list in the order the blocks were created:
//!
//! ```text
//!   Arena:
//!
//!   ┌────────┬──────────┬────────┬──────────┬────────┬──────────┬──────────┐
//!   │ Header │  32 B    │ Header │  64 B    │ Header │  32 B    │  unused  │
//!   │ used   │          │ free   │          │ used   │          │          │
//!   └───┬────┴──────────┴───▲─┬──┴──────────┴───▲────┴──────────┴──────────┘
//!       │                   │ │                 │                          ▲
//!       └──── next ─────────┘ └──── next ───────┘                     arena top
//!      head                                     tail
//! ```
//!
//! - `allocate(size)` walks the list from the head and reuses the **first**
//!   free block whose size is at least `size`. If none fits, the arena grows
//!   by `size + HEADER_SIZE` bytes and a new block is appended at the tail.
//! - `release(ptr)` steps one header back from `ptr` and marks the block free.
//!
//! ## Crate Structure
//!
//! ```text
//!   freelist
//!   ├── align      - Alignment macros (align!, checked_align!)
//!   ├── block      - In-place block header and its offset helpers
//!   ├── error      - AllocError
//!   ├── free_list  - FreeListAllocator implementation
//!   ├── grower     - Arena growth primitives (sbrk, mmap region)
//!   ├── list       - BlockTracker trait and the intrusive BlockList
//!   └── locked     - Spin lock wrapper and GlobalAlloc support
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use freelist::{FreeListAllocator, RegionGrower};
//!
//! let grower = RegionGrower::with_capacity(64 * 1024).unwrap();
//! let mut allocator = FreeListAllocator::with_grower(grower);
//!
//! let first = allocator.allocate(32);
//! assert!(!first.is_null());
//!
//! unsafe { allocator.release(first) };
//!
//! // The freed block is handed out again, whole.
//! let second = allocator.allocate(8);
//! assert_eq!(first, second);
//! assert_eq!(unsafe { allocator.capacity(second) }, 32);
//! ```
//!
//! ## Behaviour Worth Knowing
//!
//! - **No splitting**: a large free block satisfies a small request and keeps
//!   its original size.
//! - **No coalescing**: two adjacent free blocks are never merged, so a request
//!   larger than each of them grows the arena.
//! - **No shrinking**: memory is never given back to the grower.
//! - **Fixed alignment**: every pointer is aligned to [`MIN_ALIGN`] bytes.
//! - **Single-threaded**: [`FreeListAllocator`] takes `&mut self`; use
//!   [`Locked`] for shared or global use.
//!
//! ## Safety
//!
//! Releasing a pointer that did not come from the same allocator, or
//! releasing it twice, is undefined behaviour. Debug builds assert against
//! both; release builds trust the caller.

pub mod align;
mod block;
mod error;
mod free_list;
mod grower;
mod list;
mod locked;

/// Alignment of every header and every pointer returned by the allocator.
pub const MIN_ALIGN: usize = 16;

pub use block::{BlockHeader, BlockInfo, HEADER_SIZE};
pub use error::AllocError;
pub use free_list::FreeListAllocator;
pub use grower::{Grower, RegionGrower, SbrkGrower, program_break};
pub use list::{BlockList, BlockTracker, Blocks};
pub use locked::Locked;
