use thiserror::Error;

/// Reasons an allocation can fail.
///
/// Both variants mean the arena could not be extended; the block list is
/// untouched in either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The grower refused to extend the arena by `requested` bytes.
  #[error("arena exhausted: could not grow by {requested} bytes")]
  Exhausted { requested: usize },
  /// `size` plus the header does not fit in the address space.
  #[error("allocation of {size} bytes overflows the address space")]
  SizeOverflow { size: usize },
}
