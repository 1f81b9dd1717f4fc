/// Rounds `value` up to the next multiple of [`MIN_ALIGN`](crate::MIN_ALIGN).
///
/// Every header and every pointer handed out by the allocator sits on this
/// boundary, so growth requests are padded with it.
///
/// # Examples
///
/// ```rust
/// use freelist::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(32), 32);
/// assert_eq!(align!(33), 48);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::MIN_ALIGN - 1) & !($crate::MIN_ALIGN - 1)
  };
}

/// Same as [`align!`] but returns `None` instead of wrapping around near
/// `usize::MAX`.
#[macro_export]
macro_rules! checked_align {
  ($value:expr) => {
    ($value as usize)
      .checked_add($crate::MIN_ALIGN - 1)
      .map(|padded| padded & !($crate::MIN_ALIGN - 1))
  };
}
