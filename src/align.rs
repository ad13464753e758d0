/// Rounds `value` up to the next multiple of an alignment.
///
/// With one argument the alignment is the machine word. With two, the second
/// argument is the alignment and must be a power of two.
///
/// The simulated program break of [`Heap`](crate::Heap) advances by
/// `align!(size)` on every allocation, so block addresses look like the ones
/// a real `malloc` hands out.
///
/// # Examples
///
/// ```rust
/// use rmemsim::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
///
/// assert_eq!(align!(17, 16), 32);
/// assert_eq!(align!(0, 16), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align!($value, ::core::mem::size_of::<usize>())
  };
  ($value:expr, $to:expr) => {
    ($value + $to - 1) & !($to - 1)
  };
}
