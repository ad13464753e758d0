/// Default heap budget, in bytes.
pub const DEFAULT_HEAP_SIZE: usize = 1024;

/// Default first simulated address. Any value works; this one just looks
/// like a typical x86_64 Linux heap address when printed.
pub const DEFAULT_BASE_ADDRESS: usize = 0x0000_55D9_0000_0000;

/// Settings for a [`Heap`](crate::Heap).
///
/// ```rust
/// use rmemsim::{Heap, HeapConfig};
///
/// let heap = Heap::with_config(HeapConfig::default().with_heap_size(64));
/// assert_eq!(heap.heap_size(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Maximum number of bytes live at once. An allocation that would push
  /// the total past this value fails.
  pub heap_size: usize,
  /// Address of the first block. The simulated program break starts here.
  pub base_address: usize,
}

impl HeapConfig {
  pub fn with_heap_size(
    mut self,
    heap_size: usize,
  ) -> Self {
    self.heap_size = heap_size;
    self
  }

  pub fn with_base_address(
    mut self,
    base_address: usize,
  ) -> Self {
    self.base_address = base_address;
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      heap_size: DEFAULT_HEAP_SIZE,
      base_address: DEFAULT_BASE_ADDRESS,
    }
  }
}
