//! Error types for rmemsim.
//!
//! Every access the C examples leave as undefined behavior (reading past the
//! end of a block, touching a freed block, freeing twice) ends up here as a
//! catchable error instead.
use thiserror::Error;

/// Errors returned by [`Heap`](crate::Heap), [`OwnedBuffer`](crate::OwnedBuffer)
/// and [`NulString`](crate::NulString).
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum MemoryError {
  /// The heap budget or the system allocator could not satisfy a request.
  #[error("not enough memory: requested {requested} bytes (in use: {in_use}, heap size: {heap_size})")]
  Allocation {
    requested: usize,
    in_use: usize,
    heap_size: usize,
  },

  /// An index or byte range fell outside the allocated block.
  #[error("index {index} out of bounds for length {len}")]
  Index { index: usize, len: usize },

  /// The handle refers to a block that was already freed or relocated.
  #[error("use after release of block at {address:#x}")]
  UseAfterRelease { address: usize },
}

impl MemoryError {
  pub fn is_allocation(&self) -> bool {
    matches!(self, Self::Allocation { .. })
  }

  pub fn is_index(&self) -> bool {
    matches!(self, Self::Index { .. })
  }

  pub fn is_use_after_release(&self) -> bool {
    matches!(self, Self::UseAfterRelease { .. })
  }
}

pub type Result<T, E = MemoryError> = core::result::Result<T, E>;
