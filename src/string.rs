use std::fmt;

use crate::{
  buffer::OwnedBuffer,
  error::{MemoryError, Result},
  heap::{Heap, Ptr},
};

/// The terminator byte.
pub const NUL: u8 = 0;

/// A byte string that ends at its first `0`, backed by an
/// [`OwnedBuffer<u8>`].
///
/// ```text
///   "hello" in a 6-byte buffer:
///
///   ┌─────┬─────┬─────┬─────┬─────┬─────┐
///   │ 'h' │ 'e' │ 'l' │ 'l' │ 'o' │ \0  │   logical length 5, capacity 6
///   └─────┴─────┴─────┴─────┴─────┴─────┘
///
///   after truncate(2):
///
///   ┌─────┬─────┬─────┬─────┬─────┬─────┐
///   │ 'h' │ 'e' │ \0  │ 'l' │ 'o' │ \0  │   logical length 2, capacity 6
///   └─────┴─────┴─────┴─────┴─────┴─────┘
/// ```
///
/// There is always at least one terminator within the capacity. The length
/// is not stored anywhere: [`logical_length`](Self::logical_length) finds it
/// by scanning from the start, one byte at a time.
pub struct NulString<'h> {
  buffer: OwnedBuffer<'h, u8>,
}

impl<'h> NulString<'h> {
  /// Copies `bytes` into a fresh buffer, adding a terminator if `bytes` does
  /// not contain one.
  #[track_caller]
  pub fn from_bytes(
    heap: &'h Heap,
    bytes: &[u8],
  ) -> Result<Self> {
    let terminated = bytes.contains(&NUL);
    let capacity = if terminated { bytes.len() } else { bytes.len() + 1 };

    let mut buffer = OwnedBuffer::allocate(heap, capacity)?;
    buffer.write_slice(0, bytes)?;
    if !terminated {
      buffer.write(bytes.len(), NUL)?;
    }

    Ok(Self { buffer })
  }

  pub fn capacity(&self) -> usize {
    self.buffer.capacity()
  }

  pub fn ptr(&self) -> Ptr {
    self.buffer.ptr()
  }

  pub fn as_buffer(&self) -> &OwnedBuffer<'h, u8> {
    &self.buffer
  }

  pub fn byte_at(
    &self,
    index: usize,
  ) -> Result<u8> {
    self.buffer.read(index)
  }

  /// Number of bytes before the first terminator.
  pub fn logical_length(&self) -> Result<usize> {
    scan_length(&self.buffer, 0)
  }

  /// Shortens the string to `new_length` bytes by writing a terminator
  /// there. The capacity stays the same.
  pub fn truncate(
    &mut self,
    new_length: usize,
  ) -> Result<()> {
    if new_length >= self.capacity() {
      return Err(MemoryError::Index {
        index: new_length,
        len: self.capacity(),
      });
    }

    self.buffer.write(new_length, NUL)
  }

  /// Appends `additional` after the current logical content.
  ///
  /// The backing buffer is resized to exactly fit the result plus its
  /// terminator, which may also shrink it after a [`truncate`](Self::truncate).
  #[track_caller]
  pub fn extend(
    &mut self,
    additional: &[u8],
  ) -> Result<()> {
    let length = self.logical_length()?;
    let heap = self.buffer.heap();
    let capacity = length
      .checked_add(additional.len())
      .and_then(|len| len.checked_add(1))
      .ok_or_else(|| MemoryError::Allocation {
        requested: usize::MAX,
        in_use: heap.in_use(),
        heap_size: heap.heap_size(),
      })?;

    self.buffer.resize(capacity)?;
    self.buffer.write_slice(length, additional)?;
    self.buffer.write(capacity - 1, NUL)
  }

  /// A read-only view of the string starting `offset` bytes in.
  ///
  /// The view borrows the string, so it cannot outlive it or observe a
  /// resize. It has no terminator of its own: it ends wherever the next
  /// `0` after `offset` is, even past the string's logical end.
  pub fn slice_from(
    &self,
    offset: usize,
  ) -> Result<StrSlice<'_, 'h>> {
    if offset >= self.capacity() {
      return Err(MemoryError::Index {
        index: offset,
        len: self.capacity(),
      });
    }

    Ok(StrSlice { string: self, offset })
  }

  /// The bytes before the terminator.
  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    logical_bytes(&self.buffer, 0)
  }

  pub fn to_string_lossy(&self) -> Result<String> {
    Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
  }

  #[track_caller]
  pub fn release(self) -> Result<()> {
    self.buffer.release()
  }

  pub fn leak(self) -> Ptr {
    self.buffer.leak()
  }
}

impl fmt::Debug for NulString<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("NulString")
      .field("buffer", &self.buffer)
      .field("contents", &self.to_string_lossy())
      .finish()
  }
}

/// Borrowed view into a [`NulString`] from some offset onward.
#[derive(Clone, Copy)]
pub struct StrSlice<'a, 'h> {
  string: &'a NulString<'h>,
  offset: usize,
}

impl StrSlice<'_, '_> {
  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn logical_length(&self) -> Result<usize> {
    scan_length(&self.string.buffer, self.offset)
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    logical_bytes(&self.string.buffer, self.offset)
  }

  pub fn to_string_lossy(&self) -> Result<String> {
    Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
  }
}

impl fmt::Debug for StrSlice<'_, '_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("StrSlice")
      .field("offset", &self.offset)
      .field("contents", &self.to_string_lossy())
      .finish()
  }
}

// Stops at the end of the buffer if the terminator was overwritten behind
// the string's back (through `Heap::write`).
fn scan_length(
  buffer: &OwnedBuffer<'_, u8>,
  start: usize,
) -> Result<usize> {
  let mut index = start;
  while index < buffer.capacity() && buffer.read(index)? != NUL {
    index += 1;
  }

  Ok(index - start)
}

fn logical_bytes(
  buffer: &OwnedBuffer<'_, u8>,
  start: usize,
) -> Result<Vec<u8>> {
  let length = scan_length(buffer, start)?;
  (start..start + length).map(|index| buffer.read(index)).collect()
}
