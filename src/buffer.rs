use std::{fmt, marker::PhantomData, mem, panic::Location};

use crate::{
  element::{Element, MAX_ELEMENT_SIZE},
  error::{MemoryError, Result},
  heap::{Heap, Ptr},
};

/// An exclusively-owned, contiguous run of `capacity` elements of type `E`
/// allocated from a [`Heap`].
///
/// ```text
///   OwnedBuffer<i32> with capacity 4 (element_size = 4)
///
///   index:    0            1            2            3
///          ┌────────────┬────────────┬────────────┬────────────┐
///   bytes: │ 0a 00 00 00│ 14 00 00 00│ 00 00 00 00│ 00 00 00 00│
///          └────────────┴────────────┴────────────┴────────────┘
///   offset 0            4            8            12           16
/// ```
///
/// Where C code would compute `base + index * sizeof(E)` and dereference
/// whatever is there, every access here goes through [`read`](Self::read) or
/// [`write`](Self::write), which reject indices past the end.
///
/// The buffer is move-only. [`release`](Self::release) consumes it, so using
/// a released buffer does not compile:
///
/// ```rust,compile_fail
/// use rmemsim::{Heap, OwnedBuffer};
///
/// let heap = Heap::new();
/// let buffer = OwnedBuffer::<i32>::allocate(&heap, 4).unwrap();
/// buffer.release().unwrap();
/// buffer.read(0).unwrap();
/// ```
///
/// If the block behind the buffer is freed some other way (through
/// [`Heap::free`] on its [`ptr`](Self::ptr)), every operation on the buffer
/// fails with [`MemoryError::UseAfterRelease`] instead.
///
/// Dropping a buffer frees its block; [`leak`](Self::leak) opts out of that.
pub struct OwnedBuffer<'h, E: Element> {
  heap: &'h Heap,
  ptr: Ptr,
  capacity: usize,
  _element: PhantomData<E>,
}

impl<'h, E: Element> OwnedBuffer<'h, E> {
  /// Allocates room for `count` elements. All elements start as zero.
  #[track_caller]
  pub fn allocate(
    heap: &'h Heap,
    count: usize,
  ) -> Result<Self> {
    let ptr = heap.malloc(Self::byte_len(heap, count, Location::caller())?)?;

    Ok(Self {
      heap,
      ptr,
      capacity: count,
      _element: PhantomData,
    })
  }

  /// Allocates a buffer holding a copy of `values`.
  #[track_caller]
  pub fn from_slice(
    heap: &'h Heap,
    values: &[E],
  ) -> Result<Self> {
    let mut buffer = Self::allocate(heap, values.len())?;
    buffer.write_slice(0, values)?;
    Ok(buffer)
  }

  fn byte_len(
    heap: &Heap,
    count: usize,
    caller: &Location<'_>,
  ) -> Result<usize> {
    count.checked_mul(E::SIZE).ok_or_else(|| {
      log::info!(
        target: crate::channel::ALLOC,
        "[{}:{}] Requested {} elements of {} bytes, which overflows",
        caller.file(),
        caller.line(),
        count,
        E::SIZE
      );
      MemoryError::Allocation {
        requested: usize::MAX,
        in_use: heap.in_use(),
        heap_size: heap.heap_size(),
      }
    })
  }

  pub fn heap(&self) -> &'h Heap {
    self.heap
  }

  /// Bytes per element.
  pub fn element_size(&self) -> usize {
    E::SIZE
  }

  /// Number of elements allocated.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn is_empty(&self) -> bool {
    self.capacity == 0
  }

  /// Handle of the backing block, for printing its address.
  pub fn ptr(&self) -> Ptr {
    self.ptr
  }

  fn check_index(
    &self,
    index: usize,
  ) -> Result<()> {
    if index < self.capacity {
      Ok(())
    } else {
      Err(MemoryError::Index {
        index,
        len: self.capacity,
      })
    }
  }

  fn check_range(
    &self,
    start: usize,
    len: usize,
  ) -> Result<()> {
    match start.checked_add(len) {
      Some(end) if end <= self.capacity => Ok(()),
      _ => Err(MemoryError::Index {
        index: start.max(self.capacity),
        len: self.capacity,
      }),
    }
  }

  pub fn read(
    &self,
    index: usize,
  ) -> Result<E> {
    self.check_index(index)?;

    let mut raw = [0u8; MAX_ELEMENT_SIZE];
    let raw = &mut raw[..E::SIZE];
    self.heap.read(self.ptr, index * E::SIZE, raw)?;

    Ok(E::decode(raw))
  }

  pub fn write(
    &mut self,
    index: usize,
    value: E,
  ) -> Result<()> {
    self.check_index(index)?;

    let mut raw = [0u8; MAX_ELEMENT_SIZE];
    let raw = &mut raw[..E::SIZE];
    value.encode(raw);

    self.heap.write(self.ptr, index * E::SIZE, raw)
  }

  /// Writes `values` at indices `start..start + values.len()`.
  ///
  /// Nothing is written if any of those indices is out of bounds.
  pub fn write_slice(
    &mut self,
    start: usize,
    values: &[E],
  ) -> Result<()> {
    self.check_range(start, values.len())?;

    let mut raw = vec![0u8; values.len() * E::SIZE];
    for (value, chunk) in values.iter().zip(raw.chunks_exact_mut(E::SIZE)) {
      value.encode(chunk);
    }

    self.heap.write(self.ptr, start * E::SIZE, &raw)
  }

  /// Sets every element to `value`.
  pub fn fill(
    &mut self,
    value: E,
  ) -> Result<()> {
    self.write_slice(0, &vec![value; self.capacity])
  }

  /// Copies all elements out.
  pub fn to_vec(&self) -> Result<Vec<E>> {
    let mut raw = vec![0u8; self.capacity * E::SIZE];
    self.heap.read(self.ptr, 0, &mut raw)?;

    Ok(raw.chunks_exact(E::SIZE).map(E::decode).collect())
  }

  /// Changes the capacity to `new_count` elements.
  ///
  /// The first `min(capacity, new_count)` elements keep their values and new
  /// elements are zero. The storage moves, so any [`Ptr`] obtained from
  /// [`ptr`](Self::ptr) before the call is stale afterwards.
  ///
  /// On failure the buffer is left exactly as it was.
  #[track_caller]
  pub fn resize(
    &mut self,
    new_count: usize,
  ) -> Result<()> {
    let bytes = Self::byte_len(self.heap, new_count, Location::caller())?;

    self.ptr = self.heap.realloc(self.ptr, bytes)?;
    self.capacity = new_count;

    Ok(())
  }

  /// Frees the backing block and consumes the buffer.
  #[track_caller]
  pub fn release(self) -> Result<()> {
    let heap = self.heap;
    let ptr = self.ptr;
    mem::forget(self);

    heap.free(ptr)
  }

  /// Gives up ownership without freeing. The block stays allocated and shows
  /// up in [`Heap::leak_report`].
  pub fn leak(self) -> Ptr {
    let ptr = self.ptr;
    mem::forget(self);
    ptr
  }
}

impl<E: Element> Drop for OwnedBuffer<'_, E> {
  fn drop(&mut self) {
    let _ = self.heap.free_on_drop(self.ptr);
  }
}

impl<E: Element> fmt::Debug for OwnedBuffer<'_, E> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("OwnedBuffer")
      .field("ptr", &format_args!("{}", self.ptr))
      .field("element_size", &E::SIZE)
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}
