use std::{panic::Location, ptr::NonNull, slice};

use libc::{c_void, calloc, free, realloc};

/// A single heap block: real storage from the C allocator plus the metadata
/// the simulated heap keeps about it.
///
/// ```text
///   ┌───────────────────────────┬──────────────────────────────────────┐
///   │   Block metadata          │   Storage (calloc'd, `size` bytes)   │
///   │  ┌─────────────────────┐  │                                      │
///   │  │ size: N             │  │  ┌────┬────┬────┬─── ─ ─ ─┬────┐    │
///   │  │ address: 0x55d9...  │  │  │ 00 │ 00 │ 00 │         │ 00 │    │
///   │  │ allocated_at: f:l   │  │  └────┴────┴────┴─── ─ ─ ─┴────┘    │
///   │  │ written: [bool; N]  │  │                                      │
///   │  └─────────────────────┘  │                                      │
///   └───────────────────────────┴──────────────────────────────────────┘
/// ```
///
/// Zero-sized blocks never touch the C allocator.
pub struct Block {
  data: NonNull<u8>,
  size: usize,
  pub address: usize,
  pub allocated_at: &'static Location<'static>,
  written: Vec<bool>,
}

impl Block {
  /// Allocates `size` zeroed bytes. Returns `None` if the C allocator fails.
  pub fn allocate(
    size: usize,
    address: usize,
    allocated_at: &'static Location<'static>,
  ) -> Option<Self> {
    let data = if size == 0 {
      NonNull::dangling()
    } else {
      NonNull::new(unsafe { calloc(size, 1) } as *mut u8)?
    };

    Some(Self {
      data,
      size,
      address,
      allocated_at,
      written: vec![false; size],
    })
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// Changes the block size in place, zeroing any new tail bytes.
  ///
  /// Returns `false` and leaves the block untouched when the C allocator
  /// cannot satisfy the request.
  pub fn resize(
    &mut self,
    new_size: usize,
  ) -> bool {
    if new_size == self.size {
      return true;
    }

    let data = match (self.size, new_size) {
      (_, 0) => {
        unsafe { free(self.data.as_ptr() as *mut c_void) };
        NonNull::dangling()
      }
      (0, _) => match NonNull::new(unsafe { calloc(new_size, 1) } as *mut u8) {
        Some(data) => data,
        None => return false,
      },
      _ => {
        let raw = unsafe { realloc(self.data.as_ptr() as *mut c_void, new_size) } as *mut u8;
        let Some(data) = NonNull::new(raw) else {
          return false;
        };

        if new_size > self.size {
          unsafe { data.as_ptr().add(self.size).write_bytes(0, new_size - self.size) };
        }

        data
      }
    };

    self.data = data;
    self.size = new_size;
    self.written.resize(new_size, false);

    true
  }

  pub fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.data.as_ptr(), self.size) }
  }

  pub fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.size) }
  }

  pub fn mark_written(
    &mut self,
    start: usize,
    end: usize,
  ) {
    self.written[start..end].fill(true);
  }

  pub fn is_initialized(
    &self,
    start: usize,
    end: usize,
  ) -> bool {
    self.written[start..end].iter().all(|written| *written)
  }
}

impl Drop for Block {
  fn drop(&mut self) {
    if self.size != 0 {
      unsafe { free(self.data.as_ptr() as *mut c_void) };
    }
  }
}
