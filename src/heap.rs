use std::{cell::RefCell, collections::BTreeMap, fmt, panic::Location};

use log::{info, warn};

use crate::{
  align,
  block::Block,
  channel,
  config::HeapConfig,
  error::{MemoryError, Result},
  leak::{LeakReport, LeakSource},
};

/// Handle to a heap block, the simulated counterpart of a `void *`.
///
/// A `Ptr` is `Copy`, like a C pointer, so nothing stops a caller from
/// holding on to one after the block is freed. The heap catches that instead:
/// every free or move retires the handle, and any later use of it fails with
/// [`MemoryError::UseAfterRelease`].
///
/// There is no arithmetic on `Ptr`. Offsets are passed explicitly to
/// [`Heap::read`] and [`Heap::write`], which check them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptr {
  slot: usize,
  generation: u32,
  address: usize,
}

impl Ptr {
  /// The simulated address, for printing only.
  pub fn address(&self) -> usize {
    self.address
  }
}

impl fmt::Display for Ptr {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{:#x}", self.address)
  }
}

struct Slot {
  generation: u32,
  block: Option<Block>,
}

struct HeapState {
  slots: Vec<Slot>,
  vacant: Vec<usize>,
  in_use: usize,
  brk: usize,
}

impl HeapState {
  fn block(
    &self,
    ptr: Ptr,
  ) -> Result<&Block> {
    match self.slots.get(ptr.slot) {
      Some(Slot {
        generation,
        block: Some(block),
      }) if *generation == ptr.generation => Ok(block),
      _ => Err(MemoryError::UseAfterRelease { address: ptr.address }),
    }
  }

  fn block_mut(
    &mut self,
    ptr: Ptr,
  ) -> Result<&mut Block> {
    match self.slots.get_mut(ptr.slot) {
      Some(Slot {
        generation,
        block: Some(block),
      }) if *generation == ptr.generation => Ok(block),
      _ => Err(MemoryError::UseAfterRelease { address: ptr.address }),
    }
  }

  fn insert(
    &mut self,
    block: Block,
  ) -> Ptr {
    let address = block.address;

    match self.vacant.pop() {
      Some(slot) => {
        let entry = &mut self.slots[slot];
        entry.block = Some(block);
        Ptr {
          slot,
          generation: entry.generation,
          address,
        }
      }
      None => {
        self.slots.push(Slot {
          generation: 0,
          block: Some(block),
        });
        Ptr {
          slot: self.slots.len() - 1,
          generation: 0,
          address,
        }
      }
    }
  }

  /// Moves the program break past a block of `size` bytes and returns the
  /// address the block starts at. Zero-sized blocks still take a word so
  /// that no two blocks share an address.
  fn bump(
    &mut self,
    size: usize,
  ) -> usize {
    let address = self.brk;
    self.brk = self.brk.wrapping_add(align!(size.max(1)));
    address
  }
}

/// A simulated heap with a fixed byte budget.
///
/// ```text
///   base_address                                     program break
///        │                                                 │
///        ▼                                                 ▼
///   ┌────────┬──────────┬────────┬────────────────┬────────┬─────────────
///   │ blk #0 │  blk #1  │ (free) │     blk #3     │ blk #4 │  ...
///   └────────┴──────────┴────────┴────────────────┴────────┴─────────────
///
///   in_use = sum of live block sizes  ≤  heap_size
/// ```
///
/// Storage for each block comes from the C allocator (`calloc`, `realloc`,
/// `free`) and is always zero-filled. The addresses are simulated: the
/// program break starts at [`HeapConfig::base_address`] and only moves
/// forward, so a block that is freed or reallocated never gets its old
/// address back and stale handles stay easy to spot in a trace.
///
/// Allocations fail with [`MemoryError::Allocation`] once the live bytes
/// would exceed [`HeapConfig::heap_size`], which makes out-of-memory paths
/// reproducible.
///
/// The heap is single-threaded (`!Sync`); buffers borrow it, so it outlives
/// everything allocated from it. Blocks still live when the heap is dropped
/// are reported as leaks (see [`Heap::leak_report`]) and then freed.
pub struct Heap {
  config: HeapConfig,
  state: RefCell<HeapState>,
}

impl Heap {
  pub fn new() -> Self {
    Self::with_config(HeapConfig::default())
  }

  pub fn with_config(config: HeapConfig) -> Self {
    Self {
      config,
      state: RefCell::new(HeapState {
        slots: Vec::new(),
        vacant: Vec::new(),
        in_use: 0,
        brk: config.base_address,
      }),
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn heap_size(&self) -> usize {
    self.config.heap_size
  }

  /// Bytes currently allocated.
  pub fn in_use(&self) -> usize {
    self.state.borrow().in_use
  }

  /// Bytes still available under the budget.
  pub fn available(&self) -> usize {
    self.config.heap_size.saturating_sub(self.in_use())
  }

  /// Number of live blocks.
  pub fn live_blocks(&self) -> usize {
    self.state.borrow().slots.iter().filter(|slot| slot.block.is_some()).count()
  }

  /// The address the next block will get.
  pub fn program_break(&self) -> usize {
    self.state.borrow().brk
  }

  /// Size in bytes of the block behind `ptr`.
  pub fn size_of(
    &self,
    ptr: Ptr,
  ) -> Result<usize> {
    Ok(self.state.borrow().block(ptr)?.size())
  }

  fn check_budget(
    &self,
    in_use: usize,
    requested: usize,
    caller: &Location<'_>,
  ) -> Result<()> {
    match in_use.checked_add(requested) {
      Some(total) if total <= self.config.heap_size => Ok(()),
      _ => Err(self.out_of_memory(in_use, requested, caller)),
    }
  }

  fn out_of_memory(
    &self,
    in_use: usize,
    requested: usize,
    caller: &Location<'_>,
  ) -> MemoryError {
    info!(
      target: channel::ALLOC,
      "[{}:{}] Not enough memory (in use: {}, heap size: {})",
      caller.file(),
      caller.line(),
      in_use,
      self.config.heap_size
    );

    MemoryError::Allocation {
      requested,
      in_use,
      heap_size: self.config.heap_size,
    }
  }

  /// Allocates a zero-filled block of `size` bytes.
  ///
  /// The caller's source location is recorded for the `alloc` channel and
  /// the leak report.
  #[track_caller]
  pub fn malloc(
    &self,
    size: usize,
  ) -> Result<Ptr> {
    let caller = Location::caller();
    info!(
      target: channel::ALLOC,
      "[{}:{}] Requested {} bytes",
      caller.file(),
      caller.line(),
      size
    );

    let mut state = self.state.borrow_mut();
    self.check_budget(state.in_use, size, caller)?;

    let Some(block) = Block::allocate(size, state.brk, caller) else {
      return Err(self.out_of_memory(state.in_use, size, caller));
    };

    state.bump(size);
    state.in_use += size;

    Ok(state.insert(block))
  }

  /// Resizes the block behind `ptr` to `size` bytes.
  ///
  /// The first `min(old, new)` bytes are kept and any new bytes are zero.
  /// The block always moves to a fresh address: `ptr` is retired and the
  /// returned handle is the only valid one. On failure nothing changes and
  /// `ptr` stays valid.
  #[track_caller]
  pub fn realloc(
    &self,
    ptr: Ptr,
    size: usize,
  ) -> Result<Ptr> {
    let caller = Location::caller();
    let mut state = self.state.borrow_mut();
    let old_size = state.block(ptr)?.size();

    info!(
      target: channel::ALLOC,
      "[{}:{}] Reallocating block of size {} to {} bytes",
      caller.file(),
      caller.line(),
      old_size,
      size
    );

    let in_use = state.in_use - old_size;
    self.check_budget(in_use, size, caller)?;

    if !state.block_mut(ptr)?.resize(size) {
      return Err(self.out_of_memory(state.in_use, size, caller));
    }

    let address = state.bump(size);
    state.in_use = in_use + size;

    let slot = &mut state.slots[ptr.slot];
    slot.generation = slot.generation.wrapping_add(1);
    let generation = slot.generation;
    if let Some(block) = slot.block.as_mut() {
      block.address = address;
      block.allocated_at = caller;
    }

    info!(
      target: channel::ALLOC,
      "[{}:{}] Freed {} bytes",
      caller.file(),
      caller.line(),
      old_size
    );

    Ok(Ptr {
      slot: ptr.slot,
      generation,
      address,
    })
  }

  /// Frees the block behind `ptr`. Freeing twice is an error, not UB.
  #[track_caller]
  pub fn free(
    &self,
    ptr: Ptr,
  ) -> Result<()> {
    let caller = Location::caller();
    let size = self.take_block(ptr)?.size();

    info!(
      target: channel::ALLOC,
      "[{}:{}] Freed {} bytes",
      caller.file(),
      caller.line(),
      size
    );

    Ok(())
  }

  /// Frees a block whose owner went out of scope. There is no meaningful
  /// call site, so the log line points at where the block was allocated.
  pub(crate) fn free_on_drop(
    &self,
    ptr: Ptr,
  ) -> Result<()> {
    let block = self.take_block(ptr)?;

    info!(
      target: channel::ALLOC,
      "[{}:{}] Freed {} bytes on drop",
      block.allocated_at.file(),
      block.allocated_at.line(),
      block.size()
    );

    Ok(())
  }

  fn take_block(
    &self,
    ptr: Ptr,
  ) -> Result<Block> {
    let mut state = self.state.borrow_mut();
    state.block(ptr)?;

    let slot = &mut state.slots[ptr.slot];
    slot.generation = slot.generation.wrapping_add(1);
    let block = slot
      .block
      .take()
      .ok_or(MemoryError::UseAfterRelease { address: ptr.address })?;

    state.in_use -= block.size();
    state.vacant.push(ptr.slot);

    Ok(block)
  }

  /// Copies `dst.len()` bytes starting at `offset` out of the block.
  ///
  /// Bytes that were never written read as zero and are reported on the
  /// `uninit` channel.
  pub fn read(
    &self,
    ptr: Ptr,
    offset: usize,
    dst: &mut [u8],
  ) -> Result<()> {
    let state = self.state.borrow();
    let block = state.block(ptr)?;
    let end = checked_range(offset, dst.len(), block.size())?;

    if !block.is_initialized(offset, end) {
      info!(target: channel::UNINIT, "[WARNING] Reading uninitialized memory");
    }

    dst.copy_from_slice(&block.bytes()[offset..end]);
    Ok(())
  }

  /// Copies `src` into the block starting at `offset`.
  pub fn write(
    &self,
    ptr: Ptr,
    offset: usize,
    src: &[u8],
  ) -> Result<()> {
    let mut state = self.state.borrow_mut();
    let block = state.block_mut(ptr)?;
    let end = checked_range(offset, src.len(), block.size())?;

    block.bytes_mut()[offset..end].copy_from_slice(src);
    block.mark_written(offset, end);
    Ok(())
  }

  /// Live blocks grouped by the source location that allocated them.
  pub fn leak_report(&self) -> LeakReport {
    let state = self.state.borrow();
    let mut sources: BTreeMap<(&'static str, u32), (usize, usize)> = BTreeMap::new();

    for block in state.slots.iter().filter_map(|slot| slot.block.as_ref()) {
      let site = (block.allocated_at.file(), block.allocated_at.line());
      let entry = sources.entry(site).or_default();
      entry.0 += block.size();
      entry.1 += 1;
    }

    LeakReport {
      sources: sources
        .into_iter()
        .map(|((file, line), (bytes, allocations))| LeakSource {
          file,
          line,
          bytes,
          allocations,
        })
        .collect(),
    }
  }
}

/// Returns the end of `offset..offset + len` if it fits in `size` bytes.
fn checked_range(
  offset: usize,
  len: usize,
  size: usize,
) -> Result<usize> {
  match offset.checked_add(len) {
    Some(end) if end <= size => Ok(end),
    _ => Err(MemoryError::Index {
      index: offset.max(size),
      len: size,
    }),
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("heap_size", &self.config.heap_size)
      .field("in_use", &self.in_use())
      .field("live_blocks", &self.live_blocks())
      .finish_non_exhaustive()
  }
}

impl Drop for Heap {
  fn drop(&mut self) {
    let report = self.leak_report();
    if !report.is_empty() {
      warn!("{report}");
    }
  }
}

#[cfg(test)]
mod tests {
  use log::Level;

  use super::*;
  use crate::{channel::capture, config::DEFAULT_BASE_ADDRESS};

  #[test]
  fn test_malloc_write_read() {
    let heap = Heap::new();
    let ptr = heap.malloc(4).unwrap();

    assert_eq!(ptr.address(), DEFAULT_BASE_ADDRESS);
    assert_eq!(heap.in_use(), 4);

    heap.write(ptr, 0, &11u32.to_le_bytes()).unwrap();

    let mut raw = [0u8; 4];
    heap.read(ptr, 0, &mut raw).unwrap();
    assert_eq!(u32::from_le_bytes(raw), 11);

    heap.free(ptr).unwrap();
    assert_eq!(heap.in_use(), 0);
  }

  #[test]
  fn test_fresh_blocks_read_as_zero() {
    let heap = Heap::new();
    let ptr = heap.malloc(8).unwrap();

    let mut raw = [0xFFu8; 8];
    heap.read(ptr, 0, &mut raw).unwrap();
    assert_eq!(raw, [0; 8]);

    heap.free(ptr).unwrap();
  }

  #[test]
  fn test_addresses_are_word_aligned_and_increasing() {
    let heap = Heap::new();
    let first = heap.malloc(3).unwrap();
    let second = heap.malloc(1).unwrap();

    assert_eq!(second.address(), first.address() + align!(3usize));
    assert_eq!(heap.program_break(), second.address() + align!(1usize));

    heap.free(first).unwrap();
    heap.free(second).unwrap();
  }

  #[test]
  fn test_out_of_range_access_is_an_index_error() {
    let heap = Heap::new();
    let ptr = heap.malloc(4).unwrap();

    let mut raw = [0u8; 4];
    assert_eq!(
      heap.read(ptr, 1, &mut raw),
      Err(MemoryError::Index { index: 4, len: 4 })
    );
    assert_eq!(
      heap.write(ptr, 10, &[1]),
      Err(MemoryError::Index { index: 10, len: 4 })
    );
    assert_eq!(
      heap.write(ptr, usize::MAX, &[1]),
      Err(MemoryError::Index { index: usize::MAX, len: 4 })
    );

    heap.free(ptr).unwrap();
  }

  #[test]
  fn test_heap_exhaustion() {
    let heap = Heap::new();

    assert!(heap.malloc(2000).unwrap_err().is_allocation());

    let mut ints = Vec::new();
    loop {
      match heap.malloc(4) {
        Ok(ptr) => ints.push(ptr),
        Err(err) => {
          assert_eq!(
            err,
            MemoryError::Allocation {
              requested: 4,
              in_use: 1024,
              heap_size: 1024,
            }
          );
          break;
        }
      }
    }

    assert_eq!(ints.len(), 256);
    assert!(heap.malloc(1).is_err());

    heap.free(ints.pop().unwrap()).unwrap();

    let two_bytes = heap.malloc(2).unwrap();
    heap.free(two_bytes).unwrap();

    for ptr in ints {
      heap.free(ptr).unwrap();
    }
    assert_eq!(heap.in_use(), 0);
  }

  #[test]
  fn test_use_after_free_is_detected() {
    let heap = Heap::new();
    let ptr = heap.malloc(4).unwrap();
    heap.free(ptr).unwrap();

    let expected = Err(MemoryError::UseAfterRelease { address: ptr.address() });
    let mut raw = [0u8; 4];

    assert_eq!(heap.read(ptr, 0, &mut raw), expected);
    assert_eq!(heap.write(ptr, 0, &[1]), expected);
    assert_eq!(heap.size_of(ptr).map(|_| ()), expected);
    assert_eq!(heap.realloc(ptr, 8).map(|_| ()), expected);
    assert_eq!(heap.free(ptr), expected);
  }

  #[test]
  fn test_reused_slot_does_not_revive_stale_handle() {
    let heap = Heap::new();
    let stale = heap.malloc(4).unwrap();
    heap.free(stale).unwrap();

    let fresh = heap.malloc(4).unwrap();

    assert_ne!(stale, fresh);
    assert!(heap.write(stale, 0, &[1]).unwrap_err().is_use_after_release());
    heap.write(fresh, 0, &[1]).unwrap();

    heap.free(fresh).unwrap();
  }

  #[test]
  fn test_realloc_moves_and_retires_old_handle() {
    let heap = Heap::new();
    let old = heap.malloc(6).unwrap();
    heap.write(old, 0, b"hello\0").unwrap();

    let new = heap.realloc(old, 12).unwrap();

    assert_ne!(old.address(), new.address());
    assert_eq!(heap.size_of(new), Ok(12));
    assert_eq!(heap.in_use(), 12);
    assert!(heap.size_of(old).unwrap_err().is_use_after_release());

    let mut raw = [0xFFu8; 12];
    heap.read(new, 0, &mut raw).unwrap();
    assert_eq!(&raw, b"hello\0\0\0\0\0\0\0");

    heap.free(new).unwrap();
  }

  #[test]
  fn test_failed_realloc_keeps_original() {
    let heap = Heap::with_config(HeapConfig::default().with_heap_size(16));
    let ptr = heap.malloc(8).unwrap();
    heap.write(ptr, 0, &[7; 8]).unwrap();

    assert!(heap.realloc(ptr, 17).unwrap_err().is_allocation());

    assert_eq!(heap.size_of(ptr), Ok(8));
    assert_eq!(heap.in_use(), 8);
    let mut raw = [0u8; 8];
    heap.read(ptr, 0, &mut raw).unwrap();
    assert_eq!(raw, [7; 8]);

    // The old block counts as released when checking the budget.
    let grown = heap.realloc(ptr, 16).unwrap();
    assert_eq!(heap.in_use(), 16);

    heap.free(grown).unwrap();
  }

  #[test]
  fn test_leak_report_groups_by_site() {
    let heap = Heap::new();
    let mut leaked = Vec::new();
    for _ in 0..3 {
      leaked.push(heap.malloc(4).unwrap());
    }
    let single = heap.malloc(10).unwrap();

    let report = heap.leak_report();
    assert_eq!(report.sources().len(), 2);
    assert_eq!(report.total_bytes(), 22);
    assert_eq!(report.total_allocations(), 4);
    assert!(report.sources().iter().any(|s| s.bytes == 12 && s.allocations == 3));
    assert!(report.sources().iter().all(|s| s.file.ends_with("heap.rs")));

    heap.free(single).unwrap();
    for ptr in leaked {
      heap.free(ptr).unwrap();
    }
    assert!(heap.leak_report().is_empty());
  }

  #[test]
  fn test_zero_sized_blocks_get_distinct_addresses() {
    let heap = Heap::new();
    let first = heap.malloc(0).unwrap();
    let second = heap.malloc(0).unwrap();
    let third = heap.malloc(4).unwrap();

    assert_ne!(first.address(), second.address());
    assert_ne!(second.address(), third.address());
    assert_eq!(second.address(), first.address() + align!(1usize));

    heap.free(first).unwrap();
    heap.free(second).unwrap();
    heap.free(third).unwrap();
  }

  #[test]
  fn test_uninitialized_read_logs_once_per_read() {
    let heap = Heap::new();
    let ptr = heap.malloc(8).unwrap();

    let (_, logged) = capture::on_target(channel::UNINIT, || {
      let mut raw = [0u8; 8];
      heap.read(ptr, 0, &mut raw).unwrap();
      heap.read(ptr, 4, &mut raw[..4]).unwrap();
    });

    assert_eq!(logged.len(), 2);
    assert!(logged.iter().all(|record| record.level == Level::Info));
    assert_eq!(logged[0].message, "[WARNING] Reading uninitialized memory");

    heap.free(ptr).unwrap();
  }

  #[test]
  fn test_written_read_logs_nothing() {
    let heap = Heap::new();
    let ptr = heap.malloc(8).unwrap();
    heap.write(ptr, 0, &[1, 2, 3, 4]).unwrap();

    let (_, logged) = capture::on_target(channel::UNINIT, || {
      let mut raw = [0u8; 4];
      heap.read(ptr, 0, &mut raw).unwrap();
    });
    assert!(logged.is_empty());

    // A range that straddles the written prefix still counts.
    let (_, logged) = capture::on_target(channel::UNINIT, || {
      let mut raw = [0u8; 2];
      heap.read(ptr, 3, &mut raw).unwrap();
    });
    assert_eq!(logged.len(), 1);

    heap.free(ptr).unwrap();
  }

  #[test]
  fn test_drop_with_live_blocks_logs_report_once() {
    let heap = Heap::new();
    heap.malloc(4).unwrap();
    let expected = heap.leak_report().to_string();

    let (_, logged) = capture::records(|| drop(heap));
    let warnings: Vec<_> = logged.iter().filter(|record| record.level == Level::Warn).collect();

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, expected);
    assert!(expected.starts_with("======= MEMORY LEAKS FOUND!!! ======="));
  }

  #[test]
  fn test_drop_without_leaks_logs_nothing() {
    let heap = Heap::new();
    let ptr = heap.malloc(4).unwrap();
    heap.free(ptr).unwrap();

    let (_, logged) = capture::records(|| drop(heap));

    assert!(logged.is_empty());
  }
}
