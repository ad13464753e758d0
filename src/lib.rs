//! # rmemsim - Manual Memory Management, Checked
//!
//! This crate is a small memory-model teaching library. It shows what C code
//! does with `malloc`, `realloc`, `free`, pointer arithmetic and
//! null-terminated strings, but turns every case C leaves undefined into an
//! error you can match on.
//!
//! ## Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         Heap (budget: 1024 bytes)                    │
//!   │                                                                      │
//!   │   ┌──────────┬────────────────────┬────────┬───────────────────────┐ │
//!   │   │ i32 x 4  │  "hello world\0"   │ (free) │       available       │ │
//!   │   └──────────┴────────────────────┴────────┴───────────────────────┘ │
//!   │        ▲               ▲                   ▲                         │
//!   │        │               │                   │                         │
//!   │  OwnedBuffer<i32>   NulString        program break                   │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`Heap`] is a simulated memory manager. It has a fixed byte budget,
//!   hands out realistic-looking addresses, remembers who allocated each
//!   block and reports leaks.
//! - [`OwnedBuffer`] is an exclusively-owned run of fixed-size elements
//!   (`u8`, `i32` or `u32`) in one heap block, with bounds-checked access.
//! - [`NulString`] is a byte string that ends at its first `0`, built on
//!   `OwnedBuffer<u8>`.
//!
//! ## Crate Structure
//!
//! ```text
//!   rmemsim
//!   ├── align      - Alignment macro (align!)
//!   ├── block      - Block storage and metadata (internal)
//!   ├── buffer     - OwnedBuffer
//!   ├── channel    - `alloc` / `uninit` log channels
//!   ├── config     - HeapConfig
//!   ├── element    - Element types and their byte encoding
//!   ├── error      - MemoryError
//!   ├── heap       - Heap and Ptr
//!   ├── leak       - LeakReport
//!   └── string     - NulString and StrSlice
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rmemsim::{Heap, MemoryError, NulString, OwnedBuffer};
//!
//! let heap = Heap::new();
//!
//! let mut ints = OwnedBuffer::<i32>::allocate(&heap, 10)?;
//! for i in 0..10 {
//!     ints.write(i, i as i32 * 10)?;
//! }
//! assert_eq!(ints.read(2)?, 20);
//!
//! // C would happily read whatever sits after the array.
//! assert_eq!(ints.read(10), Err(MemoryError::Index { index: 10, len: 10 }));
//!
//! let mut s = NulString::from_bytes(&heap, b"hello")?;
//! s.extend(b" world")?;
//! assert_eq!(s.logical_length()?, 11);
//!
//! ints.release()?;
//! s.release()?;
//! # Ok::<(), MemoryError>(())
//! ```
//!
//! ## Errors
//!
//! | C behavior                         | here                                 |
//! |------------------------------------|--------------------------------------|
//! | `malloc` returns `NULL`            | [`MemoryError::Allocation`]          |
//! | reading/writing past the end       | [`MemoryError::Index`]               |
//! | using or freeing a freed block     | [`MemoryError::UseAfterRelease`]     |
//! | reading uninitialized memory       | zeroes, plus a warning on `uninit`   |
//!
//! ## Limitations
//!
//! - **Single-threaded only**: the heap is `!Sync`
//! - **Fixed element types**: `u8`, `i32` and `u32`
//! - **ASCII strings**: no multi-byte character handling

pub mod align;
mod block;
mod buffer;
pub mod channel;
mod config;
mod element;
mod error;
mod heap;
mod leak;
mod string;

pub use buffer::OwnedBuffer;
pub use config::{DEFAULT_BASE_ADDRESS, DEFAULT_HEAP_SIZE, HeapConfig};
pub use element::Element;
pub use error::{MemoryError, Result};
pub use heap::{Heap, Ptr};
pub use leak::{LeakReport, LeakSource};
pub use string::{NUL, NulString, StrSlice};
