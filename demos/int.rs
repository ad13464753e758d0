//! A single integer on the heap.
//!
//! Run with `cargo run --example int -- --log-alloc --log-uninit`.

mod common;

use rmemsim::{Element, OwnedBuffer};

fn main() {
  common::run(|heap| {
    println!("Size of int is: {}", <i32 as Element>::SIZE);

    // Room for exactly one i32. This can fail if the heap is exhausted.
    let mut an_int = OwnedBuffer::<i32>::allocate(heap, 1)?;
    println!("Memory address of allocated memory: {}", an_int.ptr());

    // In C this would print garbage. Here the block starts zeroed, and with
    // --log-uninit you get a warning because nobody wrote it yet.
    println!("Value of uninitialized memory: {}", an_int.read(0)?);

    an_int.write(0, 11)?;
    println!("Value of memory after writing `11` to it: {}", an_int.read(0)?);

    // Dropping the buffer would free it too. `an_int.leak()` instead would
    // show up in the leak report at exit.
    an_int.release()
  });
}
