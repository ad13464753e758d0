//! Running out of heap.
//!
//! Run with `cargo run --example exhaustion -- --heap-size 1024`.

mod common;

use rmemsim::{Element, OwnedBuffer};

fn main() {
  common::run(|heap| {
    // More than the whole budget.
    match heap.malloc(2000) {
      Ok(ptr) => {
        println!("malloc({}) returned: {}", 2000, ptr);
        heap.free(ptr)?;
      }
      Err(err) => println!("malloc({}) failed: {}", 2000, err),
    }

    // One i32 at a time until the budget runs out. The blocks are packed
    // back to back, so there is no fragmentation to worry about.
    let mut ints = Vec::new();
    loop {
      match OwnedBuffer::<i32>::allocate(heap, 1) {
        Ok(int) => ints.push(int),
        Err(_) => {
          println!("malloc failed after allocating {} ints!!", ints.len());
          break;
        }
      }
    }

    match heap.malloc(1) {
      Ok(ptr) => {
        println!("malloc(1) returned: {}", ptr);
        heap.free(ptr)?;
      }
      Err(err) => println!("malloc(1) failed: {}", err),
    }

    // Freeing one int makes room for up to its size again.
    if let Some(some_int) = ints.pop() {
      println!("Freeing int32_t at {}", some_int.ptr());
      some_int.release()?;
    }

    let two_bytes = heap.malloc(2)?;
    println!(
      "malloc(2) returned: {} ({} of {} bytes left)",
      two_bytes,
      heap.available(),
      <i32 as Element>::SIZE
    );
    heap.free(two_bytes)?;

    // Leak one on purpose to see the report.
    if let Some(leaked) = ints.pop() {
      leaked.leak();
    }

    for int in ints {
      int.release()?;
    }

    Ok(())
  });
}
