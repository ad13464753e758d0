//! An array of integers in one block.
//!
//! Run with `cargo run --example int_array`.

mod common;

use rmemsim::{Element, OwnedBuffer};

const LEN: usize = 10;

fn main() {
  common::run(|heap| {
    println!("Size of int array is: {}", <i32 as Element>::SIZE * LEN);

    let mut int_array = OwnedBuffer::<i32>::allocate(heap, LEN)?;
    println!("Memory address of allocated memory: {}", int_array.ptr());

    println!("Writing 0, 10, 20, ..., 90 to each position of the array");
    for i in 0..LEN {
      int_array.write(i, i as i32 * 10)?;
    }

    println!("First element using int_array[0]: {}", int_array.read(0)?);
    println!("Third element using int_array[2]: {}", int_array.read(2)?);

    // Element `i` lives `i * element_size` bytes after the start.
    let address = int_array.ptr().address();
    let step = int_array.element_size();
    println!("Memory address of the first element: {:#x}", address);
    println!("Memory address of the third element: {:#x}", address + 2 * step);
    println!("Address of the non-existing 11th element: {:#x}", address + LEN * step);

    // In C, `int_array[10]` is undefined behavior. Here it is just an error.
    match int_array.read(LEN) {
      Ok(value) => println!("Value of 11th element: {value}"),
      Err(err) => println!("Reading the 11th element failed: {err}"),
    }

    // One block, freed as one block.
    int_array.release()
  });
}
