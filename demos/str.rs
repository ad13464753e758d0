//! Null-terminated strings: length by scanning, growing, offsetting and
//! shortening.
//!
//! Run with `cargo run --example str -- --log-alloc`.

mod common;

use rmemsim::{Element, NulString};

fn main() {
  common::run(|heap| {
    println!("Size of char is: {}", <u8 as Element>::SIZE);

    // "hello" needs 6 bytes: 'h' 'e' 'l' 'l' 'o' '\0'.
    let mut my_str = NulString::from_bytes(heap, b"hello")?;
    println!("Memory address of allocated memory: {}", my_str.ptr());

    // A character is just a number; 'h' is 104 in the ASCII table.
    println!("Reading first character of the string: {}", my_str.byte_at(0)? as char);

    println!("The string is: '{}'", my_str.to_string_lossy()?);

    // Nothing stores the length. It is found by walking up to the '\0'.
    println!("The len of the string is: {}", my_str.logical_length()?);

    // Growing means a bigger block. On failure `my_str` is untouched and
    // still ours to release, so there is nothing to clean up by hand.
    if let Err(err) = my_str.extend(b" world") {
      println!("System is out of memory! ({err})");
      return my_str.release();
    }
    println!("Extended string: '{}'", my_str.to_string_lossy()?);
    println!("Memory address after realloc: {}", my_str.ptr());

    // Reading from the 6th character on.
    println!(
      "String offset by 6 characters: '{}'",
      my_str.slice_from(6)?.to_string_lossy()?
    );

    // Shortening only moves the terminator; the capacity stays the same.
    my_str.truncate(2)?;
    println!(
      "Shortened string: '{}' (capacity still {})",
      my_str.to_string_lossy()?,
      my_str.capacity()
    );

    my_str.release()
  });
}
