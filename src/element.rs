use std::{fmt, mem};

/// Largest [`Element::SIZE`] of any element type.
pub(crate) const MAX_ELEMENT_SIZE: usize = 4;

mod private {
  pub trait Sealed {}
}

/// A fixed-size element a buffer can hold.
///
/// Elements are stored little-endian, `SIZE` bytes each. The set is closed:
/// `u8` for characters, `i32` and `u32` for integers.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + private::Sealed {
  /// Bytes per element.
  const SIZE: usize;

  /// Writes `self` into `dst`, which is exactly `SIZE` bytes long.
  fn encode(
    self,
    dst: &mut [u8],
  );

  /// Reads an element back from exactly `SIZE` bytes.
  fn decode(src: &[u8]) -> Self;
}

macro_rules! impl_element {
  ($($ty:ty),* $(,)?) => {
    $(
      impl private::Sealed for $ty {}

      impl Element for $ty {
        const SIZE: usize = mem::size_of::<$ty>();

        fn encode(
          self,
          dst: &mut [u8],
        ) {
          dst.copy_from_slice(&self.to_le_bytes());
        }

        fn decode(src: &[u8]) -> Self {
          let mut raw = [0u8; mem::size_of::<$ty>()];
          raw.copy_from_slice(src);
          <$ty>::from_le_bytes(raw)
        }
      }
    )*
  };
}

impl_element!(u8, i32, u32);

const _: () = assert!(<i32 as Element>::SIZE <= MAX_ELEMENT_SIZE);
const _: () = assert!(<u32 as Element>::SIZE <= MAX_ELEMENT_SIZE);
