use std::fmt;

/// Bytes still allocated from one source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakSource {
  pub file: &'static str,
  pub line: u32,
  pub bytes: usize,
  pub allocations: usize,
}

/// Summary of the blocks still live on a [`Heap`](crate::Heap), grouped by
/// the location that allocated them.
///
/// Renders the same banner the C teaching examples print at exit:
///
/// ```text
/// ======= MEMORY LEAKS FOUND!!! =======
/// 8 bytes lost in 2 allocations at demos/int.rs:21
/// =====================================
/// Total lost: 8 bytes in 2 allocations
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
  pub(crate) sources: Vec<LeakSource>,
}

impl LeakReport {
  pub fn sources(&self) -> &[LeakSource] {
    &self.sources
  }

  pub fn is_empty(&self) -> bool {
    self.sources.is_empty()
  }

  pub fn total_bytes(&self) -> usize {
    self.sources.iter().map(|source| source.bytes).sum()
  }

  pub fn total_allocations(&self) -> usize {
    self.sources.iter().map(|source| source.allocations).sum()
  }
}

impl fmt::Display for LeakReport {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    if self.is_empty() {
      return Ok(());
    }

    writeln!(f, "======= MEMORY LEAKS FOUND!!! =======")?;
    for source in &self.sources {
      writeln!(
        f,
        "{} bytes lost in {} allocations at {}:{}",
        source.bytes, source.allocations, source.file, source.line
      )?;
    }
    writeln!(f, "=====================================")?;
    write!(
      f,
      "Total lost: {} bytes in {} allocations",
      self.total_bytes(),
      self.total_allocations()
    )
  }
}
