//! Diagnostic channels.
//!
//! The heap logs through the [`log`] facade on two targets that can be
//! switched on independently:
//!
//! - [`ALLOC`]: every `malloc`, `realloc` and `free`, with the call site.
//! - [`UNINIT`]: reads of bytes that were never written.
//!
//! Any `log` backend works. [`ChannelLogger`] is a minimal one that prints
//! the bare message to stderr for the enabled channels, plus warnings and
//! errors from any other target (leak reports, for example).
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

pub const ALLOC: &str = "alloc";
pub const UNINIT: &str = "uninit";

/// Which channels a [`ChannelLogger`] prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Channels {
  pub alloc: bool,
  pub uninit: bool,
}

pub struct ChannelLogger {
  channels: Channels,
}

impl ChannelLogger {
  pub fn new(channels: Channels) -> Self {
    Self { channels }
  }
}

impl Log for ChannelLogger {
  fn enabled(
    &self,
    metadata: &Metadata<'_>,
  ) -> bool {
    match metadata.target() {
      ALLOC => self.channels.alloc,
      UNINIT => self.channels.uninit,
      _ => metadata.level() <= Level::Warn,
    }
  }

  fn log(
    &self,
    record: &Record<'_>,
  ) {
    if self.enabled(record.metadata()) {
      eprintln!("{}", record.args());
    }
  }

  fn flush(&self) {}
}

/// Installs a [`ChannelLogger`] as the global logger.
///
/// Fails if another logger was installed first.
pub fn init(channels: Channels) -> Result<(), SetLoggerError> {
  log::set_logger(Box::leak(Box::new(ChannelLogger::new(channels))))?;
  log::set_max_level(LevelFilter::Trace);
  Ok(())
}
