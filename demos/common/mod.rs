use clap::Parser;
use rmemsim::{
  DEFAULT_HEAP_SIZE, Heap, HeapConfig,
  channel::{self, Channels},
};

/// Switches shared by every demo.
#[derive(Debug, Parser)]
pub struct Args {
  /// Print every malloc, realloc and free with its call site.
  #[arg(long)]
  pub log_alloc: bool,

  /// Warn whenever never-written memory is read.
  #[arg(long)]
  pub log_uninit: bool,

  /// Heap budget in bytes.
  #[arg(long, default_value_t = DEFAULT_HEAP_SIZE)]
  pub heap_size: usize,
}

/// Parses the command line, installs the logger and runs `demo` against a
/// fresh heap. Whatever the demo forgot to free is reported when the heap is
/// dropped on the way out.
pub fn run(demo: impl FnOnce(&Heap) -> rmemsim::Result<()>) {
  let args = Args::parse();

  let _ = channel::init(Channels {
    alloc: args.log_alloc,
    uninit: args.log_uninit,
  });

  let heap = Heap::with_config(HeapConfig::default().with_heap_size(args.heap_size));

  if let Err(err) = demo(&heap) {
    println!("\nDemo stopped: {err}");
  }
}
