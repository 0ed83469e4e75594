#![doc = "Signal-driven periodic ticker for the managed runtime."]

#[cfg(not(unix))]
compile_error!("ticker-runtime requires a POSIX platform");

pub mod backend;
pub mod fatal;
pub mod signal;
pub mod tick;
pub mod ticker;

pub use backend::*;
pub use signal::{install_tick_handler, SignalId, TickCallback};
pub use tick::TickCounter;
pub use ticker::*;
