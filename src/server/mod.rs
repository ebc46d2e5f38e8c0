// Server module entry point
// Binds listeners, accepts connections and bridges hyper to the handler chain

pub mod bridge;
pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::{bind, create_reusable_listener};
pub use server_loop::{start_server_loop, ServerLoopConfig};
pub use signal::{start_signal_handler, Shutdown};
