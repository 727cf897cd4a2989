//! Live web viewer for a board.
//!
//! Serves the board view and a stream of change events fed by a file
//! watcher and by moves and deletes made through the API.

mod events;
mod server;
mod watcher;

pub use events::{ChangeEvent, Notifier, Subscription};
pub use server::{AppState, DEFAULT_PORT, find_available_port, router, start_server};
pub use watcher::{DEBOUNCE_MS, debounced_changes, watch_board};
