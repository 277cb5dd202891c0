//! Development server with live reload for tessera sites.
//!
//! Serves the built `dist` tree, watches sources and data, re-runs only the
//! affected stages and pushes reload messages over a WebSocket.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent, WatchRoot, WatchRules};
pub use websocket::{ReloadHub, ReloadMessage};
