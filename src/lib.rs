//! `readr`: terminal client for a Readr feed reader server.
//!
//! The [`sync`] module is the IO-free core that keeps the entry list, unread
//! counters and navigation consistent. [`api`] talks to the server, and
//! [`app`] with [`ui`] drive the terminal.

pub mod api;
pub mod app;
pub mod config;
pub mod keybindings;
pub mod sync;
pub mod ui;
pub mod util;
