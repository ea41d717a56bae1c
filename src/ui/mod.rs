//! Terminal user interface.
//!
//! - `loop_runner`: event loop and terminal setup
//! - `input`: key handling per context
//! - `effects`: runs engine commands as background requests
//! - `events`: feeds request results back into the engine
//! - `render` and the widget modules: drawing

mod detail;
mod effects;
mod entries;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod sidebar;
mod status;

pub use loop_runner::{run, Action};
