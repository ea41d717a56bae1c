//! Small helpers shared by the terminal UI.
//!
//! - **Text**: width-aware truncation, control-character stripping and
//!   HTML-to-text conversion for entry content
//! - **Links**: checks applied before handing an entry link to the browser
//!
//! ```
//! use readr::util::{strip_control_chars, truncate_to_width};
//!
//! assert_eq!(truncate_to_width("A rather long title", 10), "A rathe...");
//! assert_eq!(strip_control_chars("bell\x07"), "bell");
//! ```

mod link;
mod text;

pub use link::{validate_link, LinkError};
pub use text::{html_to_lines, strip_control_chars, truncate_to_width};
