//! Text helpers shared by the extractor, discovery and CLI output.
//!
//! # Examples
//!
//! ```
//! use feedboard::util::{collapse_whitespace, strip_control_chars, truncate_chars};
//!
//! let text = collapse_whitespace("  Breaking\n   news  ");
//! assert_eq!(text, "Breaking news");
//!
//! assert_eq!(truncate_chars("Hello World", 5), "Hello");
//! assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
//! ```

mod text;

pub use text::{collapse_whitespace, strip_control_chars, truncate_chars, ELLIPSIS};
