//! Link extraction and content cleaning for rendered markup.
//!
//! Both entry points are pure functions over a markup string:
//! - [`extract_links`] — anchors resolved to absolute URLs, document order
//! - [`clean`] — textual main content with page chrome removed

pub mod content;
pub mod links;

pub use content::clean;
pub use links::extract_links;
