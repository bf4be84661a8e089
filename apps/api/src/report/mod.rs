//! PDF report generation and delivery.
//!
//! `render` turns a stored result into HTML, `engine` prints that HTML to PDF
//! in a headless browser, and `handlers` exposes direct download, tokenized
//! links and the tracked report email.

pub mod engine;
pub mod handlers;
pub mod render;
