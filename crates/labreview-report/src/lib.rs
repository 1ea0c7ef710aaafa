//! labreview-report: report rendering for finished review runs.

pub mod html;

pub use html::{generate_html, write_html_report};
