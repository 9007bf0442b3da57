//! Report output
//!
//! - `text`: human-readable console reports
//! - `json`: the same reports rendered as JSON

pub mod json;
pub mod text;
