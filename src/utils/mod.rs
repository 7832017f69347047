//! Utility modules for the site compiler.

pub mod html;
pub mod log;
