pub mod config;
pub mod resume;
pub mod start;
pub mod templates;
