//! Core types for ryt-sandbox

pub mod config;
pub mod format;
pub mod retry;

pub use config::*;
pub use format::*;
pub use retry::*;
