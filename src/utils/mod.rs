//! Utility functions for ryt-sandbox

pub mod cache;
pub mod url;

pub use cache::*;
pub use url::*;
