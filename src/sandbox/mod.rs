//! Sandboxed script evaluation

pub mod client;
pub mod context;
pub mod correlator;
pub mod deno;
pub mod host;
pub mod message;

#[cfg(test)]
mod test_fixtures;

pub use client::*;
pub use context::*;
pub use correlator::*;
pub use deno::*;
pub use host::*;
pub use message::*;
