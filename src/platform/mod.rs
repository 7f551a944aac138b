//! Platform URL policy: decipher and n-transform of media formats

pub mod heuristics;
pub mod transform;

pub use heuristics::*;
pub use transform::*;
