//! Masking the identifying strings of pex files on disk.
pub mod batch;
mod error;
mod pipeline;

pub use error::*;
pub use pipeline::*;
