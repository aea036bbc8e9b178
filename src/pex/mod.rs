//! Compiled Papyrus script (pex) files.
pub mod codec;
pub mod document;
pub mod error;
pub mod header;
pub mod string;
pub mod variant;

pub use codec::{DocumentCodec, PexCodec, ReadSeek, WriteSeek};
pub use document::{ContentMismatch, PexDocument};
pub use error::{PexError, Result};
pub use header::{HEADER_SIZE, PEX_MAGIC, PEX_MAGIC_SWAPPED, PexHeader, normalize_byte_order};
pub use string::PexString;
pub use variant::{GameVariant, VARIANTS, VariantDescriptor};
