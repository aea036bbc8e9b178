//! Scrubs user and machine names from compiled Papyrus (pex) scripts.
//!
//! Files are decoded, masked and written to a temp file, which only replaces the
//! original after it has been read back and found identical apart from the masked strings.
pub mod anon;
pub mod ext;
pub mod pex;
pub mod types;
pub mod utils;
