use thiserror::Error;

#[derive(Debug, Error)]
pub enum PexError {
    #[error("invalid magic: expected 0xFA57C0DE or 0xDEC057FA, found {magic:#010X}")]
    UnrecognizedMagic { magic: u32 },

    #[error("unknown pex version {major}.{minor} for game id {game_id}")]
    UnknownVariant { major: u8, minor: u8, game_id: u16 },

    #[error("string field '{field}' is {len} bytes long, the limit is 65535")]
    StringTooLong { field: &'static str, len: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PexError {
    /// Returns true when the data is simply not a pex file this tool knows.
    ///
    /// These are classifications, not failures: the caller should skip the file.
    pub fn is_unrecognized(&self) -> bool {
        matches!(
            self,
            PexError::UnrecognizedMagic { .. } | PexError::UnknownVariant { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PexError>;
