use crate::pex::{ContentMismatch, PexError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Step of the rewrite cycle a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    DecodeOriginal,
    Backup,
    CreateTemp,
    DecodeTemp,
    EncodeTemp,
    VerifyTemp,
    Commit,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::DecodeOriginal => "reading",
            Stage::Backup => "backing up",
            Stage::CreateTemp => "creating temp file",
            Stage::DecodeTemp => "reading temp file",
            Stage::EncodeTemp => "writing temp file",
            Stage::VerifyTemp => "verifying temp file",
            Stage::Commit => "replacing",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    FormatUnrecognized,
    Io,
    ValidationMismatch,
    TempFileConflict,
}

#[derive(Debug, Error)]
pub enum AnonError {
    #[error("Unrecognized file type: {} ({source})", .path.display())]
    FormatUnrecognized {
        path: PathBuf,
        #[source]
        source: PexError,
    },

    #[error("{stage} {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to validate data, skipping {}: {mismatch}", .path.display())]
    ValidationMismatch {
        path: PathBuf,
        mismatch: ContentMismatch,
    },

    #[error("{} already exists", .path.display())]
    TempFileConflict { path: PathBuf },
}

impl AnonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnonError::FormatUnrecognized { .. } => ErrorKind::FormatUnrecognized,
            AnonError::Io { .. } => ErrorKind::Io,
            AnonError::ValidationMismatch { .. } => ErrorKind::ValidationMismatch,
            AnonError::TempFileConflict { .. } => ErrorKind::TempFileConflict,
        }
    }

    pub(crate) fn io(stage: Stage, path: &Path, source: std::io::Error) -> Self {
        AnonError::Io {
            stage,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Maps a codec failure. Only the original file can be unrecognized; anything the
    /// tool wrote itself that fails to decode is an IO failure.
    pub(crate) fn codec(stage: Stage, path: &Path, err: PexError) -> Self {
        match err {
            PexError::Io(source) => Self::io(stage, path, source),
            err if stage == Stage::DecodeOriginal && err.is_unrecognized() => {
                AnonError::FormatUnrecognized {
                    path: path.to_path_buf(),
                    source: err,
                }
            }
            err => Self::io(
                stage,
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            ),
        }
    }
}

#[test]
fn test_codec_error_mapping() {
    let path = Path::new("Foo.pex");
    let e = AnonError::codec(
        Stage::DecodeOriginal,
        path,
        PexError::UnrecognizedMagic { magic: 0x12345678 },
    );
    assert_eq!(e.kind(), ErrorKind::FormatUnrecognized);
    let e = AnonError::codec(
        Stage::VerifyTemp,
        path,
        PexError::UnknownVariant {
            major: 3,
            minor: 7,
            game_id: 1,
        },
    );
    assert_eq!(e.kind(), ErrorKind::Io);
    let e = AnonError::codec(
        Stage::EncodeTemp,
        path,
        PexError::Io(std::io::Error::other("disk full")),
    );
    match e {
        AnonError::Io { stage, source, .. } => {
            assert_eq!(stage, Stage::EncodeTemp);
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
