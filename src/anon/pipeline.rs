use super::error::{AnonError, ErrorKind, Stage};
use crate::pex::{DocumentCodec, PexCodec, PexDocument};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Settings for one anonymizing run. Shared read-only by every file of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnonymizeConfig {
    /// Byte written over every byte of the user and machine names.
    pub mask: u8,
    /// Copy each file to [Self::backup_extension] before touching it.
    pub backup: bool,
    pub backup_extension: String,
    pub temp_extension: String,
}

impl Default for AnonymizeConfig {
    fn default() -> Self {
        Self {
            mask: b'*',
            backup: false,
            backup_extension: String::from("bak"),
            temp_extension: String::from("tmp"),
        }
    }
}

impl AnonymizeConfig {
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        path.with_extension(&self.backup_extension)
    }

    pub fn temp_path(&self, path: &Path) -> PathBuf {
        path.with_extension(&self.temp_extension)
    }
}

/// What happened to one file.
#[derive(Debug)]
pub enum FileOutcome {
    Rewritten,
    /// Not a pex file, or a version this tool does not know. Left untouched.
    SkippedUnrecognized(AnonError),
    /// The rewritten file did not read back the same. Left untouched.
    SkippedMismatch(AnonError),
    Failed(AnonError),
}

impl FileOutcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, FileOutcome::Rewritten)
    }

    /// Mismatches count as failures for the exit status.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileOutcome::SkippedMismatch(_) | FileOutcome::Failed(_)
        )
    }

    pub fn error(&self) -> Option<&AnonError> {
        match self {
            FileOutcome::Rewritten => None,
            FileOutcome::SkippedUnrecognized(e)
            | FileOutcome::SkippedMismatch(e)
            | FileOutcome::Failed(e) => Some(e),
        }
    }
}

impl From<Result<(), AnonError>> for FileOutcome {
    fn from(value: Result<(), AnonError>) -> Self {
        match value {
            Ok(()) => FileOutcome::Rewritten,
            Err(e) => match e.kind() {
                ErrorKind::FormatUnrecognized => FileOutcome::SkippedUnrecognized(e),
                ErrorKind::ValidationMismatch => FileOutcome::SkippedMismatch(e),
                ErrorKind::Io | ErrorKind::TempFileConflict => FileOutcome::Failed(e),
            },
        }
    }
}

/// Masks the identifying strings of a document in place.
///
/// User and machine names keep their length. Variants whose compiler records the path of
/// its temp copy get the source file name cut down to its last component.
pub fn anonymize_document(doc: &mut PexDocument, mask: u8) {
    doc.user_name = doc.user_name.masked(mask);
    doc.machine_name = doc.machine_name.masked(mask);
    if doc.variant.strips_source_path() {
        doc.source_file_name = doc.source_file_name.file_name();
    }
}

/// A file this run created. Removed when dropped unless [TempPath::keep] was called.
struct TempPath {
    path: PathBuf,
    keep: bool,
}

impl TempPath {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Copies `src` to a new file at `dst`. Fails if `dst` already exists.
///
/// A partially written copy is removed again.
fn copy_exclusive(stage: Stage, src: &Path, dst: &Path) -> Result<TempPath, AnonError> {
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                AnonError::TempFileConflict {
                    path: dst.to_path_buf(),
                }
            } else {
                AnonError::io(stage, dst, e)
            }
        })?;
    let guard = TempPath::new(dst.to_path_buf());
    let mut input = File::open(src).map_err(|e| AnonError::io(stage, src, e))?;
    std::io::copy(&mut input, &mut output).map_err(|e| AnonError::io(stage, dst, e))?;
    Ok(guard)
}

/// Gives `dst` the permissions of `src`.
fn copy_permissions(stage: Stage, src: &Path, dst: &Path) -> Result<(), AnonError> {
    let permissions = fs::metadata(src)
        .map_err(|e| AnonError::io(stage, src, e))?
        .permissions();
    fs::set_permissions(dst, permissions).map_err(|e| AnonError::io(stage, dst, e))
}

/// Runs the decode, mask, write, verify and replace cycle over single files.
pub struct Anonymizer<C: DocumentCodec = PexCodec> {
    config: AnonymizeConfig,
    codec: C,
}

impl Anonymizer<PexCodec> {
    pub fn new(config: AnonymizeConfig) -> Self {
        Self::with_codec(config, PexCodec)
    }
}

impl<C: DocumentCodec> Anonymizer<C> {
    pub fn with_codec(config: AnonymizeConfig, codec: C) -> Self {
        Self { config, codec }
    }

    pub fn anonymize_file<P: AsRef<Path> + ?Sized>(&self, path: &P) -> FileOutcome {
        self.try_anonymize(path.as_ref()).into()
    }

    /// Rewrites `path` with its identifying strings masked.
    ///
    /// The original is replaced only once the rewritten copy has been read back and its
    /// header and payload match the original exactly. On every error the original is left
    /// as it was and neither the temp file nor a backup made by this call remains.
    /// The replaced file keeps the original's permissions.
    pub fn try_anonymize(&self, path: &Path) -> Result<(), AnonError> {
        let original = self.decode(Stage::DecodeOriginal, path)?;
        log::debug!("{}: {} document", path.display(), original.variant);
        log::trace!("{}\n{}", path.display(), original.header);

        let backup = if self.config.backup {
            let backup_path = self.config.backup_path(path);
            log::debug!("Creating backup file: {}", backup_path.display());
            let backup = copy_exclusive(Stage::Backup, path, &backup_path)?;
            copy_permissions(Stage::Backup, path, &backup_path)?;
            Some(backup)
        } else {
            None
        };

        let temp = copy_exclusive(Stage::CreateTemp, path, &self.config.temp_path(path))?;
        let mut doc = self.decode(Stage::DecodeTemp, temp.path())?;
        anonymize_document(&mut doc, self.config.mask);
        self.encode(&doc, temp.path())?;

        let rewritten = self.decode(Stage::VerifyTemp, temp.path())?;
        if let Some(mismatch) = original.content_mismatch(&rewritten) {
            log::error!(
                "Validation failed for {}: {}",
                path.display(),
                mismatch
            );
            return Err(AnonError::ValidationMismatch {
                path: path.to_path_buf(),
                mismatch,
            });
        }

        copy_permissions(Stage::Commit, path, temp.path())?;
        fs::rename(temp.path(), path).map_err(|e| AnonError::io(Stage::Commit, path, e))?;
        temp.keep();
        if let Some(backup) = backup {
            backup.keep();
        }
        log::debug!("Replaced {}", path.display());
        Ok(())
    }

    fn decode(&self, stage: Stage, path: &Path) -> Result<PexDocument, AnonError> {
        let file = File::open(path).map_err(|e| AnonError::io(stage, path, e))?;
        let mut reader = BufReader::new(file);
        self.codec
            .decode(&mut reader)
            .map_err(|e| AnonError::codec(stage, path, e))
    }

    fn encode(&self, doc: &PexDocument, path: &Path) -> Result<(), AnonError> {
        let stage = Stage::EncodeTemp;
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| AnonError::io(stage, path, e))?;
        let mut writer = BufWriter::new(file);
        let written = self
            .codec
            .encode(doc, &mut writer)
            .map_err(|e| AnonError::codec(stage, path, e))?;
        writer.flush().map_err(|e| AnonError::io(stage, path, e))?;
        log::trace!("Wrote {} bytes to {}", written, path.display());
        Ok(())
    }
}

#[cfg(test)]
fn sample(variant: crate::pex::GameVariant) -> PexDocument {
    let mut doc = PexDocument::new(variant);
    doc.source_file_name = "C:\\Temp\\Scripts\\Foo.psc".into();
    doc.user_name = "Alice".into();
    doc.machine_name = "ALICE-DESKTOP".into();
    doc.payload = vec![0x10, 0x20, 0x30, 0x40];
    doc
}

#[test]
fn test_anonymize_document_masks_names() {
    use crate::pex::GameVariant;
    for variant in [GameVariant::Skyrim, GameVariant::SkyrimSe] {
        let original = sample(variant);
        let mut doc = original.clone();
        anonymize_document(&mut doc, b'*');
        assert_eq!(doc.user_name.as_bytes(), b"*****");
        assert_eq!(doc.machine_name.as_bytes(), b"*************");
        assert_eq!(doc.source_file_name, original.source_file_name);
        assert!(original.same_content(&doc));
    }
}

#[test]
fn test_anonymize_document_strips_source_path() {
    let original = sample(crate::pex::GameVariant::Fallout4);
    let mut doc = original.clone();
    anonymize_document(&mut doc, b'#');
    assert_eq!(doc.source_file_name.as_bytes(), b"Foo.psc");
    assert_eq!(doc.user_name.as_bytes(), b"#####");
    assert_eq!(doc.header, original.header);
    assert_eq!(doc.payload, original.payload);
}

#[test]
fn test_outcome_from_result() {
    assert!(FileOutcome::from(Ok(())).is_rewritten());
    let conflict = FileOutcome::from(Err(AnonError::TempFileConflict {
        path: PathBuf::from("Foo.tmp"),
    }));
    assert!(matches!(conflict, FileOutcome::Failed(_)));
    assert!(conflict.is_failure());
    let skipped = FileOutcome::from(Err(AnonError::codec(
        Stage::DecodeOriginal,
        Path::new("Foo.pex"),
        crate::pex::PexError::UnrecognizedMagic { magic: 0 },
    )));
    assert!(matches!(skipped, FileOutcome::SkippedUnrecognized(_)));
    assert!(!skipped.is_failure());
}

#[test]
fn test_side_file_paths() {
    let config = AnonymizeConfig::default();
    let path = Path::new("scripts/Foo.pex");
    assert_eq!(config.temp_path(path), PathBuf::from("scripts/Foo.tmp"));
    assert_eq!(config.backup_path(path), PathBuf::from("scripts/Foo.bak"));
}
