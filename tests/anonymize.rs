use pex_anon::anon::batch;
use pex_anon::anon::{AnonError, AnonymizeConfig, Anonymizer, ErrorKind, FileOutcome, Stage};
use pex_anon::pex::*;
use pex_anon::types::ByteOrder;
use pex_anon::utils::counter::Counter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn document(variant: GameVariant, user: &str) -> PexDocument {
    let mut doc = PexDocument::new(variant);
    doc.header.compilation_time = 1_600_000_000;
    doc.source_file_name = "C:\\Temp\\Scripts\\Foo.psc".into();
    doc.user_name = user.into();
    doc.machine_name = "WORKSTATION-7".into();
    doc.payload = (0..=255u8).rev().cycle().take(1000).collect();
    doc
}

fn write_doc(dir: &Path, name: &str, doc: &PexDocument) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, doc.to_bytes().unwrap()).unwrap();
    path
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Writes a valid document, then fails as if the disk filled up.
struct DiskFullCodec;

impl DocumentCodec for DiskFullCodec {
    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<PexDocument> {
        PexCodec.decode(reader)
    }

    fn encode(&self, doc: &PexDocument, writer: &mut dyn WriteSeek) -> Result<usize> {
        let data = doc.to_bytes()?;
        writer.write_all(&data[..HEADER_SIZE + 4])?;
        Err(PexError::Io(std::io::Error::other("disk full")))
    }
}

/// Silently drops the last payload byte.
struct TruncatingCodec;

impl DocumentCodec for TruncatingCodec {
    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<PexDocument> {
        PexCodec.decode(reader)
    }

    fn encode(&self, doc: &PexDocument, writer: &mut dyn WriteSeek) -> Result<usize> {
        let mut doc = doc.clone();
        doc.payload.pop();
        PexCodec.encode(&doc, writer)
    }
}

#[test]
fn big_endian_file_is_masked_and_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = vec![
        0xFA, 0x57, 0xC0, 0xDE, 3, 1, 0x00, 0x01, 0, 0, 0, 0, 0x5F, 0x5E, 0x10, 0x00,
    ];
    data.extend_from_slice(&[0, 7]);
    data.extend_from_slice(b"Foo.psc");
    data.extend_from_slice(&[0, 5]);
    data.extend_from_slice(b"Alice");
    data.extend_from_slice(&[0, 2]);
    data.extend_from_slice(b"PC");
    data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
    let path = dir.path().join("Foo.pex");
    fs::write(&path, &data).unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    assert!(outcome.is_rewritten(), "{:?}", outcome);

    let mut expected = data.clone();
    let user = 16 + 2 + 7 + 2;
    expected[user..user + 5].copy_from_slice(b"*****");
    expected[user + 5 + 2..user + 5 + 4].copy_from_slice(b"**");
    assert_eq!(fs::read(&path).unwrap(), expected);
    assert_eq!(file_names(dir.path()), vec!["Foo.pex"]);

    let doc = PexDocument::from_file(&path).unwrap();
    assert_eq!(doc.variant, GameVariant::SkyrimSe);
    assert_eq!(doc.header.compilation_time, 0x5F5E_1000);
    assert_eq!(doc.payload, vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]);
}

#[test]
fn unrecognized_file_is_skipped_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = document(GameVariant::Skyrim, "Alice").to_bytes().unwrap();
    data[..4].copy_from_slice(&0x12345678u32.to_le_bytes());
    let path = dir.path().join("Bad.pex");
    fs::write(&path, &data).unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    match &outcome {
        FileOutcome::SkippedUnrecognized(AnonError::FormatUnrecognized { source, .. }) => {
            assert!(matches!(source, PexError::UnrecognizedMagic { magic: 0x12345678 }))
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!outcome.is_failure());
    assert_eq!(fs::read(&path).unwrap(), data);
    assert_eq!(file_names(dir.path()), vec!["Bad.pex"]);
}

#[test]
fn unknown_version_is_skipped_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut data = document(GameVariant::Fallout4, "Alice").to_bytes().unwrap();
    data[5] = 10;
    let path = dir.path().join("Future.pex");
    fs::write(&path, &data).unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    assert_eq!(
        outcome.error().map(|e| e.kind()),
        Some(ErrorKind::FormatUnrecognized)
    );
    assert_eq!(fs::read(&path).unwrap(), data);
}

#[test]
fn write_failure_leaves_original_and_no_temp() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document(GameVariant::Skyrim, "Alice");
    let path = write_doc(dir.path(), "Foo.pex", &doc);
    let before = fs::read(&path).unwrap();

    let anonymizer = Anonymizer::with_codec(AnonymizeConfig::default(), DiskFullCodec);
    match anonymizer.anonymize_file(&path) {
        FileOutcome::Failed(AnonError::Io { stage, source, .. }) => {
            assert_eq!(stage, Stage::EncodeTemp);
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(file_names(dir.path()), vec!["Foo.pex"]);
}

#[test]
fn validation_mismatch_leaves_original_and_no_temp() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document(GameVariant::SkyrimSe, "Alice");
    let path = write_doc(dir.path(), "Foo.pex", &doc);
    let before = fs::read(&path).unwrap();

    let anonymizer = Anonymizer::with_codec(AnonymizeConfig::default(), TruncatingCodec);
    let outcome = anonymizer.anonymize_file(&path);
    match &outcome {
        FileOutcome::SkippedMismatch(AnonError::ValidationMismatch { mismatch, .. }) => {
            assert_eq!(
                mismatch,
                &ContentMismatch::PayloadLength {
                    original: 1000,
                    rewritten: 999
                }
            )
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(outcome.is_failure());
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(file_names(dir.path()), vec!["Foo.pex"]);
}

#[test]
fn fallout4_source_path_is_stripped() {
    let dir = tempfile::tempdir().unwrap();
    let anonymizer = Anonymizer::new(AnonymizeConfig::default());

    let fo4 = document(GameVariant::Fallout4, "Alice");
    let path = write_doc(dir.path(), "Fo4.pex", &fo4);
    assert!(anonymizer.anonymize_file(&path).is_rewritten());
    let after = PexDocument::from_file(&path).unwrap();
    assert_eq!(after.source_file_name, PexString::from("Foo.psc"));
    assert_eq!(after.user_name, PexString::from("*****"));
    assert!(fo4.same_content(&after));

    for variant in [GameVariant::Skyrim, GameVariant::SkyrimSe] {
        let doc = document(variant, "Alice");
        let path = write_doc(dir.path(), "Other.pex", &doc);
        assert!(anonymizer.anonymize_file(&path).is_rewritten());
        let after = PexDocument::from_file(&path).unwrap();
        assert_eq!(after.source_file_name, doc.source_file_name);
        assert_eq!(after.header, doc.header);
        assert_eq!(after.payload, doc.payload);
    }
}

#[test]
fn anonymizing_twice_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnonymizeConfig {
        mask: b'#',
        ..Default::default()
    };
    let anonymizer = Anonymizer::new(config);
    let path = write_doc(dir.path(), "Foo.pex", &document(GameVariant::Fallout4, "Bob"));
    assert!(anonymizer.anonymize_file(&path).is_rewritten());
    let once = fs::read(&path).unwrap();
    assert!(anonymizer.anonymize_file(&path).is_rewritten());
    assert_eq!(fs::read(&path).unwrap(), once);
}

#[test]
fn backup_keeps_original_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let config = AnonymizeConfig {
        backup: true,
        ..Default::default()
    };
    let anonymizer = Anonymizer::new(config);
    let path = write_doc(dir.path(), "Foo.pex", &document(GameVariant::Skyrim, "Alice"));
    let before = fs::read(&path).unwrap();

    assert!(anonymizer.anonymize_file(&path).is_rewritten());
    assert_eq!(fs::read(dir.path().join("Foo.bak")).unwrap(), before);
    assert_ne!(fs::read(&path).unwrap(), before);

    // The first backup is never overwritten, so a second run refuses.
    let rewritten = fs::read(&path).unwrap();
    let outcome = anonymizer.anonymize_file(&path);
    assert_eq!(
        outcome.error().map(|e| e.kind()),
        Some(ErrorKind::TempFileConflict)
    );
    assert_eq!(fs::read(&path).unwrap(), rewritten);
    assert_eq!(fs::read(dir.path().join("Foo.bak")).unwrap(), before);
    assert_eq!(file_names(dir.path()), vec!["Foo.bak", "Foo.pex"]);
}

#[test]
fn existing_temp_file_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "Foo.pex", &document(GameVariant::Skyrim, "Alice"));
    let before = fs::read(&path).unwrap();
    let temp = dir.path().join("Foo.tmp");
    fs::write(&temp, b"someone else's work").unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    match &outcome {
        FileOutcome::Failed(AnonError::TempFileConflict { path }) => assert_eq!(path, &temp),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(fs::read(&temp).unwrap(), b"someone else's work");
}

#[test]
fn truncated_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let data = document(GameVariant::Skyrim, "Alice").to_bytes().unwrap();
    let path = dir.path().join("Short.pex");
    fs::write(&path, &data[..HEADER_SIZE + 3]).unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    match &outcome {
        FileOutcome::Failed(AnonError::Io { stage, .. }) => {
            assert_eq!(*stage, Stage::DecodeOriginal)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(file_names(dir.path()), vec!["Short.pex"]);
}

#[test]
fn batch_reports_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    for i in 0..6 {
        let name = format!("Script{}.pex", i);
        if i == 3 {
            let path = dir.path().join(&name);
            fs::write(&path, b"not a pex file at all").unwrap();
            files.push(path);
        } else {
            let variant = VARIANTS[i % VARIANTS.len()].variant;
            files.push(write_doc(dir.path(), &name, &document(variant, "Alice")));
        }
    }

    let counter = Counter::new();
    let anonymizer = Arc::new(Anonymizer::new(AnonymizeConfig::default()));
    let results = batch::run(anonymizer, files.clone(), 3, &counter).unwrap();
    let paths: Vec<PathBuf> = results.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(paths, files);
    for (i, (_, outcome)) in results.iter().enumerate() {
        if i == 3 {
            assert!(matches!(outcome, FileOutcome::SkippedUnrecognized(_)));
        } else {
            assert!(outcome.is_rewritten(), "{:?}", outcome);
        }
    }
    assert_eq!(counter.rewritten(), 5);
    assert!(!counter.has_failures());
    assert_eq!(
        counter.to_string(),
        "Rewritten: 5, Unrecognized: 1, Mismatch: 0, Error: 0"
    );
}

#[cfg(unix)]
#[test]
fn permissions_survive_the_rewrite() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "Private.pex", &document(GameVariant::Skyrim, "Alice"));
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

    let config = AnonymizeConfig {
        backup: true,
        ..Default::default()
    };
    let outcome = Anonymizer::new(config).anonymize_file(&path);
    assert!(outcome.is_rewritten(), "{:?}", outcome);
    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&path), 0o600);
    assert_eq!(mode(&dir.path().join("Private.bak")), 0o600);
}

#[test]
fn failed_run_leaves_no_backup_and_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "Foo.pex", &document(GameVariant::Fallout4, "Alice"));
    let before = fs::read(&path).unwrap();
    let config = AnonymizeConfig {
        backup: true,
        ..Default::default()
    };
    let temp = dir.path().join("Foo.tmp");
    fs::write(&temp, b"left over").unwrap();

    let anonymizer = Anonymizer::new(config.clone());
    let outcome = anonymizer.anonymize_file(&path);
    assert_eq!(
        outcome.error().map(|e| e.kind()),
        Some(ErrorKind::TempFileConflict)
    );
    assert_eq!(file_names(dir.path()), vec!["Foo.pex", "Foo.tmp"]);

    fs::remove_file(&temp).unwrap();
    let failing = Anonymizer::with_codec(config, DiskFullCodec);
    assert!(matches!(
        failing.anonymize_file(&path),
        FileOutcome::Failed(AnonError::Io {
            stage: Stage::EncodeTemp,
            ..
        })
    ));
    assert_eq!(file_names(dir.path()), vec!["Foo.pex"]);

    let outcome = anonymizer.anonymize_file(&path);
    assert!(outcome.is_rewritten(), "{:?}", outcome);
    assert_eq!(fs::read(dir.path().join("Foo.bak")).unwrap(), before);
    assert_eq!(file_names(dir.path()), vec!["Foo.bak", "Foo.pex"]);
}

#[test]
fn header_stored_in_other_order_is_rewritten_in_variant_order() {
    let dir = tempfile::tempdir().unwrap();
    let doc = document(GameVariant::SkyrimSe, "Alice");
    let mut data = doc.to_bytes().unwrap();
    let little = doc.header.to_bytes(ByteOrder::Little).unwrap();
    data[..HEADER_SIZE].copy_from_slice(&little);
    let path = dir.path().join("Mixed.pex");
    fs::write(&path, &data).unwrap();

    let outcome = Anonymizer::new(AnonymizeConfig::default()).anonymize_file(&path);
    assert!(outcome.is_rewritten(), "{:?}", outcome);
    let after = fs::read(&path).unwrap();
    assert_eq!(&after[..4], &[0xFA, 0x57, 0xC0, 0xDE]);
    let decoded = PexDocument::from_bytes(&after).unwrap();
    assert!(doc.same_content(&decoded));
    assert_eq!(decoded.user_name, PexString::from("*****"));
    assert_eq!(file_names(dir.path()), vec!["Mixed.pex"]);
}
