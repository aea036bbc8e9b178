//! A whole pex file: header, identifying strings and the opaque payload.
use super::error::{PexError, Result};
use super::header::{HEADER_SIZE, PexHeader};
use super::string::PexString;
use super::variant::GameVariant;
use crate::ext::io::*;
use crate::types::*;
use crate::utils::struct_pack::*;
use std::io::{Read, Seek, Write};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PexDocument {
    pub variant: GameVariant,
    pub header: PexHeader,
    pub source_file_name: PexString,
    pub user_name: PexString,
    pub machine_name: PexString,
    /// Everything after the strings: bytecode, debug info, string tables. Never interpreted.
    pub payload: Vec<u8>,
}

/// The first difference found between two documents, ignoring the string fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentMismatch {
    Header {
        original: PexHeader,
        rewritten: PexHeader,
    },
    PayloadLength {
        original: usize,
        rewritten: usize,
    },
    PayloadBytes {
        offset: usize,
    },
}

impl std::fmt::Display for ContentMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentMismatch::Header {
                original,
                rewritten,
            } => write!(
                f,
                "header changed (version {}.{} game {} time {} -> version {}.{} game {} time {})",
                original.major_version,
                original.minor_version,
                original.game_id,
                original.compilation_time,
                rewritten.major_version,
                rewritten.minor_version,
                rewritten.game_id,
                rewritten.compilation_time
            ),
            ContentMismatch::PayloadLength {
                original,
                rewritten,
            } => write!(
                f,
                "payload length changed from {} to {} bytes",
                original, rewritten
            ),
            ContentMismatch::PayloadBytes { offset } => {
                write!(f, "payload differs at offset {:#x}", offset)
            }
        }
    }
}

impl PexDocument {
    /// Creates an empty document for a variant with a freshly stamped header.
    pub fn new(variant: GameVariant) -> Self {
        Self {
            variant,
            header: variant.new_header(),
            source_file_name: PexString::default(),
            user_name: PexString::default(),
            machine_name: PexString::default(),
            payload: Vec::new(),
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.variant.byte_order()
    }

    /// Decodes a document from the start of `reader`.
    ///
    /// The payload is every byte from the end of the machine name to the end of the stream.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self> {
        let (header, stored_order) = PexHeader::read(reader)?;
        let variant = GameVariant::identify(&header).ok_or(PexError::UnknownVariant {
            major: header.major_version,
            minor: header.minor_version,
            game_id: header.game_id,
        })?;
        let order = variant.byte_order();
        if stored_order != order {
            log::warn!(
                "{} header is stored {}, but the variant uses {}",
                variant,
                stored_order,
                order
            );
        }
        let big = order.is_big();
        let source_file_name = PexString::unpack(&mut *reader, big)?;
        let user_name = PexString::unpack(&mut *reader, big)?;
        let machine_name = PexString::unpack(&mut *reader, big)?;
        let payload_len = reader.remaining_len()?;
        let payload_len = usize::try_from(payload_len).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::OutOfMemory, "Payload is too large")
        })?;
        let payload = reader.read_exact_vec(payload_len)?;
        Ok(Self {
            variant,
            header,
            source_file_name,
            user_name,
            machine_name,
            payload,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = MemReaderRef::new(data);
        Self::read(&mut reader)
    }

    pub fn from_file<P: AsRef<Path> + ?Sized>(path: &P) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(f);
        Self::read(&mut reader)
    }

    fn check_strings(&self) -> Result<()> {
        for (field, s) in [
            ("source file name", &self.source_file_name),
            ("user name", &self.user_name),
            ("machine name", &self.machine_name),
        ] {
            if s.len() > PexString::MAX_LEN {
                return Err(PexError::StringTooLong {
                    field,
                    len: s.len(),
                });
            }
        }
        Ok(())
    }

    /// Size of the encoded document in bytes.
    pub fn packed_len(&self) -> usize {
        HEADER_SIZE
            + self.source_file_name.packed_len()
            + self.user_name.packed_len()
            + self.machine_name.packed_len()
            + self.payload.len()
    }

    /// Encodes the document at the start of `writer` and returns the number of bytes written.
    ///
    /// The writer is not truncated. Strings that do not fit a u16 length are rejected
    /// before anything is written.
    pub fn write<W: Write + Seek + ?Sized>(&self, writer: &mut W) -> Result<usize> {
        self.check_strings()?;
        let order = self.byte_order();
        let big = order.is_big();
        let mut written = self.header.write(writer, order)?;
        let mut strings = Vec::with_capacity(self.packed_len() - HEADER_SIZE - self.payload.len());
        for s in [&self.source_file_name, &self.user_name, &self.machine_name] {
            s.pack(&mut strings, big)?;
        }
        writer.write_all(&strings)?;
        written += strings.len();
        writer.write_all(&self.payload)?;
        written += self.payload.len();
        writer.flush()?;
        Ok(written)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = std::io::Cursor::new(Vec::with_capacity(self.packed_len()));
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Compares the parts of two documents that anonymizing must never change.
    ///
    /// The three string fields are ignored.
    pub fn content_mismatch(&self, other: &Self) -> Option<ContentMismatch> {
        if self.header != other.header {
            return Some(ContentMismatch::Header {
                original: self.header,
                rewritten: other.header,
            });
        }
        if self.payload.len() != other.payload.len() {
            return Some(ContentMismatch::PayloadLength {
                original: self.payload.len(),
                rewritten: other.payload.len(),
            });
        }
        self.payload
            .iter()
            .zip(other.payload.iter())
            .position(|(a, b)| a != b)
            .map(|offset| ContentMismatch::PayloadBytes { offset })
    }

    pub fn same_content(&self, other: &Self) -> bool {
        self.content_mismatch(other).is_none()
    }
}

#[cfg(test)]
fn sample(variant: GameVariant) -> PexDocument {
    let mut doc = PexDocument::new(variant);
    doc.header.compilation_time = 1_500_000_000;
    doc.source_file_name = PexString::from("C:\\Temp\\PapyrusTemp\\QuestScript.psc");
    doc.user_name = PexString::from("Alice");
    doc.machine_name = PexString::from("ALICE-PC");
    doc.payload = (0..=255u8).cycle().take(700).collect();
    doc
}

#[test]
fn test_round_trip_all_variants() {
    for variant in [
        GameVariant::Skyrim,
        GameVariant::SkyrimSe,
        GameVariant::Fallout4,
    ] {
        let doc = sample(variant);
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(bytes.len(), doc.packed_len());
        let back = PexDocument::from_bytes(&bytes).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }
}

#[test]
fn test_big_endian_layout() {
    let mut doc = PexDocument::new(GameVariant::SkyrimSe);
    doc.header.compilation_time = 0x0102;
    doc.user_name = PexString::from("Al");
    doc.payload = vec![0xAA, 0xBB];
    let bytes = doc.to_bytes().unwrap();
    assert_eq!(
        bytes,
        vec![
            0xFA, 0x57, 0xC0, 0xDE, 3, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0x01, 0x02, // header
            0, 0, // source file name
            0, 2, b'A', b'l', // user name
            0, 0, // machine name
            0xAA, 0xBB,
        ]
    );
}

#[test]
fn test_little_endian_layout() {
    let mut doc = PexDocument::new(GameVariant::Fallout4);
    doc.header.compilation_time = 0x0102;
    doc.machine_name = PexString::from("PC");
    let bytes = doc.to_bytes().unwrap();
    assert_eq!(
        bytes,
        vec![
            0xDE, 0xC0, 0x57, 0xFA, 3, 9, 2, 0, 0x02, 0x01, 0, 0, 0, 0, 0, 0, // header
            0, 0, // source file name
            0, 0, // user name
            2, 0, b'P', b'C', // machine name
        ]
    );
    let back = PexDocument::from_bytes(&bytes).unwrap();
    assert!(back.payload.is_empty());
    assert_eq!(back.machine_name, PexString::from("PC"));
}

#[test]
fn test_unknown_variant_is_distinct() {
    let mut bytes = sample(GameVariant::Skyrim).to_bytes().unwrap();
    bytes[5] = 7;
    match PexDocument::from_bytes(&bytes) {
        Err(PexError::UnknownVariant {
            major,
            minor,
            game_id,
        }) => assert_eq!((major, minor, game_id), (3, 7, 1)),
        other => panic!("unexpected result: {:?}", other),
    }
    bytes[0] = 0;
    match PexDocument::from_bytes(&bytes) {
        Err(e) => assert!(matches!(e, PexError::UnrecognizedMagic { .. })),
        Ok(_) => panic!("bad magic was accepted"),
    }
}

#[test]
fn test_truncated_string() {
    let bytes = sample(GameVariant::Fallout4).to_bytes().unwrap();
    match PexDocument::from_bytes(&bytes[..HEADER_SIZE + 5]) {
        Err(PexError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_string_too_long() {
    let mut doc = sample(GameVariant::Skyrim);
    doc.machine_name = PexString::new(vec![b'm'; PexString::MAX_LEN + 1]);
    let mut writer = std::io::Cursor::new(Vec::new());
    match doc.write(&mut writer) {
        Err(PexError::StringTooLong { field, .. }) => assert_eq!(field, "machine name"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(writer.into_inner().is_empty());
}

#[test]
fn test_content_mismatch_ignores_strings() {
    let original = sample(GameVariant::Fallout4);
    let mut other = original.clone();
    other.user_name = other.user_name.masked(b'*');
    other.source_file_name = other.source_file_name.file_name();
    assert!(original.same_content(&other));

    let mut shorter = original.clone();
    shorter.payload.pop();
    assert_eq!(
        original.content_mismatch(&shorter),
        Some(ContentMismatch::PayloadLength {
            original: 700,
            rewritten: 699
        })
    );

    let mut flipped = original.clone();
    flipped.payload[42] ^= 0xFF;
    assert_eq!(
        original.content_mismatch(&flipped),
        Some(ContentMismatch::PayloadBytes { offset: 42 })
    );

    let mut retimed = original.clone();
    retimed.header.compilation_time += 1;
    assert!(matches!(
        original.content_mismatch(&retimed),
        Some(ContentMismatch::Header { .. })
    ));
}

#[test]
fn test_header_order_differs_from_variant() {
    let doc = sample(GameVariant::SkyrimSe);
    let canonical = doc.to_bytes().unwrap();
    let mut stored = canonical.clone();
    stored[..HEADER_SIZE].copy_from_slice(&doc.header.to_bytes(ByteOrder::Little).unwrap());
    assert_eq!(&stored[..4], &[0xDE, 0xC0, 0x57, 0xFA]);

    let back = PexDocument::from_bytes(&stored).unwrap();
    assert_eq!(back, doc);
    let rewritten = back.to_bytes().unwrap();
    assert_eq!(&rewritten[..4], &[0xFA, 0x57, 0xC0, 0xDE]);
    assert_eq!(rewritten, canonical);
}
