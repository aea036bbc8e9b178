//! The fixed 16 byte header at the start of every pex file.
use super::error::{PexError, Result};
use crate::ext::io::MemReaderRef;
use crate::types::ByteOrder;
use crate::utils::struct_pack::*;
use pex_anon_macro::*;
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom, Write};

/// Magic number as read from a file whose byte order matches the reading order.
pub const PEX_MAGIC: u32 = 0xFA57C0DE;
/// Magic number as read from a file stored in the opposite byte order.
pub const PEX_MAGIC_SWAPPED: u32 = 0xDEC057FA;
pub const HEADER_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, StructPack, StructUnpack)]
#[serde(rename_all = "camelCase")]
pub struct PexHeader {
    pub magic: u32,
    pub major_version: u8,
    pub minor_version: u8,
    pub game_id: u16,
    /// Seconds since the Unix epoch.
    pub compilation_time: u64,
}

/// Turns a header read little-endian into its real values.
///
/// The magic tells which order the file was stored in: if it reads back reversed, the
/// multi-byte fields are swapped. Version bytes never need swapping.
pub fn normalize_byte_order(raw: PexHeader) -> Result<(PexHeader, ByteOrder)> {
    match raw.magic {
        PEX_MAGIC => Ok((raw, ByteOrder::Little)),
        PEX_MAGIC_SWAPPED => Ok((
            PexHeader {
                magic: raw.magic.swap_bytes(),
                game_id: raw.game_id.swap_bytes(),
                compilation_time: raw.compilation_time.swap_bytes(),
                ..raw
            },
            ByteOrder::Big,
        )),
        magic => Err(PexError::UnrecognizedMagic { magic }),
    }
}

impl PexHeader {
    /// Reads the header at offset 0 and reports the byte order the file was written in.
    ///
    /// A stream shorter than [HEADER_SIZE] fails with an unexpected EOF error and the
    /// stream is rewound to 0.
    pub fn read<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<(Self, ByteOrder)> {
        reader.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; HEADER_SIZE];
        if let Err(e) = reader.read_exact(&mut buf) {
            reader.seek(SeekFrom::Start(0))?;
            return Err(e.into());
        }
        let raw = PexHeader::unpack(MemReaderRef::new(&buf), false)?;
        normalize_byte_order(raw)
    }

    /// Writes the header at offset 0 in the given byte order.
    pub fn write<W: Write + Seek + ?Sized>(&self, writer: &mut W, order: ByteOrder) -> Result<usize> {
        let buf = self.to_bytes(order)?;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&buf)?;
        Ok(buf.len())
    }

    pub fn to_bytes(&self, order: ByteOrder) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        self.pack(&mut buf, order.is_big())?;
        Ok(buf)
    }
}

impl std::fmt::Display for PexHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Magic:\t{:08X}", self.magic)?;
        writeln!(f, "Major:\t{:02X}", self.major_version)?;
        writeln!(f, "Minor:\t{:02X}", self.minor_version)?;
        writeln!(f, "Game ID:\t{:04X}", self.game_id)?;
        write!(f, "Compile:\t{}", self.compilation_time)
    }
}

#[cfg(test)]
fn sample_header() -> PexHeader {
    PexHeader {
        magic: PEX_MAGIC,
        major_version: 3,
        minor_version: 1,
        game_id: 1,
        compilation_time: 0x0000_0000_5A0B_1C2D,
    }
}

#[test]
fn test_read_big_endian_header() {
    let data = [
        0xFA, 0x57, 0xC0, 0xDE, 3, 1, 0x00, 0x01, 0, 0, 0, 0, 0x5A, 0x0B, 0x1C, 0x2D,
    ];
    let mut reader = MemReaderRef::new(&data);
    let (header, order) = PexHeader::read(&mut reader).unwrap();
    assert_eq!(order, ByteOrder::Big);
    assert_eq!(header, sample_header());
}

#[test]
fn test_read_little_endian_header() {
    let data = [
        0xDE, 0xC0, 0x57, 0xFA, 3, 1, 0x01, 0x00, 0x2D, 0x1C, 0x0B, 0x5A, 0, 0, 0, 0,
    ];
    let mut reader = MemReaderRef::new(&data);
    let (header, order) = PexHeader::read(&mut reader).unwrap();
    assert_eq!(order, ByteOrder::Little);
    assert_eq!(header, sample_header());
}

#[test]
fn test_swapped_and_straight_agree() {
    let header = sample_header();
    let le = header.to_bytes(ByteOrder::Little).unwrap();
    let be = header.to_bytes(ByteOrder::Big).unwrap();
    assert_ne!(le, be);
    let (from_le, _) = PexHeader::read(&mut MemReaderRef::new(&le)).unwrap();
    let (from_be, _) = PexHeader::read(&mut MemReaderRef::new(&be)).unwrap();
    assert_eq!(from_le.game_id, from_be.game_id);
    assert_eq!(from_le.compilation_time, from_be.compilation_time);
    assert_eq!(from_le, from_be);
}

#[test]
fn test_unrecognized_magic() {
    let mut data = sample_header().to_bytes(ByteOrder::Little).unwrap();
    data[..4].copy_from_slice(&0x12345678u32.to_le_bytes());
    match PexHeader::read(&mut MemReaderRef::new(&data)) {
        Err(PexError::UnrecognizedMagic { magic }) => assert_eq!(magic, 0x12345678),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_short_stream() {
    let data = [0xDE, 0xC0, 0x57, 0xFA, 3, 1];
    let mut reader = MemReaderRef::new(&data);
    match PexHeader::read(&mut reader) {
        Err(PexError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(reader.stream_position().unwrap(), 0);
}

#[test]
fn test_write_is_idempotent() {
    let header = sample_header();
    let mut first = std::io::Cursor::new(Vec::new());
    let mut second = std::io::Cursor::new(Vec::new());
    assert_eq!(header.write(&mut first, ByteOrder::Big).unwrap(), HEADER_SIZE);
    header.write(&mut second, ByteOrder::Big).unwrap();
    header.write(&mut second, ByteOrder::Big).unwrap();
    assert_eq!(first.into_inner(), second.into_inner());
}
