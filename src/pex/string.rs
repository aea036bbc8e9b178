//! Length-prefixed strings as stored in pex files.
use crate::ext::io::ReadExt;
use crate::types::Encoding;
use crate::utils::encoding::decode_to_string;
use crate::utils::struct_pack::*;
use std::io::{Read, Result, Seek, Write};

/// Raw bytes of one string field.
///
/// The bytes are kept exactly as the compiler wrote them, so a decoded string always
/// encodes back to the same bytes whatever code page it was written in.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PexString(Vec<u8>);

impl PexString {
    pub const MAX_LEN: usize = u16::MAX as usize;

    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Size of the field on disk, including the length prefix.
    pub fn packed_len(&self) -> usize {
        2 + self.0.len()
    }

    /// Returns a string of the same length made only of `mask`.
    pub fn masked(&self, mask: u8) -> Self {
        Self(vec![mask; self.0.len()])
    }

    /// Returns the last component of a Windows or Unix style path.
    ///
    /// Trailing separators are ignored. If nothing is left after stripping, the string is
    /// returned unchanged.
    pub fn file_name(&self) -> Self {
        let is_sep = |b: &u8| *b == b'\\' || *b == b'/';
        let end = self
            .0
            .iter()
            .rposition(|b| !is_sep(b))
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let trimmed = &self.0[..end];
        let start = trimmed
            .iter()
            .rposition(is_sep)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        if start >= end {
            return self.clone();
        }
        Self(trimmed[start..].to_vec())
    }

    pub fn to_string_lossy(&self, encoding: Encoding) -> String {
        decode_to_string(encoding, &self.0)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.0).into_owned())
    }
}

impl From<&str> for PexString {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for PexString {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl std::fmt::Debug for PexString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl StructUnpack for PexString {
    fn unpack<R: Read + Seek>(mut reader: R, big: bool) -> Result<Self> {
        let len = u16::unpack(&mut reader, big)? as usize;
        Ok(Self(reader.read_exact_vec(len)?))
    }
}

impl StructPack for PexString {
    fn pack<W: Write>(&self, writer: &mut W, big: bool) -> Result<()> {
        let len = u16::try_from(self.0.len()).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("String of {} bytes does not fit a u16 length", self.0.len()),
            )
        })?;
        len.pack(writer, big)?;
        writer.write_all(&self.0)
    }
}

#[test]
fn test_pack_prefix_order() {
    let s = PexString::from("Foo");
    let mut le = Vec::new();
    s.pack(&mut le, false).unwrap();
    assert_eq!(le, vec![3, 0, b'F', b'o', b'o']);
    let mut be = Vec::new();
    s.pack(&mut be, true).unwrap();
    assert_eq!(be, vec![0, 3, b'F', b'o', b'o']);
    let back = PexString::unpack(std::io::Cursor::new(be), true).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_empty_string() {
    let mut buf = Vec::new();
    PexString::default().pack(&mut buf, true).unwrap();
    assert_eq!(buf, vec![0, 0]);
    let s = PexString::unpack(std::io::Cursor::new(buf), true).unwrap();
    assert!(s.is_empty());
}

#[test]
fn test_too_long() {
    let s = PexString::new(vec![b'a'; PexString::MAX_LEN + 1]);
    let mut buf = Vec::new();
    assert!(s.pack(&mut buf, false).is_err());
    assert!(buf.is_empty());
}

#[test]
fn test_masked_keeps_length() {
    let s = PexString::from("Alice");
    let m = s.masked(b'*');
    assert_eq!(m.as_bytes(), b"*****");
    assert_eq!(m.len(), s.len());
    assert!(PexString::default().masked(b'#').is_empty());
    let raw = PexString::new(vec![0xE9, 0x41, 0x00]);
    assert_eq!(raw.masked(b'x').as_bytes(), b"xxx");
}

#[test]
fn test_file_name() {
    assert_eq!(
        PexString::from("C:\\Temp\\Scripts\\Foo.psc").file_name(),
        PexString::from("Foo.psc")
    );
    assert_eq!(
        PexString::from("/tmp/papyrus/Bar.psc").file_name(),
        PexString::from("Bar.psc")
    );
    assert_eq!(
        PexString::from("Baz.psc").file_name(),
        PexString::from("Baz.psc")
    );
    assert_eq!(
        PexString::from("C:\\Temp\\Dir\\").file_name(),
        PexString::from("Dir")
    );
    assert_eq!(PexString::from("\\\\").file_name(), PexString::from("\\\\"));
    assert!(PexString::default().file_name().is_empty());
}
