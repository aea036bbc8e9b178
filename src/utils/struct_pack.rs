//! Byte-order aware packing of plain binary records.
use pex_anon_macro::struct_unpack_impl_for_num;
use std::io::{Read, Result, Seek, Write};

/// A record that can be read from a binary stream.
///
/// `big` selects big-endian decoding for multi-byte fields.
pub trait StructUnpack: Sized {
    fn unpack<R: Read + Seek>(reader: R, big: bool) -> Result<Self>;
}

/// A record that can be written to a binary stream.
///
/// `big` selects big-endian encoding for multi-byte fields.
pub trait StructPack: Sized {
    fn pack<W: Write>(&self, writer: &mut W, big: bool) -> Result<()>;
}

struct_unpack_impl_for_num!(u8);
struct_unpack_impl_for_num!(u16);
struct_unpack_impl_for_num!(u32);
struct_unpack_impl_for_num!(u64);

#[test]
fn test_num_byte_order() {
    let mut le = Vec::new();
    0x1234u16.pack(&mut le, false).unwrap();
    assert_eq!(le, vec![0x34, 0x12]);
    let mut be = Vec::new();
    0x1234u16.pack(&mut be, true).unwrap();
    assert_eq!(be, vec![0x12, 0x34]);
    let v = u64::unpack(std::io::Cursor::new(vec![0, 0, 0, 0, 0, 0, 0, 7]), true).unwrap();
    assert_eq!(v, 7);
    let v = u32::unpack(std::io::Cursor::new(vec![0xDE, 0xC0, 0x57, 0xFA]), false).unwrap();
    assert_eq!(v, 0xFA57C0DE);
}
