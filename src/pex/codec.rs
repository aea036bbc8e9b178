//! The seam through which documents are decoded and encoded.
use super::document::PexDocument;
use super::error::Result;
use std::io::{Read, Seek, Write};

pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

pub trait WriteSeek: Write + Seek {}

impl<T: Write + Seek> WriteSeek for T {}

/// Decodes and encodes whole documents.
pub trait DocumentCodec: Send + Sync {
    /// Decodes a document starting at offset 0 of `reader`.
    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<PexDocument>;
    /// Encodes `doc` at offset 0 of `writer` and returns the number of bytes written.
    fn encode(&self, doc: &PexDocument, writer: &mut dyn WriteSeek) -> Result<usize>;
}

/// The pex binary format.
#[derive(Clone, Copy, Debug, Default)]
pub struct PexCodec;

impl DocumentCodec for PexCodec {
    fn decode(&self, reader: &mut dyn ReadSeek) -> Result<PexDocument> {
        PexDocument::read(reader)
    }

    fn encode(&self, doc: &PexDocument, writer: &mut dyn WriteSeek) -> Result<usize> {
        doc.write(writer)
    }
}

#[test]
fn test_codec_matches_document() {
    use super::variant::GameVariant;
    let mut doc = PexDocument::new(GameVariant::SkyrimSe);
    doc.user_name = "Someone".into();
    doc.payload = vec![1, 2, 3];
    let mut cursor = std::io::Cursor::new(Vec::new());
    let written = PexCodec.encode(&doc, &mut cursor).unwrap();
    assert_eq!(written, doc.packed_len());
    assert_eq!(cursor.get_ref(), &doc.to_bytes().unwrap());
    let back = PexCodec.decode(&mut cursor).unwrap();
    assert_eq!(back, doc);
}
