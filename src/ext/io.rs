//! Extensions for [std::io].
use std::io::*;

pub trait ReadExt {
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>>;
}

impl<T: Read + ?Sized> ReadExt for T {
    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

pub trait SeekExt {
    /// Returns the total length of the stream. The current position is left unchanged.
    fn stream_length(&mut self) -> Result<u64>;
    /// Returns the number of bytes between the current position and the end of the stream.
    fn remaining_len(&mut self) -> Result<u64>;
}

impl<T: Seek + ?Sized> SeekExt for T {
    fn stream_length(&mut self) -> Result<u64> {
        let current_pos = self.stream_position()?;
        let len = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(current_pos))?;
        Ok(len)
    }

    fn remaining_len(&mut self) -> Result<u64> {
        let current_pos = self.stream_position()?;
        let len = self.stream_length()?;
        Ok(len.saturating_sub(current_pos))
    }
}

/// A seekable reader over a borrowed byte slice.
pub struct MemReaderRef<'a> {
    data: &'a [u8],
    pos: usize,
}

impl std::fmt::Debug for MemReaderRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemReaderRef")
            .field("pos", &self.pos)
            .field("data_length", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl<'a> MemReaderRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        MemReaderRef { data, pos: 0 }
    }
}

impl<'a> Read for MemReaderRef<'a> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.data.len() {
            return Ok(0);
        }
        let bytes_to_read = buf.len().min(self.data.len() - self.pos);
        buf[..bytes_to_read].copy_from_slice(&self.data[self.pos..self.pos + bytes_to_read]);
        self.pos += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl<'a> Seek for MemReaderRef<'a> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::Start(offset) => {
                if offset > self.data.len() as u64 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "Seek position is beyond the end of the data",
                    ));
                }
                self.pos = offset as usize;
            }
            SeekFrom::End(offset) => {
                let end_pos = self.data.len() as i64 + offset;
                if end_pos < 0 || end_pos > self.data.len() as i64 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "Seek from end is outside of the data",
                    ));
                }
                self.pos = end_pos as usize;
            }
            SeekFrom::Current(offset) => {
                let new_pos = self.pos as i64 + offset;
                if new_pos < 0 || new_pos > self.data.len() as i64 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "Seek position is outside of the data",
                    ));
                }
                self.pos = new_pos as usize;
            }
        }
        Ok(self.pos as u64)
    }

    fn stream_position(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }
}

#[test]
fn test_mem_reader_remaining() {
    let data = [1u8, 2, 3, 4, 5];
    let mut reader = MemReaderRef::new(&data);
    assert_eq!(reader.read_exact_vec(2).unwrap(), vec![1, 2]);
    assert_eq!(reader.remaining_len().unwrap(), 3);
    assert_eq!(reader.stream_position().unwrap(), 2);
    assert!(reader.seek(SeekFrom::Current(-3)).is_err());
    assert!(reader.read_exact_vec(4).is_err());
}
