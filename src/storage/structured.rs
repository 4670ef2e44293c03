//! Checksummed binary reader and writer for index files.
//!
//! Every file written through [`StructWriter`] ends with a little-endian
//! CRC32 of all preceding bytes. [`StructReader`] loads the whole file,
//! verifies that footer and then decodes from memory.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{NotedexError, Result};
use crate::storage::{Storage, StorageOutput};
use crate::util::varint;

const FOOTER_LEN: usize = 4;

/// Tracks position and checksum of everything written through it.
struct HashingOutput {
    inner: Box<dyn StorageOutput>,
    hasher: crc32fast::Hasher,
    position: u64,
}

impl std::fmt::Debug for HashingOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingOutput")
            .field("inner", &self.inner)
            .field("position", &self.position)
            .finish()
    }
}

impl Write for HashingOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Typed binary writer over a [`StorageOutput`].
#[derive(Debug)]
pub struct StructWriter {
    output: HashingOutput,
    closed: bool,
}

impl StructWriter {
    pub fn new(output: Box<dyn StorageOutput>) -> Self {
        StructWriter {
            output: HashingOutput {
                inner: output,
                hasher: crc32fast::Hasher::new(),
                position: 0,
            },
            closed: false,
        }
    }

    /// Number of payload bytes written so far.
    pub fn position(&self) -> u64 {
        self.output.position
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.output.write_u8(value)?;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.output.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.output.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.output.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.output.write_f64::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let mut buf = Vec::with_capacity(varint::MAX_VARINT_LEN);
        varint::encode_u64_into(value, &mut buf);
        self.output.write_all(&buf)?;
        Ok(())
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Length-prefixed byte slice.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.output.write_all(value)?;
        Ok(())
    }

    /// Raw bytes without a length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.output.write_all(value)?;
        Ok(())
    }

    /// Append the checksum footer, sync and close the output.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let checksum = self.output.hasher.clone().finalize();
        self.output
            .inner
            .write_u32::<LittleEndian>(checksum)?;
        self.output.inner.close()?;
        self.closed = true;
        Ok(())
    }
}

/// Typed binary reader over a checksum-verified file.
#[derive(Debug)]
pub struct StructReader {
    name: String,
    cursor: Cursor<Vec<u8>>,
}

impl StructReader {
    /// Load `name` from storage and verify its checksum.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let bytes = storage.read_all(name)?;
        Self::from_bytes(name, bytes)
    }

    pub fn from_bytes(name: &str, mut bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < FOOTER_LEN {
            return Err(NotedexError::corrupt(format!(
                "{name}: file too short ({} bytes)",
                bytes.len()
            )));
        }

        let body_len = bytes.len() - FOOTER_LEN;
        let mut footer = &bytes[body_len..];
        let expected = footer.read_u32::<LittleEndian>()?;
        let actual = crc32fast::hash(&bytes[..body_len]);
        if expected != actual {
            return Err(NotedexError::corrupt(format!(
                "{name}: checksum mismatch (expected {expected:08x}, found {actual:08x})"
            )));
        }

        bytes.truncate(body_len);
        Ok(StructReader {
            name: name.to_string(),
            cursor: Cursor::new(bytes),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The verified payload, without the footer.
    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> u64 {
        self.cursor.get_ref().len() as u64 - self.cursor.position()
    }

    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute payload offset.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.cursor.get_ref().len() as u64 {
            return Err(self.truncated());
        }
        self.cursor.set_position(position);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.truncated())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| self.truncated())
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.cursor.position() as usize;
        let (value, consumed) = varint::decode_u64(&self.cursor.get_ref()[start..])
            .map_err(|e| NotedexError::corrupt(format!("{}: {e}", self.name)))?;
        self.cursor.set_position((start + consumed) as u64);
        Ok(value)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()?;
        if len > self.remaining() {
            return Err(self.truncated());
        }
        let mut buf = vec![0u8; len as usize];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| NotedexError::corrupt(format!("{}: invalid UTF-8: {e}", self.name)))
    }

    fn truncated(&self) -> NotedexError {
        NotedexError::corrupt(format!(
            "{}: unexpected end of data at offset {}",
            self.name,
            self.cursor.position()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    #[test]
    fn test_typed_values_survive_close_and_open() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());

        let mut writer = StructWriter::new(storage.create_output("seg.docs").unwrap());
        writer.write_u8(7).unwrap();
        writer.write_u32(0xDEADBEEF).unwrap();
        writer.write_varint(300).unwrap();
        writer.write_string("postBody").unwrap();
        writer.write_f32(1.5).unwrap();
        assert_eq!(writer.position(), 1 + 4 + 2 + 9 + 4);
        writer.close().unwrap();

        let mut reader = StructReader::open(&storage, "seg.docs").unwrap();
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_varint().unwrap(), 300);
        assert_eq!(reader.read_string().unwrap(), "postBody");
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert!(reader.is_eof());
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_checksum_mismatch_is_corrupt() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        let mut writer = StructWriter::new(storage.create_output("seg.post").unwrap());
        writer.write_u64(42).unwrap();
        writer.close().unwrap();

        let mut bytes = storage.read_all("seg.post").unwrap();
        bytes[0] ^= 0xFF;
        storage.replace_file_bytes("seg.post", bytes);

        let err = StructReader::open(&storage, "seg.post").unwrap_err();
        assert!(matches!(err, NotedexError::Corrupt(_)));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        assert!(matches!(
            StructReader::from_bytes("x", vec![1, 2]),
            Err(NotedexError::Corrupt(_))
        ));
    }
}
