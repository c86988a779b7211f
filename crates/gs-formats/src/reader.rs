//! Versioned little-endian payload reader.

use alloc::string::String;

use crate::FormatError;

/// Cursor over a versioned payload. The `*_since` readers return the
/// provided default without consuming bytes when the file predates the
/// field.
pub struct VersionedReader<'a> {
    data: &'a [u8],
    pos: usize,
    version: u32,
}

impl<'a> VersionedReader<'a> {
    /// Read the leading version. `latest` guards against files from a
    /// newer build.
    pub fn new(data: &'a [u8], latest: u32) -> Result<Self, FormatError> {
        let mut reader = Self { data, pos: 0, version: 0 };
        reader.version = reader.read_u32()?;
        if reader.version > latest {
            return Err(FormatError::UnsupportedVersion);
        }
        Ok(reader)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        if self.pos >= self.data.len() {
            return Err(FormatError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8, FormatError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, FormatError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, FormatError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&mut self) -> Result<f32, FormatError> {
        let bytes = self.read_bytes(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_str(&mut self) -> Result<String, FormatError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a `u8` only if the file version includes the field.
    pub fn read_u8_since(&mut self, added_in: u32, default: u8) -> Result<u8, FormatError> {
        if self.version >= added_in {
            self.read_u8()
        } else {
            Ok(default)
        }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.pos + len > self.data.len() {
            return Err(FormatError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VersionedWriter;

    #[test]
    fn round_trip() {
        let mut writer = VersionedWriter::new(7);
        writer.write_u8(42);
        writer.write_i8(-3);
        writer.write_u16(1000);
        writer.write_f32(1.5);
        writer.write_str("hello");
        let data = writer.into_data();

        let mut reader = VersionedReader::new(&data, 10).unwrap();
        assert_eq!(reader.version(), 7);
        assert_eq!(reader.read_u8().unwrap(), 42);
        assert_eq!(reader.read_i8().unwrap(), -3);
        assert_eq!(reader.read_u16().unwrap(), 1000);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_str().unwrap(), "hello");
    }

    #[test]
    fn newer_version_rejected() {
        let writer = VersionedWriter::new(99);
        let data = writer.into_data();
        assert!(matches!(
            VersionedReader::new(&data, 10),
            Err(FormatError::UnsupportedVersion)
        ));
    }

    #[test]
    fn versioned_field_defaults_on_old_files() {
        let mut writer = VersionedWriter::new(5);
        writer.write_u8(1);
        let data = writer.into_data();

        let mut reader = VersionedReader::new(&data, 10).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 1);
        // Field added in version 6: absent here, default applies.
        assert_eq!(reader.read_u8_since(6, 9).unwrap(), 9);
    }

    #[test]
    fn truncated_payload_errors() {
        let mut writer = VersionedWriter::new(1);
        writer.write_u8(1);
        let data = writer.into_data();
        let mut reader = VersionedReader::new(&data, 10).unwrap();
        let _ = reader.read_u8();
        assert_eq!(reader.read_u32(), Err(FormatError::UnexpectedEof));
    }
}
