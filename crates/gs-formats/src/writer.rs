//! Versioned little-endian payload writer.

use alloc::vec::Vec;

/// Serializes a payload at a given version. The version is written first
/// so readers can gate fields on it.
pub struct VersionedWriter {
    data: Vec<u8>,
}

impl VersionedWriter {
    pub fn new(version: u32) -> Self {
        let mut writer = Self { data: Vec::new() };
        writer.write_u32(version);
        writer
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed string, truncated to 255 bytes.
    pub fn write_str(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(255);
        self.write_u8(len as u8);
        self.data.extend_from_slice(&bytes[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comes_first() {
        let writer = VersionedWriter::new(16);
        let data = writer.into_data();
        assert_eq!(data, [16, 0, 0, 0]);
    }

    #[test]
    fn values_are_little_endian() {
        let mut writer = VersionedWriter::new(0);
        writer.write_u16(0x1234);
        writer.write_i8(-1);
        let data = writer.into_data();
        assert_eq!(&data[4..], &[0x34, 0x12, 0xff]);
    }
}
