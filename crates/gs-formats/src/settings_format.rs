//! Settings file payload: the calibration table.

use alloc::vec::Vec;

use gs_model::{Settings, CALIBRATION_ITEMS, TRACK_COUNT};

use crate::reader::VersionedReader;
use crate::writer::VersionedWriter;
use crate::{read_header, write_header, FileType, FormatError};

/// Version written by this build.
pub const SETTINGS_VERSION: u32 = 0;

/// Serialize settings to a complete file image.
pub fn write_settings(settings: &Settings) -> Vec<u8> {
    let mut writer = VersionedWriter::new(SETTINGS_VERSION);

    for output in 0..TRACK_COUNT {
        let calibration = settings.calibration().cv_output(output);
        for item in 0..CALIBRATION_ITEMS {
            writer.write_i16(calibration.item(item));
        }
    }

    let mut data = Vec::new();
    write_header(&mut data, FileType::Settings);
    data.extend_from_slice(&writer.into_data());
    data
}

/// Parse a complete settings file image.
pub fn read_settings(data: &[u8]) -> Result<Settings, FormatError> {
    let payload = read_header(data, FileType::Settings)?;
    let mut reader = VersionedReader::new(payload, SETTINGS_VERSION)?;

    let mut settings = Settings::new();
    for output in 0..TRACK_COUNT {
        let calibration = settings.calibration_mut().cv_output_mut(output);
        for item in 0..CALIBRATION_ITEMS {
            calibration.set_item(item, i32::from(reader.read_i16()?));
        }
    }
    Ok(settings)
}
