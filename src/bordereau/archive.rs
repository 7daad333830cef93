//! File naming and ZIP packaging

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// "bordereau_2024_03.csv"
pub fn generate_file_name(month: u32, year: i32) -> String {
    format!("bordereau_{}_{:02}.csv", year, month)
}

/// "bordereau_2024_03.zip"
pub fn bordereau_zip_file_name(month: u32, year: i32) -> String {
    format!("bordereau_{}_{:02}.zip", year, month)
}

pub fn polices_file_name(month: u32, year: i32) -> String {
    format!("polices_{}_{:02}.csv", year, month)
}

pub fn quittances_file_name(month: u32, year: i32) -> String {
    format!("quittances_{}_{:02}.csv", year, month)
}

/// Pack named entries into one archive at maximum deflate compression
///
/// The archive is accumulated in memory and only returned once finalized.
/// Entry timestamps are pinned so identical entries give identical bytes.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }
    Ok(writer.finish()?.into_inner())
}
