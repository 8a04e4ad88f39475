use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

/// Flat tag name → formatted value mapping.
pub type TagMap = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
}

/// Source of embedded image metadata.
pub trait MetadataReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagMap, MetadataError>;
}

/// Reads EXIF from JPEG, PNG, HEIF and TIFF-based RAW files.
///
/// Only the primary image IFD is reported. ASCII values are returned raw
/// (e.g. `2023:06:01 12:30:45`), everything else through the decoder's
/// display formatting.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl MetadataReader for ExifReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap, MetadataError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let exif = exif::Reader::new().read_from_container(&mut reader)?;

        let mut tags = TagMap::new();
        for field in exif.fields() {
            if field.ifd_num != exif::In::PRIMARY {
                continue;
            }
            tags.entry(field.tag.to_string())
                .or_insert_with(|| format_value(field));
        }
        Ok(tags)
    }
}

fn format_value(field: &exif::Field) -> String {
    match &field.value {
        exif::Value::Ascii(parts) => parts
            .first()
            .map(|raw| {
                String::from_utf8_lossy(raw)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .unwrap_or_default(),
        _ => field.display_value().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::exif_timestamp;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    const ASCII: u16 = 2;
    const LONG: u16 = 4;

    fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }

    /// Little-endian TIFF with `DateTimeOriginal` and `SubSecTimeOriginal`
    /// in the Exif IFD, and a `DateTime` only in the thumbnail IFD.
    fn tiff() -> Vec<u8> {
        const EXIF_IFD: u32 = 26;
        const ORIGINAL_DATA: u32 = 56;
        const THUMBNAIL_IFD: u32 = 76;
        const THUMBNAIL_DATA: u32 = 94;

        let mut out = b"II\x2a\x00".to_vec();
        out.extend_from_slice(&8u32.to_le_bytes());

        // IFD0: pointer to the Exif IFD.
        out.extend_from_slice(&1u16.to_le_bytes());
        entry(&mut out, 0x8769, LONG, 1, EXIF_IFD.to_le_bytes());
        out.extend_from_slice(&THUMBNAIL_IFD.to_le_bytes());

        // Exif IFD.
        out.extend_from_slice(&2u16.to_le_bytes());
        entry(&mut out, 0x9003, ASCII, 20, ORIGINAL_DATA.to_le_bytes());
        entry(&mut out, 0x9291, ASCII, 3, *b"45\0\0");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"2023:06:01 12:30:45\0");

        // IFD1 (thumbnail).
        out.extend_from_slice(&1u16.to_le_bytes());
        entry(&mut out, 0x0132, ASCII, 20, THUMBNAIL_DATA.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"1999:01:01 00:00:00\0");

        assert_eq!(out.len(), THUMBNAIL_DATA as usize + 20);
        out
    }

    fn jpeg_with_exif() -> Vec<u8> {
        let tiff = tiff();
        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    #[test]
    fn test_reads_primary_capture_tags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_0001.JPG");
        fs::write(&path, jpeg_with_exif()).unwrap();

        let tags = ExifReader.read_tags(&path).unwrap();
        assert_eq!(tags.get("DateTimeOriginal").unwrap(), "2023:06:01 12:30:45");
        assert_eq!(tags.get("SubSecTimeOriginal").unwrap(), "45");
        assert!(!tags.contains_key("DateTime"));

        let expected = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 45, 45)
            .unwrap();
        assert_eq!(exif_timestamp(&tags), Some(expected));
    }

    #[test]
    fn test_jpeg_without_exif_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();

        assert!(matches!(
            ExifReader.read_tags(&path),
            Err(MetadataError::Exif(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ExifReader.read_tags(&dir.path().join("gone.jpg")),
            Err(MetadataError::Io(_))
        ));
    }
}
