//! Minimal QuickTime box walker for the movie creation time.
//!
//! Top-level boxes are skipped until `moov` is found. The parser expects the
//! `mvhd` header box to be the first child of `moov` and does not descend the
//! box tree any further than that.

use chrono::{DateTime, Utc};
use std::io::{self, Read, Seek, SeekFrom};
use thiserror::Error;

/// Seconds between 1904-01-01 and 1970-01-01.
pub const APPLE_EPOCH_OFFSET: i64 = 2_082_844_800;

const MOVIE_RESOURCE: &[u8; 4] = b"moov";
const MOVIE_HEADER: &[u8; 4] = b"mvhd";
const HEADER_LEN: u64 = 8;

#[derive(Error, Debug)]
pub enum AtomError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("did not find movie header atom")]
    MovieHeaderNotFound,

    #[error("malformed {kind} box with size {size}")]
    MalformedBox { kind: String, size: u64 },

    #[error("movie header carries no creation time")]
    MissingCreationTime,

    #[error("creation time {0} is out of range")]
    OutOfRange(i64),
}

struct BoxHeader {
    size: u64,
    kind: [u8; 4],
    header_len: u64,
}

impl BoxHeader {
    fn read(reader: &mut impl Read) -> Result<Self, AtomError> {
        let mut buf = [0u8; HEADER_LEN as usize];
        reader.read_exact(&mut buf)?;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(&buf[4..8]);
        let mut header = BoxHeader {
            size: u64::from(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
            kind,
            header_len: HEADER_LEN,
        };

        // Size 1 means a 64-bit size follows the type.
        if header.size == 1 {
            let mut large = [0u8; 8];
            reader.read_exact(&mut large)?;
            header.size = u64::from_be_bytes(large);
            header.header_len += 8;
        }
        Ok(header)
    }

    fn kind_name(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }

    fn body_len(&self) -> Result<u64, AtomError> {
        self.size
            .checked_sub(self.header_len)
            .ok_or_else(|| AtomError::MalformedBox {
                kind: self.kind_name(),
                size: self.size,
            })
    }
}

/// Read the `mvhd` creation time from a QuickTime/MP4 stream positioned at
/// its first box.
pub fn creation_time<R: Read + Seek>(reader: &mut R) -> Result<DateTime<Utc>, AtomError> {
    loop {
        let header = BoxHeader::read(reader)?;
        if &header.kind == MOVIE_RESOURCE {
            break;
        }
        // Size 0 runs to the end of the stream, so there is nothing after it.
        if header.size == 0 {
            return Err(AtomError::MalformedBox {
                kind: header.kind_name(),
                size: 0,
            });
        }
        let skip = header.body_len()?;
        let skip = i64::try_from(skip).map_err(|_| AtomError::MalformedBox {
            kind: header.kind_name(),
            size: header.size,
        })?;
        reader.seek(SeekFrom::Current(skip))?;
    }

    let header = BoxHeader::read(reader)?;
    if &header.kind != MOVIE_HEADER {
        return Err(AtomError::MovieHeaderNotFound);
    }

    // version(1) flags(3) creation_time(4, or 8 for version 1)
    let mut prefix = [0u8; 8];
    reader.read_exact(&mut prefix)?;
    let seconds = if prefix[0] == 1 {
        let mut low = [0u8; 4];
        reader.read_exact(&mut low)?;
        let mut wide = [0u8; 8];
        wide[..4].copy_from_slice(&prefix[4..8]);
        wide[4..].copy_from_slice(&low);
        u64::from_be_bytes(wide)
    } else {
        u64::from(u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]))
    };

    if seconds == 0 {
        return Err(AtomError::MissingCreationTime);
    }
    let seconds = i64::try_from(seconds).map_err(|_| AtomError::OutOfRange(i64::MAX))?;
    let unix = seconds - APPLE_EPOCH_OFFSET;
    DateTime::<Utc>::from_timestamp(unix, 0).ok_or(AtomError::OutOfRange(unix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn box_bytes(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    fn mvhd_v0(creation: u32) -> Vec<u8> {
        let mut body = vec![0u8, 0, 0, 0];
        body.extend_from_slice(&creation.to_be_bytes());
        body.extend_from_slice(&[0u8; 92]);
        box_bytes(b"mvhd", &body)
    }

    fn movie(leading: &[u8], mvhd: Vec<u8>) -> Vec<u8> {
        let mut data = leading.to_vec();
        data.extend(box_bytes(b"moov", &mvhd));
        data
    }

    #[test]
    fn test_creation_time_converts_apple_epoch() {
        let creation = (APPLE_EPOCH_OFFSET + 1_000_000_000) as u32;
        let data = movie(&[], mvhd_v0(creation));

        let time = creation_time(&mut Cursor::new(data)).unwrap();
        assert_eq!(time.timestamp(), 1_000_000_000);
    }

    #[test]
    fn test_skips_leading_boxes() {
        let mut leading = box_bytes(b"ftyp", b"qt  \0\0\0\0qt  ");
        leading.extend(box_bytes(b"wide", &[]));
        leading.extend(box_bytes(b"mdat", &[7u8; 300]));
        let creation = (APPLE_EPOCH_OFFSET + 1_500_000_000) as u32;

        let time = creation_time(&mut Cursor::new(movie(&leading, mvhd_v0(creation)))).unwrap();
        assert_eq!(time.timestamp(), 1_500_000_000);
    }

    #[test]
    fn test_extended_size_box_is_skipped() {
        let mut leading = 1u32.to_be_bytes().to_vec();
        leading.extend_from_slice(b"mdat");
        leading.extend_from_slice(&(16u64 + 4).to_be_bytes());
        leading.extend_from_slice(&[1, 2, 3, 4]);
        let creation = (APPLE_EPOCH_OFFSET + 42) as u32;

        let time = creation_time(&mut Cursor::new(movie(&leading, mvhd_v0(creation)))).unwrap();
        assert_eq!(time.timestamp(), 42);
    }

    #[test]
    fn test_version_one_header() {
        let mut body = vec![1u8, 0, 0, 0];
        body.extend_from_slice(&((APPLE_EPOCH_OFFSET + 1_000_000_000) as u64).to_be_bytes());
        body.extend_from_slice(&[0u8; 100]);
        let data = movie(&[], box_bytes(b"mvhd", &body));

        let time = creation_time(&mut Cursor::new(data)).unwrap();
        assert_eq!(time.timestamp(), 1_000_000_000);
    }

    #[test]
    fn test_moov_without_leading_mvhd() {
        let data = movie(&[], box_bytes(b"trak", &[0u8; 16]));
        assert!(matches!(
            creation_time(&mut Cursor::new(data)),
            Err(AtomError::MovieHeaderNotFound)
        ));
    }

    #[test]
    fn test_stream_without_moov() {
        let data = box_bytes(b"ftyp", b"isom");
        assert!(matches!(
            creation_time(&mut Cursor::new(data)),
            Err(AtomError::Io(_))
        ));
    }

    #[test]
    fn test_zero_creation_time() {
        let data = movie(&[], mvhd_v0(0));
        assert!(matches!(
            creation_time(&mut Cursor::new(data)),
            Err(AtomError::MissingCreationTime)
        ));
    }

    #[test]
    fn test_undersized_box() {
        let mut data = 4u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"free");
        assert!(matches!(
            creation_time(&mut Cursor::new(data)),
            Err(AtomError::MalformedBox { .. })
        ));
    }
}
