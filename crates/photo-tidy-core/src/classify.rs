use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of leading bytes inspected when sniffing a file.
pub const HEADER_LEN: usize = 261;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Jpeg,
    Png,
    Heif,
    Cr2,
    Mov,
}

impl MediaKind {
    pub fn is_image(self) -> bool {
        !self.is_video()
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Mov)
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaKind::Jpeg => "image/jpeg",
            MediaKind::Png => "image/png",
            MediaKind::Heif => "image/heif",
            MediaKind::Cr2 => "image/x-canon-cr2",
            MediaKind::Mov => "video/quicktime",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Supported(MediaKind),
    Unsupported,
}

/// Sniff the header of `path`. Failing to open or read the file is an error;
/// an unknown signature is not.
pub fn classify(path: &Path) -> io::Result<Classification> {
    let mut file = File::open(path)?;
    let header = read_header(&mut file)?;
    Ok(match sniff(&header) {
        Some(kind) => Classification::Supported(kind),
        None => Classification::Unsupported,
    })
}

fn read_header(reader: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    reader.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Match a header prefix against the supported signatures.
pub fn sniff(buf: &[u8]) -> Option<MediaKind> {
    if is_jpeg(buf) {
        Some(MediaKind::Jpeg)
    } else if is_png(buf) {
        Some(MediaKind::Png)
    } else if is_cr2(buf) {
        Some(MediaKind::Cr2)
    } else if is_heif(buf) {
        Some(MediaKind::Heif)
    } else if is_mov(buf) {
        Some(MediaKind::Mov)
    } else {
        None
    }
}

fn is_jpeg(buf: &[u8]) -> bool {
    buf.starts_with(&[0xFF, 0xD8, 0xFF])
}

fn is_png(buf: &[u8]) -> bool {
    buf.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}

// TIFF header in either byte order, with the Canon "CR" marker at offset 8.
fn is_cr2(buf: &[u8]) -> bool {
    buf.len() > 10
        && (buf.starts_with(b"II*\0") || buf.starts_with(b"MM\0*"))
        && &buf[8..10] == b"CR"
}

const HEIF_BRANDS: [&[u8; 4]; 6] = [b"heic", b"heix", b"hevc", b"hevx", b"mif1", b"msf1"];

fn is_heif(buf: &[u8]) -> bool {
    buf.len() >= 12 && &buf[4..8] == b"ftyp" && HEIF_BRANDS.iter().any(|b| &buf[8..12] == *b)
}

const MOV_LEADING_BOXES: [&[u8; 4]; 5] = [b"moov", b"mdat", b"wide", b"free", b"skip"];

fn is_mov(buf: &[u8]) -> bool {
    if buf.len() < 12 {
        return false;
    }
    if &buf[4..8] == b"ftyp" {
        return &buf[8..12] == b"qt  ";
    }
    MOV_LEADING_BOXES.iter().any(|b| &buf[4..8] == *b)
        || (buf.len() >= 16 && &buf[12..16] == b"mdat")
}
