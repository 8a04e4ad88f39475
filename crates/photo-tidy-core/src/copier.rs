//! Streamed, non-clobbering file copy.
//!
//! The destination is written in place, not via a temp file and rename, so a
//! copy that fails halfway can leave a truncated file behind. A later run
//! then sees it as `AlreadyExists`.

use crate::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_BUFFER_SIZE: usize = 2048 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(u64),
    AlreadyExists,
}

/// Copy `src` to `dst`, creating the parent directories of `dst`.
///
/// An existing `dst` is never overwritten and is reported as
/// [`CopyOutcome::AlreadyExists`] instead of an error.
pub fn copy_file(src: &Path, dst: &Path, buffer_size: usize) -> Result<CopyOutcome, Error> {
    if dst.symlink_metadata().is_ok() {
        return Ok(CopyOutcome::AlreadyExists);
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    let source_meta = fs::metadata(src)?;
    if !source_meta.is_file() {
        return Err(Error::NotRegularFile(src.to_path_buf()));
    }

    let mut source = File::open(src)?;
    let mut destination = match OpenOptions::new().write(true).create_new(true).open(dst) {
        Ok(file) => file,
        // Lost a race with another writer between the check above and here.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(CopyOutcome::AlreadyExists)
        }
        Err(e) => return Err(e.into()),
    };

    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut written = 0u64;
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        destination.write_all(&buf[..n])?;
        written += n as u64;
    }
    destination.flush()?;

    info!("Copied file successfully: {}, {}", src.display(), dst.display());
    debug!("{} bytes written to {}", written, dst.display());
    Ok(CopyOutcome::Copied(written))
}
