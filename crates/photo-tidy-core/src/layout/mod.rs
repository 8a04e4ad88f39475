//! Where a file ends up in the archive.
//!
//! [`PathBuilder`] turns a capture time, device label and album into
//! `root/YYYY/MM/device/album/YYYYMMDD-HHMMSSmmm.ext`; [`DeviceNameMap`]
//! decides the device label from the source path.

mod device;
mod path;

pub use self::device::DeviceNameMap;
pub use self::path::{AlbumRule, AlbumRules, PathBuilder, RECENTS_ALBUM};
