//! An ext2-style filesystem hosted inside a regular file that emulates a
//! block device: MBR partitioning with primary, extended and logical
//! partitions, mount bookkeeping, and directory/file engines operating on a
//! partition's byte range. Command parsing and report rendering live in
//! external collaborators; this crate exposes the volume operations they
//! invoke.

pub mod codec;
pub mod error;
pub mod ext2;
pub mod mbr;
pub mod mount;
pub mod session;
pub mod vdisk;

pub use error::{FsError, FsResult};
pub use ext2::fs::{Ext2Fs, FileContent};
pub use mount::MountTable;
pub use session::Session;
pub use vdisk::VDisk;
