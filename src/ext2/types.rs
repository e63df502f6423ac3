//! On-disk structures of the filesystem proper: superblock, inode and the
//! three 64-byte block kinds. All records are packed little-endian with no
//! padding; sizes are asserted against the serialized form in the tests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use super::{now, NAME_LEN};
use crate::codec;
use crate::error::{FsError, FsResult};

pub const BITMAP_FREE: u8 = b'0';
pub const BITMAP_USED: u8 = b'1';

pub const KIND_DIR: u8 = b'0';
pub const KIND_FILE: u8 = b'1';

/// Descriptor at the start of a formatted partition. All stored offsets are
/// absolute byte positions in the host file; `first_ino` / `first_blo` are
/// bump-allocation hints that only ever move forward.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SuperBlock {
    pub filesystem_type: i32,
    pub inodes_count: i32,
    pub blocks_count: i32,
    pub free_inodes_count: i32,
    pub free_blocks_count: i32,
    pub mtime: f32,
    pub umtime: f32,
    pub mnt_count: i32,
    pub magic: i32,
    pub inode_size: i32,
    pub block_size: i32,
    pub first_ino: i32,
    pub first_blo: i32,
    pub bm_inode_start: i32,
    pub bm_block_start: i32,
    pub inode_start: i32,
    pub block_start: i32,
}

impl SuperBlock {
    pub const SIZE: i32 = 68;

    pub fn inode_offset(&self, index: i32) -> u64 {
        (self.inode_start + index * self.inode_size) as u64
    }

    pub fn block_offset(&self, index: i32) -> u64 {
        (self.block_start + index * self.block_size) as u64
    }

    /// Fill both bitmap regions with the free marker.
    pub fn create_bitmaps<P: AsRef<Path>>(&self, path: P) -> FsResult<()> {
        codec::write_bytes(
            &path,
            self.bm_inode_start as u64,
            &vec![BITMAP_FREE; self.inodes_count as usize],
        )?;
        codec::write_bytes(
            &path,
            self.bm_block_start as u64,
            &vec![BITMAP_FREE; self.blocks_count as usize],
        )
    }

    pub fn set_inode_bit<P: AsRef<Path>>(&self, path: P, index: i32) -> FsResult<()> {
        self.write_inode_bit(path, index, BITMAP_USED)
    }

    pub fn clear_inode_bit<P: AsRef<Path>>(&self, path: P, index: i32) -> FsResult<()> {
        self.write_inode_bit(path, index, BITMAP_FREE)
    }

    pub fn set_block_bit<P: AsRef<Path>>(&self, path: P, index: i32) -> FsResult<()> {
        self.write_block_bit(path, index, BITMAP_USED)
    }

    pub fn clear_block_bit<P: AsRef<Path>>(&self, path: P, index: i32) -> FsResult<()> {
        self.write_block_bit(path, index, BITMAP_FREE)
    }

    fn write_inode_bit<P: AsRef<Path>>(&self, path: P, index: i32, bit: u8) -> FsResult<()> {
        if index < 0 || index >= self.inodes_count {
            return Err(FsError::Format(format!(
                "inode bitmap index {index} out of range (count {})",
                self.inodes_count
            )));
        }
        codec::write_bytes(path, (self.bm_inode_start + index) as u64, &[bit])
    }

    fn write_block_bit<P: AsRef<Path>>(&self, path: P, index: i32, bit: u8) -> FsResult<()> {
        if index < 0 || index >= self.blocks_count {
            return Err(FsError::Format(format!(
                "block bitmap index {index} out of range (count {})",
                self.blocks_count
            )));
        }
        codec::write_bytes(path, (self.bm_block_start + index) as u64, &[bit])
    }
}

/// 88-byte inode: 12 direct pointers plus single/double/triple indirect at
/// slots 12/13/14, `-1` in unused slots.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Inode {
    pub uid: i32,
    pub gid: i32,
    pub size: i32,
    pub atime: f32,
    pub ctime: f32,
    pub mtime: f32,
    pub block: [i32; 15],
    pub kind: u8,
    pub perm: [u8; 3],
}

impl Inode {
    pub const SIZE: i32 = 88;

    pub fn new(kind: u8, uid: i32, gid: i32, size: i32, perm: [u8; 3]) -> Self {
        let stamp = now();
        Self {
            uid,
            gid,
            size,
            atime: stamp,
            ctime: stamp,
            mtime: stamp,
            block: [-1; 15],
            kind,
            perm,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == KIND_DIR
    }

    pub fn is_file(&self) -> bool {
        self.kind == KIND_FILE
    }

    pub fn touch(&mut self) {
        let stamp = now();
        self.atime = stamp;
        self.mtime = stamp;
    }
}

/// One of the four 16-byte slots of a folder block. A free slot carries
/// `inode == -1`; names are zero-padded and trimmed of trailing NULs on read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: [u8; NAME_LEN],
    pub inode: i32,
}

impl FolderEntry {
    pub fn free() -> Self {
        Self {
            name: [0; NAME_LEN],
            inode: -1,
        }
    }

    pub fn named(name: &str, inode: i32) -> Self {
        let mut entry = Self {
            name: [0; NAME_LEN],
            inode,
        };
        let bytes = name.as_bytes();
        entry.name[..bytes.len()].copy_from_slice(bytes);
        entry
    }

    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name)
            .trim_end_matches('\0')
            .to_string()
    }

    pub fn is_free(&self) -> bool {
        self.inode == -1
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FolderBlock {
    pub entries: [FolderEntry; 4],
}

impl FolderBlock {
    pub const SIZE: i32 = 64;

    pub fn empty() -> Self {
        Self {
            entries: [FolderEntry::free(); 4],
        }
    }

    /// First data block of a fresh directory: `.` pointing at the directory
    /// itself and `..` at its parent (the root is its own parent).
    pub fn first_of_dir(own_inode: i32, parent_inode: i32) -> Self {
        let mut block = Self::empty();
        block.entries[0] = FolderEntry::named(".", own_inode);
        block.entries[1] = FolderEntry::named("..", parent_inode);
        block
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileBlock {
    #[serde(with = "BigArray")]
    pub content: [u8; 64],
}

impl FileBlock {
    pub const SIZE: i32 = 64;

    pub fn empty() -> Self {
        Self { content: [0; 64] }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PointerBlock {
    pub pointers: [i32; 16],
}

impl PointerBlock {
    pub const SIZE: i32 = 64;

    pub fn empty() -> Self {
        Self { pointers: [-1; 16] }
    }
}
