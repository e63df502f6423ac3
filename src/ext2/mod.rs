pub mod fs;
pub mod mkfs;
pub mod types;
pub mod users;

use std::time::{SystemTime, UNIX_EPOCH};

pub const EXT2_MAGIC: i32 = 0xEF53;
pub const FILESYSTEM_TYPE: i32 = 2;

pub const INODE_SIZE: i32 = 88;
pub const BLOCK_SIZE: i32 = 64;
pub const DIRECT_POINTERS: i32 = 12;
pub const POINTERS_PER_BLOCK: i32 = 16;

/// Highest block ordinal reachable per address mode: 12 direct, +16 through
/// single indirection, +256 through double, +4096 through triple.
pub const SINGLE_LIMIT: i32 = DIRECT_POINTERS + POINTERS_PER_BLOCK;
pub const DOUBLE_LIMIT: i32 = SINGLE_LIMIT + POINTERS_PER_BLOCK * POINTERS_PER_BLOCK;
pub const TRIPLE_LIMIT: i32 =
    DOUBLE_LIMIT + POINTERS_PER_BLOCK * POINTERS_PER_BLOCK * POINTERS_PER_BLOCK;

pub const ROOT_INODE: i32 = 0;
pub const NAME_LEN: usize = 12;

/// On-disk timestamps are Unix seconds stored as f32.
#[inline]
pub fn now() -> f32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as f32
}
