//! Format a mounted partition: size the inode and block tables, write the
//! superblock and bitmaps, and bootstrap the root directory with the
//! initial `/users.txt`.

use std::path::PathBuf;

use tracing::info;

use super::fs::Ext2Fs;
use super::types::{FileBlock, FolderBlock, FolderEntry, Inode, SuperBlock, KIND_DIR, KIND_FILE};
use super::{now, EXT2_MAGIC, FILESYSTEM_TYPE};
use crate::error::{FsError, FsResult};
use crate::mount::MountedPartition;

/// Accounts seeded at format time; the root password is the login used by
/// every fresh volume.
pub const USERS_SEED: &str = "1,G,root\n1,U,root,root,123\n";

/// A partition of size S holds `n` inodes and `3n` blocks where every inode
/// costs its record plus one bitmap byte, and every block its record plus
/// one bitmap byte:
/// `n = (S - sizeof(SuperBlock)) / (4 + sizeof(Inode) + 3 * sizeof(FileBlock))`.
pub fn calculate_inode_count(partition_size: i32) -> i32 {
    (partition_size - SuperBlock::SIZE) / (4 + Inode::SIZE + 3 * FileBlock::SIZE)
}

/// `mkfs` on an explicit byte range of the host file.
pub fn make<P: Into<PathBuf>>(path: P, part_start: i32, part_size: i32) -> FsResult<Ext2Fs> {
    let path = path.into();
    let n = calculate_inode_count(part_size);
    if n < 2 {
        return Err(FsError::NoSpace(format!(
            "partition of {part_size} bytes is too small to format"
        )));
    }

    let stamp = now();
    let bm_inode_start = part_start + SuperBlock::SIZE;
    let bm_block_start = bm_inode_start + n;
    let inode_start = bm_block_start + 3 * n;
    let block_start = inode_start + n * Inode::SIZE;
    let sb = SuperBlock {
        filesystem_type: FILESYSTEM_TYPE,
        inodes_count: n,
        blocks_count: 3 * n,
        free_inodes_count: n,
        free_blocks_count: 3 * n,
        mtime: stamp,
        umtime: stamp,
        mnt_count: 1,
        magic: EXT2_MAGIC,
        inode_size: Inode::SIZE,
        block_size: FileBlock::SIZE,
        first_ino: inode_start,
        first_blo: block_start,
        bm_inode_start,
        bm_block_start,
        inode_start,
        block_start,
    };
    sb.create_bitmaps(&path)?;

    let mut fs = Ext2Fs::with_superblock(path, part_start, sb);

    // Root directory, inode 0, self-parented.
    let root_index = fs.allocate_inode()?;
    let root_block = fs.allocate_block()?;
    let mut root = Inode::new(KIND_DIR, 1, 1, 0, *b"777");
    root.block[0] = root_block;
    fs.write_inode(root_index, &root)?;
    fs.write_folder_block(root_block, &FolderBlock::first_of_dir(root_index, root_index))?;

    // /users.txt with the seed accounts.
    let users_index = fs.allocate_inode()?;
    let users_block = fs.allocate_block()?;
    let mut users = Inode::new(KIND_FILE, 1, 1, USERS_SEED.len() as i32, *b"777");
    users.block[0] = users_block;
    fs.write_inode(users_index, &users)?;
    let mut block = FileBlock::empty();
    block.content[..USERS_SEED.len()].copy_from_slice(USERS_SEED.as_bytes());
    fs.write_file_block(users_block, &block)?;

    let mut root_dir = fs.read_folder_block(root_block)?;
    root_dir.entries[2] = FolderEntry::named("users.txt", users_index);
    fs.write_folder_block(root_block, &root_dir)?;

    fs.save_superblock()?;
    info!(inodes = n, blocks = 3 * n, part_start, "partition formatted");
    Ok(fs)
}

/// `mkfs -id=<id>`: format the partition behind a mount-table entry.
pub fn make_mounted(partition: &MountedPartition) -> FsResult<Ext2Fs> {
    make(&partition.path, partition.start, partition.size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::ext2::types::{BITMAP_FREE, BITMAP_USED};
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn capacity_formula() {
        // 1 MiB: (1048576 - 68) / 284
        assert_eq!(calculate_inode_count(1024 * 1024), 3691);
        assert_eq!(calculate_inode_count(68 + 284), 1);
        assert_eq!(calculate_inode_count(68 + 2 * 284), 2);
    }

    #[test]
    fn format_lays_out_the_regions_in_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("vol.dsk");
        std::fs::File::create(&path)?.set_len(1024 * 1024)?;

        let fs = make(&path, 0, 1024 * 1024)?;
        let sb = fs.superblock();
        let n = sb.inodes_count;
        assert_eq!(sb.magic, EXT2_MAGIC);
        assert_eq!(sb.blocks_count, 3 * n);
        assert_eq!(sb.bm_inode_start, SuperBlock::SIZE);
        assert_eq!(sb.bm_block_start, sb.bm_inode_start + n);
        assert_eq!(sb.inode_start, sb.bm_block_start + 3 * n);
        assert_eq!(sb.block_start, sb.inode_start + n * Inode::SIZE);

        // Root and users.txt consume the first two inodes and blocks.
        assert_eq!(sb.free_inodes_count, n - 2);
        assert_eq!(sb.free_blocks_count, 3 * n - 2);
        assert_eq!(sb.first_ino, sb.inode_start + 2 * Inode::SIZE);
        assert_eq!(sb.first_blo, sb.block_start + 2 * FileBlock::SIZE);

        let inode_map = codec::read_bytes(&path, sb.bm_inode_start as u64, n as usize)?;
        assert_eq!(&inode_map[..3], &[BITMAP_USED, BITMAP_USED, BITMAP_FREE]);
        Ok(())
    }

    #[test]
    fn users_file_is_bootstrapped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("vol.dsk");
        std::fs::File::create(&path)?.set_len(512 * 1024)?;

        let fs = make(&path, 2048, 256 * 1024)?;
        let (index, inode) = fs.resolve("/users.txt")?;
        assert_eq!(index, 1);
        assert!(inode.is_file());
        assert_eq!(inode.size, USERS_SEED.len() as i32);
        assert_eq!(fs.read_file("/users.txt")?, USERS_SEED.as_bytes());
        Ok(())
    }

    #[test]
    fn tiny_partitions_cannot_be_formatted() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("vol.dsk");
        std::fs::File::create(&path)?.set_len(4096)?;
        assert!(matches!(
            make(&path, 0, 300),
            Err(crate::error::FsError::NoSpace(_))
        ));
        Ok(())
    }
}
