//! Core engine over one formatted partition: record i/o, the bump
//! allocator, the path resolver, and the directory and file operations.
//! Every mutating operation ends by re-serializing the superblock at the
//! partition start.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{
    FileBlock, FolderBlock, FolderEntry, Inode, PointerBlock, SuperBlock, KIND_DIR, KIND_FILE,
};
use super::{DIRECT_POINTERS, DOUBLE_LIMIT, EXT2_MAGIC, NAME_LEN, POINTERS_PER_BLOCK, ROOT_INODE,
    SINGLE_LIMIT, TRIPLE_LIMIT};
use crate::codec;
use crate::error::{FsError, FsResult};
use crate::session::Session;

/// Payload of a new file: an explicit byte string (the `-cont` flag, read
/// from a host file by the caller) or a generated size (`-size`), which
/// materializes as the digit cycle `0..9` repeated.
#[derive(Debug, Clone)]
pub enum FileContent {
    Size(i32),
    Bytes(Vec<u8>),
}

impl FileContent {
    pub fn from_host<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        Ok(Self::Bytes(std::fs::read(path)?))
    }

    fn materialize(self) -> FsResult<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Size(n) if n < 0 => Err(FsError::InvalidArg(format!(
                "file size cannot be negative, got {n}"
            ))),
            Self::Size(n) => Ok((0..n).map(|i| b'0' + (i % 10) as u8).collect()),
        }
    }
}

/// Coordinates of a free directory-entry slot located (or created) for an
/// insertion.
struct EntrySlot {
    block_index: i32,
    entry_index: usize,
}

pub struct Ext2Fs {
    path: PathBuf,
    part_start: i32,
    sb: SuperBlock,
}

impl Ext2Fs {
    /// Open a formatted partition: verify the magic and rebuild both bump
    /// cursors from the bitmaps, so a stale stored hint cannot corrupt the
    /// tables.
    pub fn open<P: Into<PathBuf>>(path: P, part_start: i32) -> FsResult<Self> {
        let path = path.into();
        let sb: SuperBlock = codec::read_record(&path, part_start as u64)?;
        if sb.magic != EXT2_MAGIC {
            return Err(FsError::Format(format!(
                "bad filesystem magic {:#06x}",
                sb.magic
            )));
        }
        if sb.inode_size != Inode::SIZE || sb.block_size != FileBlock::SIZE || sb.inodes_count <= 0
        {
            return Err(FsError::Format(format!(
                "implausible superblock: inode_size={}, block_size={}, inodes={}",
                sb.inode_size, sb.block_size, sb.inodes_count
            )));
        }
        let mut fs = Self {
            path,
            part_start,
            sb,
        };
        fs.rebuild_cursors()?;
        Ok(fs)
    }

    pub(crate) fn with_superblock(path: PathBuf, part_start: i32, sb: SuperBlock) -> Self {
        Self {
            path,
            part_start,
            sb,
        }
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.sb
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save_superblock(&self) -> FsResult<()> {
        codec::write_record(&self.path, self.part_start as u64, &self.sb)
    }

    /// The cursors are hints, not ground truth: recompute each as one past
    /// the highest used bitmap index. Equal to `start + popcount * size`
    /// while allocation is dense, and still monotonic after interior frees.
    fn rebuild_cursors(&mut self) -> FsResult<()> {
        let inode_map = codec::read_bytes(
            &self.path,
            self.sb.bm_inode_start as u64,
            self.sb.inodes_count as usize,
        )?;
        let used = highest_used(&inode_map);
        self.sb.first_ino = self.sb.inode_start + used * self.sb.inode_size;

        let block_map = codec::read_bytes(
            &self.path,
            self.sb.bm_block_start as u64,
            self.sb.blocks_count as usize,
        )?;
        let used = highest_used(&block_map);
        self.sb.first_blo = self.sb.block_start + used * self.sb.block_size;
        Ok(())
    }

    // ---- record i/o ------------------------------------------------------

    fn check_block(&self, index: i32) -> FsResult<()> {
        if index < 0 || index >= self.sb.blocks_count {
            return Err(FsError::BadPointer(index));
        }
        Ok(())
    }

    pub fn read_inode(&self, index: i32) -> FsResult<Inode> {
        if index < 0 || index >= self.sb.inodes_count {
            return Err(FsError::Format(format!(
                "inode index {index} out of range (count {})",
                self.sb.inodes_count
            )));
        }
        codec::read_record(&self.path, self.sb.inode_offset(index))
    }

    pub(crate) fn write_inode(&self, index: i32, inode: &Inode) -> FsResult<()> {
        codec::write_record(&self.path, self.sb.inode_offset(index), inode)
    }

    pub(crate) fn read_folder_block(&self, index: i32) -> FsResult<FolderBlock> {
        self.check_block(index)?;
        codec::read_record(&self.path, self.sb.block_offset(index))
    }

    pub(crate) fn write_folder_block(&self, index: i32, block: &FolderBlock) -> FsResult<()> {
        codec::write_record(&self.path, self.sb.block_offset(index), block)
    }

    fn read_file_block(&self, index: i32) -> FsResult<FileBlock> {
        self.check_block(index)?;
        codec::read_record(&self.path, self.sb.block_offset(index))
    }

    pub(crate) fn write_file_block(&self, index: i32, block: &FileBlock) -> FsResult<()> {
        codec::write_record(&self.path, self.sb.block_offset(index), block)
    }

    fn read_pointer_block(&self, index: i32) -> FsResult<PointerBlock> {
        self.check_block(index)?;
        codec::read_record(&self.path, self.sb.block_offset(index))
    }

    fn write_pointer_block(&self, index: i32, block: &PointerBlock) -> FsResult<()> {
        codec::write_record(&self.path, self.sb.block_offset(index), block)
    }

    // ---- allocator -------------------------------------------------------

    pub(crate) fn allocate_inode(&mut self) -> FsResult<i32> {
        let index = (self.sb.first_ino - self.sb.inode_start) / self.sb.inode_size;
        if index >= self.sb.inodes_count || self.sb.free_inodes_count <= 0 {
            return Err(FsError::NoSpace("no free inodes left".into()));
        }
        self.sb.set_inode_bit(&self.path, index)?;
        self.sb.free_inodes_count -= 1;
        self.sb.first_ino += self.sb.inode_size;
        debug!(index, "inode allocated");
        Ok(index)
    }

    pub(crate) fn allocate_block(&mut self) -> FsResult<i32> {
        let index = (self.sb.first_blo - self.sb.block_start) / self.sb.block_size;
        if index >= self.sb.blocks_count || self.sb.free_blocks_count <= 0 {
            return Err(FsError::NoSpace("no free blocks left".into()));
        }
        self.sb.set_block_bit(&self.path, index)?;
        self.sb.free_blocks_count -= 1;
        self.sb.first_blo += self.sb.block_size;
        debug!(index, "block allocated");
        Ok(index)
    }

    /// Mark one block free again. Out-of-range and `-1` pointers are
    /// ignored, so a partially stamped inode can be released wholesale.
    fn release_block(&mut self, index: i32) -> FsResult<()> {
        if index < 0 || index >= self.sb.blocks_count {
            return Ok(());
        }
        self.sb.clear_block_bit(&self.path, index)?;
        self.sb.free_blocks_count += 1;
        Ok(())
    }

    /// Allocate and fill the data blocks for `content`, yielding the
    /// 15-slot pointer array for the new inode. Pointer blocks are
    /// allocated before any child they reference and serialized only after
    /// all their children are stamped.
    pub(crate) fn allocate_data_blocks(&mut self, content: &[u8]) -> FsResult<[i32; 15]> {
        let mut layout = [-1i32; 15];
        if content.is_empty() {
            return Ok(layout);
        }
        let block_size = self.sb.block_size;
        let needed = (content.len() as i32 + block_size - 1) / block_size;
        if needed > TRIPLE_LIMIT {
            return Err(FsError::InvalidArg(format!(
                "content needs {needed} blocks, above the addressable {TRIPLE_LIMIT}"
            )));
        }
        if needed > DOUBLE_LIMIT {
            return Err(FsError::Unsupported("writes through triple indirection"));
        }
        if needed > self.sb.free_blocks_count {
            return Err(FsError::NoSpace(format!(
                "{needed} data blocks needed, {} free",
                self.sb.free_blocks_count
            )));
        }
        debug!(needed, bytes = content.len(), "allocating data blocks");

        let mut single: Option<(i32, PointerBlock)> = None;
        let mut double_root: Option<(i32, PointerBlock)> = None;
        let mut double_leaves: Vec<Option<(i32, PointerBlock)>> =
            (0..POINTERS_PER_BLOCK).map(|_| None).collect();

        for ordinal in 0..needed {
            if (DIRECT_POINTERS..SINGLE_LIMIT).contains(&ordinal) && single.is_none() {
                let index = self.allocate_block()?;
                layout[12] = index;
                single = Some((index, PointerBlock::empty()));
            }
            if ordinal >= SINGLE_LIMIT {
                let leaf = ((ordinal - SINGLE_LIMIT) / POINTERS_PER_BLOCK) as usize;
                if double_root.is_none() {
                    let index = self.allocate_block()?;
                    layout[13] = index;
                    double_root = Some((index, PointerBlock::empty()));
                }
                if double_leaves[leaf].is_none() {
                    let index = self.allocate_block()?;
                    if let Some((_, root)) = double_root.as_mut() {
                        root.pointers[leaf] = index;
                    }
                    double_leaves[leaf] = Some((index, PointerBlock::empty()));
                }
            }

            let data_index = self.allocate_block()?;
            let start = (ordinal * block_size) as usize;
            let end = content.len().min(start + block_size as usize);
            let mut file_block = FileBlock::empty();
            file_block.content[..end - start].copy_from_slice(&content[start..end]);
            self.write_file_block(data_index, &file_block)?;

            if ordinal < DIRECT_POINTERS {
                layout[ordinal as usize] = data_index;
            } else if ordinal < SINGLE_LIMIT {
                let (_, block) = single.as_mut().unwrap();
                block.pointers[(ordinal - DIRECT_POINTERS) as usize] = data_index;
            } else {
                let relative = ordinal - SINGLE_LIMIT;
                let leaf = (relative / POINTERS_PER_BLOCK) as usize;
                let slot = (relative % POINTERS_PER_BLOCK) as usize;
                let (_, block) = double_leaves[leaf].as_mut().unwrap();
                block.pointers[slot] = data_index;
            }
        }

        if let Some((index, block)) = &single {
            self.write_pointer_block(*index, block)?;
        }
        if let Some((index, block)) = &double_root {
            self.write_pointer_block(*index, block)?;
        }
        for (index, block) in double_leaves.iter().flatten() {
            self.write_pointer_block(*index, block)?;
        }
        Ok(layout)
    }

    // ---- path resolver ---------------------------------------------------

    /// Walk an absolute path component by component from the root inode.
    pub fn resolve(&self, path: &str) -> FsResult<(i32, Inode)> {
        let components = parse_components(path)?;
        let mut index = ROOT_INODE;
        let mut inode = self.read_inode(index)?;
        for component in &components {
            if !inode.is_dir() {
                return Err(FsError::NotFound(format!(
                    "'{component}' looked up inside a non-directory"
                )));
            }
            index = self.lookup_child(&inode, component)?.ok_or_else(|| {
                FsError::NotFound(format!("no entry '{component}' along '{path}'"))
            })?;
            inode = self.read_inode(index)?;
        }
        Ok((index, inode))
    }

    /// Search a directory's folder blocks for `name`: direct pointers
    /// first, then every block behind the single-indirect pointer.
    fn lookup_child(&self, dir: &Inode, name: &str) -> FsResult<Option<i32>> {
        for &pointer in &dir.block[..DIRECT_POINTERS as usize] {
            if pointer == -1 {
                continue;
            }
            if let Some(found) = self.scan_folder_block(pointer, name)? {
                return Ok(Some(found));
            }
        }
        if dir.block[12] != -1 {
            let pointers = self.read_pointer_block(dir.block[12])?;
            for &pointer in &pointers.pointers {
                if pointer == -1 {
                    continue;
                }
                if let Some(found) = self.scan_folder_block(pointer, name)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    fn scan_folder_block(&self, index: i32, name: &str) -> FsResult<Option<i32>> {
        let block = self.read_folder_block(index)?;
        Ok(block
            .entries
            .iter()
            .find(|entry| !entry.is_free() && entry.name_str() == name)
            .map(|entry| entry.inode))
    }

    // ---- directory engine ------------------------------------------------

    /// `mkdir`: create the final component of `path`; with `parents`,
    /// materialize every missing ancestor on the way down.
    pub fn mkdir(&mut self, session: &Session, path: &str, parents: bool) -> FsResult<()> {
        let user = session.active()?;
        let (uid, gid) = (user.uid, user.gid);
        let components = parse_components(path)?;
        if components.is_empty() {
            return Err(FsError::InvalidArg(
                "the root directory cannot be created".into(),
            ));
        }

        let mut parent_index = ROOT_INODE;
        for component in &components[..components.len() - 1] {
            let parent = self.read_inode(parent_index)?;
            parent_index = match self.lookup_child(&parent, component)? {
                Some(index) => {
                    if !self.read_inode(index)?.is_dir() {
                        return Err(FsError::InvalidArg(format!(
                            "'{component}' exists and is not a directory"
                        )));
                    }
                    index
                }
                None if parents => self.create_folder(parent_index, component, uid, gid)?,
                None => {
                    return Err(FsError::NotFound(format!(
                        "parent directory '{component}' does not exist (missing -p?)"
                    )))
                }
            };
        }

        let last = &components[components.len() - 1];
        self.create_folder(parent_index, last, uid, gid)?;
        self.save_superblock()
    }

    /// Create one directory under an existing parent inode and return the
    /// child's inode index.
    fn create_folder(&mut self, parent_index: i32, name: &str, uid: i32, gid: i32) -> FsResult<i32> {
        validate_name(name)?;
        let parent = self.read_inode(parent_index)?;
        if !parent.is_dir() {
            return Err(FsError::InvalidArg(format!(
                "inode {parent_index} is not a directory"
            )));
        }
        if self.lookup_child(&parent, name)?.is_some() {
            return Err(FsError::AlreadyExists(format!(
                "an entry named '{name}' already exists"
            )));
        }

        let slot = self.prepare_entry_slot(parent_index)?;
        let child_index = self.allocate_inode()?;
        let block_index = self.allocate_block()?;
        let mut child = Inode::new(KIND_DIR, uid, gid, 0, *b"775");
        child.block[0] = block_index;
        self.write_inode(child_index, &child)?;
        self.write_folder_block(block_index, &FolderBlock::first_of_dir(child_index, parent_index))?;
        self.write_entry(parent_index, slot, name, child_index)?;
        debug!(name, child_index, parent_index, "directory created");
        Ok(child_index)
    }

    /// Locate a free entry slot in the parent directory, growing it when
    /// every existing slot is taken: a fresh folder block behind a free
    /// direct pointer first, then behind the single-indirect pointer block.
    fn prepare_entry_slot(&mut self, parent_index: i32) -> FsResult<EntrySlot> {
        let mut parent = self.read_inode(parent_index)?;
        if let Some(slot) = self.find_free_entry_slot(&parent)? {
            return Ok(slot);
        }

        for k in 0..DIRECT_POINTERS as usize {
            if parent.block[k] == -1 {
                let block_index = self.allocate_block()?;
                self.write_folder_block(block_index, &FolderBlock::empty())?;
                parent.block[k] = block_index;
                parent.touch();
                self.write_inode(parent_index, &parent)?;
                debug!(parent_index, block_index, slot = k, "directory grown via direct pointer");
                return Ok(EntrySlot {
                    block_index,
                    entry_index: 0,
                });
            }
        }

        let pointer_index = if parent.block[12] == -1 {
            let pointer_index = self.allocate_block()?;
            parent.block[12] = pointer_index;
            parent.touch();
            self.write_inode(parent_index, &parent)?;
            self.write_pointer_block(pointer_index, &PointerBlock::empty())?;
            pointer_index
        } else {
            parent.block[12]
        };

        let mut pointers = self.read_pointer_block(pointer_index)?;
        let free = pointers
            .pointers
            .iter()
            .position(|&p| p == -1)
            .ok_or(FsError::DirFull)?;
        let block_index = self.allocate_block()?;
        self.write_folder_block(block_index, &FolderBlock::empty())?;
        pointers.pointers[free] = block_index;
        self.write_pointer_block(pointer_index, &pointers)?;
        debug!(parent_index, block_index, "directory grown via single indirection");
        Ok(EntrySlot {
            block_index,
            entry_index: 0,
        })
    }

    fn find_free_entry_slot(&self, parent: &Inode) -> FsResult<Option<EntrySlot>> {
        let scan = |block_index: i32| -> FsResult<Option<EntrySlot>> {
            let block = self.read_folder_block(block_index)?;
            for (entry_index, entry) in block.entries.iter().enumerate() {
                if entry.is_free() && !entry.name_str().starts_with('.') {
                    return Ok(Some(EntrySlot {
                        block_index,
                        entry_index,
                    }));
                }
            }
            Ok(None)
        };

        for &pointer in &parent.block[..DIRECT_POINTERS as usize] {
            if pointer == -1 {
                continue;
            }
            if let Some(slot) = scan(pointer)? {
                return Ok(Some(slot));
            }
        }
        if parent.block[12] != -1 {
            let pointers = self.read_pointer_block(parent.block[12])?;
            for &pointer in &pointers.pointers {
                if pointer == -1 {
                    continue;
                }
                if let Some(slot) = scan(pointer)? {
                    return Ok(Some(slot));
                }
            }
        }
        Ok(None)
    }

    fn write_entry(
        &mut self,
        parent_index: i32,
        slot: EntrySlot,
        name: &str,
        child: i32,
    ) -> FsResult<()> {
        let mut block = self.read_folder_block(slot.block_index)?;
        block.entries[slot.entry_index] = FolderEntry::named(name, child);
        self.write_folder_block(slot.block_index, &block)?;
        let mut parent = self.read_inode(parent_index)?;
        parent.touch();
        self.write_inode(parent_index, &parent)
    }

    /// Resolve the parent directory of a path, creating missing ancestors
    /// root-down when `recursive` is set.
    fn ensure_parent(
        &mut self,
        parent_path: &str,
        recursive: bool,
        uid: i32,
        gid: i32,
    ) -> FsResult<i32> {
        match self.resolve(parent_path) {
            Ok((index, inode)) => {
                if inode.is_dir() {
                    Ok(index)
                } else {
                    Err(FsError::InvalidArg(format!(
                        "'{parent_path}' exists and is not a directory"
                    )))
                }
            }
            Err(FsError::NotFound(_)) if recursive => {
                let (grandparent, name) = split_parent(parent_path);
                let grandparent_index = self.ensure_parent(&grandparent, true, uid, gid)?;
                self.create_folder(grandparent_index, &name, uid, gid)
            }
            Err(err) => Err(err),
        }
    }

    // ---- file engine -----------------------------------------------------

    /// `mkfile`: create a file with generated or literal content.
    pub fn mkfile(
        &mut self,
        session: &Session,
        path: &str,
        recursive: bool,
        content: FileContent,
    ) -> FsResult<()> {
        let user = session.active()?;
        let (uid, gid) = (user.uid, user.gid);
        let components = parse_components(path)?;
        if components.is_empty() {
            return Err(FsError::InvalidArg(
                "a file cannot be created at '/'".into(),
            ));
        }
        let clean = format!("/{}", components.join("/"));
        let (parent_path, name) = split_parent(&clean);
        validate_name(&name)?;

        let parent_index = self.ensure_parent(&parent_path, recursive, uid, gid)?;
        let parent = self.read_inode(parent_index)?;
        if self.lookup_child(&parent, &name)?.is_some() {
            return Err(FsError::AlreadyExists(format!(
                "an entry named '{name}' already exists in '{parent_path}'"
            )));
        }

        let bytes = content.materialize()?;
        let layout = self.allocate_data_blocks(&bytes)?;
        let inode_index = self.allocate_inode()?;
        let mut inode = Inode::new(KIND_FILE, uid, gid, bytes.len() as i32, *b"664");
        inode.block = layout;
        self.write_inode(inode_index, &inode)?;
        let slot = self.prepare_entry_slot(parent_index)?;
        self.write_entry(parent_index, slot, &name, inode_index)?;
        debug!(path = %clean, inode_index, size = bytes.len(), "file created");
        self.save_superblock()
    }

    /// Full contents of the file at `path`, traversing every indirection
    /// level in index order and stopping at the inode's recorded size.
    pub fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let (_, inode) = self.resolve(path)?;
        self.read_inode_content(&inode)
    }

    pub fn read_inode_content(&self, inode: &Inode) -> FsResult<Vec<u8>> {
        if !inode.is_file() {
            return Err(FsError::InvalidArg("not a regular file".into()));
        }
        let size = inode.size.max(0) as usize;
        let mut out = Vec::with_capacity(size);
        for &pointer in &inode.block[..DIRECT_POINTERS as usize] {
            if out.len() >= size {
                break;
            }
            if pointer == -1 {
                continue;
            }
            self.append_data_block(pointer, &mut out, size)?;
        }
        for (level, slot) in [(1u8, 12usize), (2, 13), (3, 14)] {
            if out.len() >= size {
                break;
            }
            if inode.block[slot] == -1 {
                continue;
            }
            self.append_indirect(level, inode.block[slot], &mut out, size)?;
        }
        Ok(out)
    }

    /// `cat`: concatenate file contents, one trailing newline per file.
    pub fn cat<S: AsRef<str>>(&self, paths: &[S]) -> FsResult<String> {
        let mut out = String::new();
        for path in paths {
            let bytes = self.read_file(path.as_ref())?;
            out.push_str(&String::from_utf8_lossy(&bytes));
            out.push('\n');
        }
        Ok(out)
    }

    fn append_data_block(&self, index: i32, out: &mut Vec<u8>, size: usize) -> FsResult<()> {
        let block = self.read_file_block(index)?;
        let take = (size - out.len()).min(block.content.len());
        out.extend_from_slice(&block.content[..take]);
        Ok(())
    }

    /// One walker for all three indirection depths; at depth 1 the
    /// pointers reference data blocks, above that further pointer blocks.
    fn append_indirect(&self, level: u8, index: i32, out: &mut Vec<u8>, size: usize) -> FsResult<()> {
        let pointers = self.read_pointer_block(index)?;
        for &next in &pointers.pointers {
            if out.len() >= size {
                break;
            }
            if next == -1 {
                continue;
            }
            if level == 1 {
                self.append_data_block(next, out, size)?;
            } else {
                self.append_indirect(level - 1, next, out, size)?;
            }
        }
        Ok(())
    }

    /// Release every data and pointer block of an inode, each subtree
    /// before its pointer block. The inode itself stays allocated; its
    /// pointer array is reset to `-1`.
    pub fn free_inode_blocks(&mut self, inode_index: i32) -> FsResult<()> {
        let mut inode = self.read_inode(inode_index)?;
        for slot in 0..DIRECT_POINTERS as usize {
            self.release_block(inode.block[slot])?;
            inode.block[slot] = -1;
        }
        for (level, slot) in [(1u8, 12usize), (2, 13), (3, 14)] {
            self.release_indirect(level, inode.block[slot])?;
            inode.block[slot] = -1;
        }
        self.write_inode(inode_index, &inode)?;
        self.save_superblock()
    }

    fn release_indirect(&mut self, level: u8, index: i32) -> FsResult<()> {
        if index < 0 || index >= self.sb.blocks_count {
            return Ok(());
        }
        let pointers = self.read_pointer_block(index)?;
        for &next in &pointers.pointers {
            if level == 1 {
                self.release_block(next)?;
            } else {
                self.release_indirect(level - 1, next)?;
            }
        }
        self.release_block(index)
    }
}

/// Number of leading table slots in use: one past the highest `'1'` byte.
fn highest_used(bitmap: &[u8]) -> i32 {
    bitmap
        .iter()
        .rposition(|&b| b == super::types::BITMAP_USED)
        .map_or(0, |i| i as i32 + 1)
}

fn parse_components(path: &str) -> FsResult<Vec<String>> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidArg(format!(
            "path '{path}' must be absolute"
        )));
    }
    Ok(path
        .split('/')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect())
}

fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(FsError::InvalidArg(format!("invalid entry name '{name}'")));
    }
    if name.len() > NAME_LEN {
        return Err(FsError::InvalidArg(format!(
            "name '{name}' exceeds {NAME_LEN} bytes"
        )));
    }
    Ok(())
}

/// `"/a/b"` becomes `("/a", "b")`; a top-level entry's parent is `"/"`.
fn split_parent(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => ("/".to_string(), trimmed.trim_start_matches('/').to_string()),
        Some(position) => (
            trimmed[..position].to_string(),
            trimmed[position + 1..].to_string(),
        ),
    }
}
