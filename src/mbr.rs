//! Partition-table records: the MBR at byte 0 of the host file, its four
//! partition slots, and the EBR chain that threads logical partitions
//! through the extended partition.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::FsResult;
use crate::ext2::now;

pub const PARTITION_NAME_LEN: usize = 16;
pub const MOUNT_ID_LEN: usize = 4;

pub const STATUS_CREATED: u8 = b'0';
pub const STATUS_MOUNTED: u8 = b'1';

pub const KIND_PRIMARY: u8 = b'P';
pub const KIND_EXTENDED: u8 = b'E';

fn trimmed_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim_end_matches('\0').to_string()
}

/// One of the four MBR slots. A free slot is marked by `start == -1`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Partition {
    pub status: u8,
    pub kind: u8,
    pub fit: u8,
    pub start: i32,
    pub size: i32,
    pub name: [u8; PARTITION_NAME_LEN],
    pub correlative: i32,
    pub id: [u8; MOUNT_ID_LEN],
}

impl Partition {
    pub const SIZE: i32 = 35;

    pub fn empty() -> Self {
        Self {
            status: STATUS_CREATED,
            kind: 0,
            fit: 0,
            start: -1,
            size: 0,
            name: [0; PARTITION_NAME_LEN],
            correlative: 0,
            id: [0; MOUNT_ID_LEN],
        }
    }

    pub fn is_free(&self) -> bool {
        self.start == -1
    }

    pub fn create(&mut self, start: i32, size: i32, kind: u8, fit: u8, name: &str) {
        self.status = STATUS_CREATED;
        self.kind = kind;
        self.fit = fit;
        self.start = start;
        self.size = size;
        self.name = [0; PARTITION_NAME_LEN];
        let bytes = name.as_bytes();
        self.name[..bytes.len()].copy_from_slice(bytes);
    }

    pub fn mark_mounted(&mut self, correlative: i32, id: &str) {
        self.status = STATUS_MOUNTED;
        self.correlative = correlative;
        self.id = [0; MOUNT_ID_LEN];
        let bytes = id.as_bytes();
        let len = bytes.len().min(MOUNT_ID_LEN);
        self.id[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn clear_mount(&mut self) {
        self.status = STATUS_CREATED;
        self.correlative = 0;
        self.id = [0; MOUNT_ID_LEN];
    }

    pub fn name_str(&self) -> String {
        trimmed_name(&self.name)
    }
}

/// Header at byte 0 of the host file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Mbr {
    pub size: i32,
    pub creation_time: f32,
    pub signature: i32,
    pub fit: u8,
    pub partitions: [Partition; 4],
}

impl Mbr {
    pub const SIZE: i32 = 153;

    pub fn new(size: i32, fit: u8) -> Self {
        Self {
            size,
            creation_time: now(),
            signature: rand::random(),
            fit,
            partitions: [Partition::empty(); 4],
        }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> FsResult<Self> {
        codec::read_record(path, 0)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> FsResult<()> {
        codec::write_record(path, 0, self)
    }

    /// First free slot, with the start offset a partition placed there would
    /// get: the MBR header plus every used slot's size, in declaration order.
    pub fn first_free_slot(&self) -> Option<(usize, i32)> {
        let mut offset = Self::SIZE;
        for (index, partition) in self.partitions.iter().enumerate() {
            if partition.is_free() {
                return Some((index, offset));
            }
            offset += partition.size;
        }
        None
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.partitions
            .iter()
            .position(|p| !p.is_free() && p.name_str().eq_ignore_ascii_case(name))
    }

    pub fn extended(&self) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| !p.is_free() && p.kind == KIND_EXTENDED)
    }
}

/// Header preceding each logical partition inside the extended partition.
/// `start` is the data offset (EBR offset + `Ebr::SIZE`); `next` is the
/// absolute offset of the following EBR, `-1` at the tail.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ebr {
    pub status: u8,
    pub fit: u8,
    pub start: i32,
    pub size: i32,
    pub next: i32,
    pub name: [u8; PARTITION_NAME_LEN],
}

impl Ebr {
    pub const SIZE: i32 = 30;

    pub fn new(fit: u8, start: i32, size: i32, name: &str) -> Self {
        let mut ebr = Self {
            status: STATUS_CREATED,
            fit,
            start,
            size,
            next: -1,
            name: [0; PARTITION_NAME_LEN],
        };
        let bytes = name.as_bytes();
        ebr.name[..bytes.len()].copy_from_slice(bytes);
        ebr
    }

    pub fn name_str(&self) -> String {
        trimmed_name(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn record_sizes_match_the_on_disk_layout() -> Result<()> {
        assert_eq!(
            bincode::serialized_size(&Partition::empty())?,
            Partition::SIZE as u64
        );
        assert_eq!(bincode::serialized_size(&Mbr::new(0, b'F'))?, Mbr::SIZE as u64);
        assert_eq!(
            bincode::serialized_size(&Ebr::new(b'F', 0, 0, "l1"))?,
            Ebr::SIZE as u64
        );
        Ok(())
    }

    #[test]
    fn free_slot_offsets_accumulate_used_sizes() {
        let mut mbr = Mbr::new(10 * 1024 * 1024, b'F');
        assert_eq!(mbr.first_free_slot(), Some((0, Mbr::SIZE)));

        mbr.partitions[0].create(Mbr::SIZE, 4096, KIND_PRIMARY, b'F', "p1");
        assert_eq!(mbr.first_free_slot(), Some((1, Mbr::SIZE + 4096)));

        mbr.partitions[1].create(Mbr::SIZE + 4096, 2048, KIND_PRIMARY, b'F', "p2");
        assert_eq!(mbr.first_free_slot(), Some((2, Mbr::SIZE + 6144)));

        assert_eq!(mbr.find_by_name("P2"), Some(1));
        assert_eq!(mbr.find_by_name("p3"), None);
    }

    #[test]
    fn mount_marking_round_trips() {
        let mut partition = Partition::empty();
        partition.create(Mbr::SIZE, 1024, KIND_PRIMARY, b'F', "p1");
        partition.mark_mounted(1, "621A");
        assert_eq!(partition.status, STATUS_MOUNTED);
        assert_eq!(&partition.id, b"621A");

        partition.clear_mount();
        assert_eq!(partition.status, STATUS_CREATED);
        assert_eq!(partition.correlative, 0);
        assert_eq!(partition.id, [0; MOUNT_ID_LEN]);
    }
}
