//! Mount bookkeeping: a registry mapping mount ids to the byte range of a
//! partition inside its host file. The table is an explicit value the caller
//! threads through operations; nothing here is global.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{FsError, FsResult};
use crate::mbr::{Mbr, KIND_EXTENDED};

/// Stable prefix of every mount id; the full id is
/// `<prefix><correlative><letter>`.
const MOUNT_ID_PREFIX: &str = "62";

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone)]
pub struct MountedPartition {
    pub id: String,
    pub path: PathBuf,
    pub name: String,
    pub start: i32,
    pub size: i32,
    pub letter: char,
    pub correlative: i32,
}

/// Registry of mounted partitions. Each distinct host path gets the next
/// unused alphabet letter (reused for later mounts of the same path) and a
/// 1-based monotonic correlative.
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: BTreeMap<String, MountedPartition>,
    letters: HashMap<PathBuf, char>,
    next_letter: usize,
    correlatives: HashMap<PathBuf, i32>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `mount`: register the named primary partition of the disk at `path`
    /// and stamp its MBR slot as mounted.
    pub fn mount<P: AsRef<Path>>(&mut self, path: P, name: &str) -> FsResult<String> {
        let path = path.as_ref().to_path_buf();
        let mut mbr = Mbr::read(&path)?;
        let slot = mbr.find_by_name(name).ok_or_else(|| {
            FsError::NotFound(format!(
                "no partition named '{name}' on {}",
                path.display()
            ))
        })?;
        if mbr.partitions[slot].kind == KIND_EXTENDED {
            return Err(FsError::InvalidArg(
                "an extended partition cannot be mounted".into(),
            ));
        }

        let letter = match self.letters.get(&path) {
            Some(&letter) => letter,
            None => {
                let letter = *LETTERS.get(self.next_letter).ok_or_else(|| {
                    FsError::NoSpace("all 26 disk letters are in use".into())
                })? as char;
                self.next_letter += 1;
                self.letters.insert(path.clone(), letter);
                letter
            }
        };
        let correlative = self
            .correlatives
            .entry(path.clone())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let id = format!("{MOUNT_ID_PREFIX}{correlative}{letter}");
        if self.mounts.contains_key(&id) {
            return Err(FsError::AlreadyExists(format!(
                "mount id '{id}' is already registered"
            )));
        }

        mbr.partitions[slot].mark_mounted(*correlative, &id);
        mbr.write(&path)?;

        let mounted = MountedPartition {
            id: id.clone(),
            path,
            name: name.to_string(),
            start: mbr.partitions[slot].start,
            size: mbr.partitions[slot].size,
            letter,
            correlative: *correlative,
        };
        info!(%id, start = mounted.start, size = mounted.size, "partition mounted");
        self.mounts.insert(id.clone(), mounted);
        Ok(id)
    }

    /// `unmount`: drop the registry entry and reset the MBR slot.
    pub fn unmount(&mut self, id: &str) -> FsResult<()> {
        let mounted = self
            .mounts
            .remove(id)
            .ok_or_else(|| FsError::NotFound(format!("mount id '{id}' is not registered")))?;

        let mut mbr = Mbr::read(&mounted.path)?;
        if let Some(slot) = mbr.find_by_name(&mounted.name) {
            mbr.partitions[slot].clear_mount();
            mbr.write(&mounted.path)?;
        }
        info!(id, "partition unmounted");
        Ok(())
    }

    pub fn get(&self, id: &str) -> FsResult<&MountedPartition> {
        self.mounts
            .get(id)
            .ok_or_else(|| FsError::NotFound(format!("mount id '{id}' is not registered")))
    }

    /// `mounted`: every registered id, in stable order.
    pub fn mounted_ids(&self) -> Vec<&str> {
        self.mounts.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mbr::STATUS_MOUNTED;
    use crate::vdisk::{Fit, PartitionKind, PartitionRequest, SizeUnit, VDisk};
    use anyhow::Result;
    use tempfile::tempdir;

    fn disk_with_partitions(dir: &Path, file: &str, names: &[&str]) -> Result<VDisk> {
        let disk = VDisk::create(dir.join(file), 8, SizeUnit::M, Fit::First)?;
        for name in names {
            disk.add_partition(&PartitionRequest {
                name: name.to_string(),
                size: 1,
                unit: SizeUnit::M,
                fit: Fit::First,
                kind: PartitionKind::Primary,
            })?;
        }
        Ok(disk)
    }

    #[test]
    fn ids_combine_prefix_correlative_and_letter() -> Result<()> {
        let dir = tempdir()?;
        let disk_a = disk_with_partitions(dir.path(), "a.dsk", &["P1", "P2"])?;
        let disk_b = disk_with_partitions(dir.path(), "b.dsk", &["Q1"])?;

        let mut table = MountTable::new();
        assert_eq!(table.mount(disk_a.path(), "P1")?, "621A");
        assert_eq!(table.mount(disk_a.path(), "P2")?, "622A");
        assert_eq!(table.mount(disk_b.path(), "Q1")?, "621B");

        let mounted = table.get("622A")?;
        assert_eq!(mounted.name, "P2");
        assert_eq!(mounted.letter, 'A');
        assert_eq!(mounted.correlative, 2);
        assert_eq!(table.mounted_ids(), vec!["621A", "621B", "622A"]);
        Ok(())
    }

    #[test]
    fn mount_marks_the_partition_record() -> Result<()> {
        let dir = tempdir()?;
        let disk = disk_with_partitions(dir.path(), "a.dsk", &["P1"])?;

        let mut table = MountTable::new();
        let id = table.mount(disk.path(), "P1")?;

        let mbr = disk.mbr()?;
        assert_eq!(mbr.partitions[0].status, STATUS_MOUNTED);
        assert_eq!(mbr.partitions[0].correlative, 1);
        assert_eq!(&mbr.partitions[0].id[..], id.as_bytes());

        table.unmount(&id)?;
        let mbr = disk.mbr()?;
        assert_eq!(mbr.partitions[0].correlative, 0);
        assert!(table.get(&id).is_err());
        Ok(())
    }

    #[test]
    fn unknown_partitions_and_extended_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let disk = disk_with_partitions(dir.path(), "a.dsk", &["P1"])?;
        disk.add_partition(&PartitionRequest {
            name: "E1".into(),
            size: 2,
            unit: SizeUnit::M,
            fit: Fit::First,
            kind: PartitionKind::Extended,
        })?;

        let mut table = MountTable::new();
        assert!(matches!(
            table.mount(disk.path(), "nope"),
            Err(FsError::NotFound(_))
        ));
        assert!(matches!(
            table.mount(disk.path(), "E1"),
            Err(FsError::InvalidArg(_))
        ));
        assert!(matches!(table.unmount("620Z"), Err(FsError::NotFound(_))));
        Ok(())
    }
}
