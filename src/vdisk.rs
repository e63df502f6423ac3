//! Host-file virtual disk: creation and removal of the backing file, and the
//! MBR-level partition operations (primary, extended, logical).

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codec;
use crate::error::{FsError, FsResult};
use crate::mbr::{Ebr, Mbr, KIND_EXTENDED, KIND_PRIMARY};

/// Unit for user-supplied sizes: K = 1024 bytes, M = 1024 * 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    K,
    M,
}

impl SizeUnit {
    pub fn to_bytes(self, size: i32) -> i64 {
        match self {
            SizeUnit::K => size as i64 * 1024,
            SizeUnit::M => size as i64 * 1024 * 1024,
        }
    }
}

/// Allocation fit recorded in the MBR and partition records. Only the byte
/// is stored; no fit strategy is enforced by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    Best,
    #[default]
    First,
    Worst,
}

impl Fit {
    pub fn as_byte(self) -> u8 {
        match self {
            Fit::Best => b'B',
            Fit::First => b'F',
            Fit::Worst => b'W',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Primary,
    Extended,
    Logical,
}

/// Parameters of one `fdisk` invocation.
#[derive(Debug, Clone)]
pub struct PartitionRequest {
    pub name: String,
    pub size: i32,
    pub unit: SizeUnit,
    pub fit: Fit,
    pub kind: PartitionKind,
}

/// Handle on a host file acting as a block device.
pub struct VDisk {
    path: PathBuf,
}

impl VDisk {
    /// `mkdisk`: materialize a zero-filled host file of the requested size
    /// and stamp an MBR with four free slots at byte 0.
    pub fn create<P: Into<PathBuf>>(path: P, size: i32, unit: SizeUnit, fit: Fit) -> FsResult<Self> {
        let path = path.into();
        let bytes = unit.to_bytes(size);
        if size <= 0 || bytes > i32::MAX as i64 {
            return Err(FsError::InvalidArg(format!(
                "disk size must be positive and below 2 GiB, got {size} ({bytes} bytes)"
            )));
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        #[cfg(target_os = "linux")]
        {
            use nix::fcntl::{fallocate, FallocateFlags};
            use std::os::fd::AsRawFd;
            fallocate(file.as_raw_fd(), FallocateFlags::empty(), 0, bytes)
                .map_err(std::io::Error::from)?;
        }
        file.set_len(bytes as u64)?;

        Mbr::new(bytes as i32, fit.as_byte()).write(&path)?;
        info!(path = %path.display(), bytes, "disk created");
        Ok(Self { path })
    }

    /// Open an existing disk; the file must already carry an MBR.
    pub fn open<P: Into<PathBuf>>(path: P) -> FsResult<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(FsError::NotFound(format!("no disk at {}", path.display())));
        }
        Ok(Self { path })
    }

    /// `rmdisk`: delete the host file.
    pub fn remove(self) -> FsResult<()> {
        std::fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "disk removed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mbr(&self) -> FsResult<Mbr> {
        Mbr::read(&self.path)
    }

    /// `fdisk`: create a partition of the requested kind.
    pub fn add_partition(&self, request: &PartitionRequest) -> FsResult<()> {
        if request.name.is_empty() || request.name.len() > crate::mbr::PARTITION_NAME_LEN {
            return Err(FsError::InvalidArg(format!(
                "partition name '{}' must be 1..=16 bytes",
                request.name
            )));
        }
        let bytes = request.unit.to_bytes(request.size);
        if request.size <= 0 || bytes > i32::MAX as i64 {
            return Err(FsError::InvalidArg(format!(
                "partition size must be positive and below 2 GiB, got {}",
                request.size
            )));
        }

        match request.kind {
            PartitionKind::Primary => self.add_mbr_partition(request, bytes as i32, KIND_PRIMARY),
            PartitionKind::Extended => {
                let mbr = self.mbr()?;
                if mbr.extended().is_some() {
                    return Err(FsError::AlreadyExists(
                        "the disk already has an extended partition".into(),
                    ));
                }
                self.add_mbr_partition(request, bytes as i32, KIND_EXTENDED)
            }
            PartitionKind::Logical => self.add_logical_partition(request, bytes as i32),
        }
    }

    fn add_mbr_partition(&self, request: &PartitionRequest, bytes: i32, kind: u8) -> FsResult<()> {
        let mut mbr = self.mbr()?;
        if mbr.find_by_name(&request.name).is_some() {
            return Err(FsError::AlreadyExists(format!(
                "a partition named '{}' already exists",
                request.name
            )));
        }
        let (index, start) = mbr
            .first_free_slot()
            .ok_or_else(|| FsError::NoSpace("all four MBR partition slots are in use".into()))?;
        if start + bytes > mbr.size {
            return Err(FsError::NoSpace(format!(
                "partition of {bytes} bytes at offset {start} overflows the disk ({} bytes)",
                mbr.size
            )));
        }

        mbr.partitions[index].create(start, bytes, kind, request.fit.as_byte(), &request.name);
        debug!(index, start, bytes, kind = %(kind as char), "partition slot written");
        mbr.write(&self.path)
    }

    /// Walk the EBR chain inside the extended partition and append a new
    /// logical partition: its EBR lands at the extended start when the chain
    /// is empty, otherwise right after the last logical's data region.
    fn add_logical_partition(&self, request: &PartitionRequest, bytes: i32) -> FsResult<()> {
        let mbr = self.mbr()?;
        if mbr.find_by_name(&request.name).is_some() {
            return Err(FsError::AlreadyExists(format!(
                "a partition named '{}' already exists",
                request.name
            )));
        }
        let extended = mbr
            .extended()
            .ok_or_else(|| FsError::NotFound("the disk has no extended partition".into()))?;
        let extended_end = extended.start + extended.size;

        let mut position = extended.start;
        let mut last: Option<(i32, Ebr)> = None;
        loop {
            let ebr: Ebr = codec::read_record(&self.path, position as u64)?;
            if last.is_none() && ebr.size <= 0 {
                break; // zero-filled region, the chain is empty
            }
            if ebr.name_str().eq_ignore_ascii_case(&request.name) {
                return Err(FsError::AlreadyExists(format!(
                    "a logical partition named '{}' already exists",
                    request.name
                )));
            }
            let next = ebr.next;
            last = Some((position, ebr));
            if next == -1 {
                break;
            }
            position = next;
        }

        let ebr_position = match &last {
            None => extended.start,
            Some((_, ebr)) => ebr.start + ebr.size,
        };
        let data_start = ebr_position + Ebr::SIZE;
        if data_start + bytes > extended_end {
            return Err(FsError::NoSpace(format!(
                "logical partition of {bytes} bytes does not fit in the extended partition"
            )));
        }

        let ebr = Ebr::new(request.fit.as_byte(), data_start, bytes, &request.name);
        codec::write_record(&self.path, ebr_position as u64, &ebr)?;

        if let Some((previous_position, mut previous)) = last {
            previous.next = ebr_position;
            codec::write_record(&self.path, previous_position as u64, &previous)?;
        }
        debug!(ebr_position, data_start, bytes, "logical partition appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn request(name: &str, size: i32, unit: SizeUnit, kind: PartitionKind) -> PartitionRequest {
        PartitionRequest {
            name: name.into(),
            size,
            unit,
            fit: Fit::First,
            kind,
        }
    }

    #[test]
    fn mkdisk_writes_an_empty_mbr() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("d1.dsk");

        let disk = VDisk::create(&path, 10, SizeUnit::M, Fit::First)?;
        assert_eq!(std::fs::metadata(&path)?.len(), 10 * 1024 * 1024);

        let mbr = disk.mbr()?;
        assert_eq!(mbr.size, 10 * 1024 * 1024);
        assert_eq!(mbr.fit, b'F');
        assert!(mbr.partitions.iter().all(|p| p.start == -1));
        Ok(())
    }

    #[test]
    fn primary_extended_and_logical_layout() -> Result<()> {
        let dir = tempdir()?;
        let disk = VDisk::create(dir.path().join("d1.dsk"), 10, SizeUnit::M, Fit::First)?;
        const MB: i32 = 1024 * 1024;

        disk.add_partition(&request("P1", 3, SizeUnit::M, PartitionKind::Primary))?;
        disk.add_partition(&request("E1", 3, SizeUnit::M, PartitionKind::Extended))?;
        disk.add_partition(&request("L1", 1, SizeUnit::M, PartitionKind::Logical))?;

        let mbr = disk.mbr()?;
        assert_eq!(mbr.partitions[0].kind, KIND_PRIMARY);
        assert_eq!(mbr.partitions[0].start, Mbr::SIZE);
        assert_eq!(mbr.partitions[0].size, 3 * MB);
        assert_eq!(mbr.partitions[1].kind, KIND_EXTENDED);
        assert_eq!(mbr.partitions[1].start, Mbr::SIZE + 3 * MB);

        let first_ebr: Ebr = codec::read_record(disk.path(), mbr.partitions[1].start as u64)?;
        assert_eq!(first_ebr.size, MB);
        assert_eq!(first_ebr.next, -1);
        assert_eq!(first_ebr.start, mbr.partitions[1].start + Ebr::SIZE);
        assert_eq!(first_ebr.name_str(), "L1");

        // A second logical chains behind the first.
        disk.add_partition(&request("L2", 1, SizeUnit::M, PartitionKind::Logical))?;
        let first_ebr: Ebr = codec::read_record(disk.path(), mbr.partitions[1].start as u64)?;
        let second_position = first_ebr.start + first_ebr.size;
        assert_eq!(first_ebr.next, second_position);
        let second_ebr: Ebr = codec::read_record(disk.path(), second_position as u64)?;
        assert_eq!(second_ebr.size, MB);
        assert_eq!(second_ebr.next, -1);
        assert_eq!(second_ebr.start, second_position + Ebr::SIZE);
        Ok(())
    }

    #[test]
    fn duplicate_and_overflow_rejections() -> Result<()> {
        let dir = tempdir()?;
        let disk = VDisk::create(dir.path().join("d1.dsk"), 4, SizeUnit::M, Fit::First)?;

        disk.add_partition(&request("P1", 1, SizeUnit::M, PartitionKind::Primary))?;
        let err = disk
            .add_partition(&request("p1", 1, SizeUnit::M, PartitionKind::Primary))
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));

        disk.add_partition(&request("E1", 2, SizeUnit::M, PartitionKind::Extended))?;
        let err = disk
            .add_partition(&request("E2", 1, SizeUnit::K, PartitionKind::Extended))
            .unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));

        // 4M disk with 3M used: another 2M cannot fit.
        let err = disk
            .add_partition(&request("P2", 2, SizeUnit::M, PartitionKind::Primary))
            .unwrap_err();
        assert!(matches!(err, FsError::NoSpace(_)));

        // The extended holds 2M; a 3M logical overflows it.
        let err = disk
            .add_partition(&request("L9", 3, SizeUnit::M, PartitionKind::Logical))
            .unwrap_err();
        assert!(matches!(err, FsError::NoSpace(_)));
        Ok(())
    }

    #[test]
    fn logical_without_extended_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let disk = VDisk::create(dir.path().join("d1.dsk"), 2, SizeUnit::M, Fit::First)?;
        let err = disk
            .add_partition(&request("L1", 1, SizeUnit::K, PartitionKind::Logical))
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
        Ok(())
    }

    #[test]
    fn rmdisk_removes_the_host_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("gone.dsk");
        let disk = VDisk::create(&path, 1, SizeUnit::K, Fit::Worst)?;
        disk.remove()?;
        assert!(!path.exists());
        assert!(matches!(VDisk::open(&path), Err(FsError::NotFound(_))));
        Ok(())
    }
}
