//! Fixed-record binary codec over the host file.
//!
//! Every on-disk structure is a packed little-endian record written at an
//! absolute byte offset. bincode's legacy configuration (fixed-width
//! integers, little-endian, no length prefixes for arrays) reproduces that
//! layout exactly, so the records here are byte-for-byte stable across runs.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FsResult;

/// Serialize `record` at `offset`, opening and closing the file around the
/// single write.
pub fn write_record<T, P>(path: P, offset: u64, record: &T) -> FsResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let mut file = OpenOptions::new().write(true).create(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    bincode::serialize_into(&mut file, record)?;
    Ok(())
}

/// Deserialize one record of type `T` from `offset`. Reading past the end of
/// the file surfaces as an i/o error.
pub fn read_record<T, P>(path: P, offset: u64) -> FsResult<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let mut file = BufReader::new(File::open(path)?);
    file.seek(SeekFrom::Start(offset))?;
    Ok(bincode::deserialize_from(&mut file)?)
}

/// Raw byte write at an absolute offset; used for the bitmap regions, which
/// are plain ASCII runs rather than structured records.
pub fn write_bytes<P: AsRef<Path>>(path: P, offset: u64, bytes: &[u8]) -> FsResult<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    Ok(())
}

pub fn read_bytes<P: AsRef<Path>>(path: P, offset: u64, len: usize) -> FsResult<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}
