// Copyright 2025 Guidemap Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Checksummed binary snapshots
//!
//! **Format:**
//! - Magic number (8 bytes)
//! - bincode payload
//! - BLAKE3 checksum (32 bytes) - covers all preceding data
//!
//! Files are written to a sibling temp file and renamed into place, so a
//! reader never observes a half written snapshot. A snapshot that fails the
//! magic or checksum test is reported as [`GuidemapError::CacheCorrupted`];
//! callers decide whether that is fatal.

use guidemap_core::{GuidemapError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

const MAGIC_SIZE: usize = 8;
const CHECKSUM_SIZE: usize = 32;

/// Serialize `value` to `path` atomically
pub fn write_snapshot<T: Serialize>(path: &Path, magic: &[u8; 8], value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut data = Vec::with_capacity(MAGIC_SIZE);
    data.extend_from_slice(magic);
    bincode::serialize_into(&mut data, value)?;

    let checksum = blake3::hash(&data);
    data.extend_from_slice(checksum.as_bytes());

    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&data)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Read and validate a snapshot written by [`write_snapshot`]
pub fn read_snapshot<T: DeserializeOwned>(path: &Path, magic: &[u8; 8]) -> Result<T> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;

    if data.len() < MAGIC_SIZE + CHECKSUM_SIZE {
        return Err(GuidemapError::corrupted(path, "file too small"));
    }
    if &data[..MAGIC_SIZE] != magic {
        return Err(GuidemapError::corrupted(
            path,
            format!("unexpected magic number {:?}", &data[..MAGIC_SIZE]),
        ));
    }

    let (body, stored_checksum) = data.split_at(data.len() - CHECKSUM_SIZE);
    if blake3::hash(body).as_bytes() != stored_checksum {
        return Err(GuidemapError::corrupted(path, "checksum mismatch"));
    }

    bincode::deserialize(&body[MAGIC_SIZE..])
        .map_err(|e| GuidemapError::corrupted(path, format!("undecodable payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MAGIC: &[u8; 8] = b"GMTEST01";

    #[test]
    fn test_roundtrip_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.snapshot");
        let rows = vec![("C0000001".to_string(), 3u32)];

        write_snapshot(&path, MAGIC, &rows).unwrap();
        let loaded: Vec<(String, u32)> = read_snapshot(&path, MAGIC).unwrap();

        assert_eq!(loaded, rows);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_flipped_byte_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.snapshot");
        write_snapshot(&path, MAGIC, &vec!["a".to_string(), "b".to_string()]).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[MAGIC_SIZE + 2] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let result: Result<Vec<String>> = read_snapshot(&path, MAGIC);
        assert!(matches!(result, Err(GuidemapError::CacheCorrupted { .. })));
    }

    #[test]
    fn test_wrong_magic_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.snapshot");
        write_snapshot(&path, MAGIC, &1u64).unwrap();

        let result: Result<u64> = read_snapshot(&path, b"GMOTHER1");
        assert!(matches!(result, Err(GuidemapError::CacheCorrupted { .. })));
    }

    #[test]
    fn test_truncated_file_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.snapshot");
        std::fs::write(&path, b"GMTEST01").unwrap();

        let result: Result<u64> = read_snapshot(&path, MAGIC);
        assert!(matches!(result, Err(GuidemapError::CacheCorrupted { .. })));
    }
}
