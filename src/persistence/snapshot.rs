//! Snapshot Format
//!
//! A snapshot is one gzip stream holding, bincode-encoded and in this order,
//! the key → value map of live entries and the eleven scalar settings and
//! counters of the cache.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cache::Lifetime;
use crate::error::{CacheError, Result};

/// Upper bound of the deflate expansion ratio. Decoding never reads more
/// than this many bytes per compressed byte on disk.
const MAX_INFLATE_RATIO: u64 = 1032;

/// Fixed-width integers, the same layout as `bincode::serialize`.
fn wire_format() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

// == Snapshot Settings ==
/// Scalar state written after the entries. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    pub cache_size: u64,
    pub sequence: u64,
    pub actions: u64,
    pub reset_after: Option<u64>,
    pub misses: u64,
    pub hits: u64,
    pub debug: bool,
    pub lifetime: Lifetime,
    pub update_interval_secs: u64,
    pub compressed: bool,
    pub double_buffer: bool,
}

// == Snapshot ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub entries: BTreeMap<String, T>,
    pub settings: SnapshotSettings,
}

impl<T: Serialize> Snapshot<T> {
    // == Write ==
    /// Writes the snapshot to `path`, replacing any existing file.
    ///
    /// The stream goes to a temporary file next to `path` that is renamed
    /// over it only once complete; on error the old file is untouched.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(dir)?;

        let mut encoder = GzEncoder::new(BufWriter::new(temp.as_file()), Compression::default());
        wire_format()
            .serialize_into(&mut encoder, self)
            .map_err(|err| match *err {
                bincode::ErrorKind::Io(io) => CacheError::Io(io),
                other => CacheError::Encode(Box::new(other)),
            })?;

        let mut writer = encoder.finish()?;
        writer.flush()?;
        drop(writer);
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|err| CacheError::Io(err.error))?;

        debug!(path = %path.display(), entries = self.entries.len(), "Snapshot written");
        Ok(())
    }
}

impl<T: DeserializeOwned> Snapshot<T> {
    // == Read ==
    /// Reads a snapshot written by [`Snapshot::write_to`].
    ///
    /// A missing file is an I/O error; anything wrong with the stream itself,
    /// including a length prefix larger than the file could hold, is a
    /// decode error.
    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let limit = file
            .metadata()?
            .len()
            .saturating_mul(MAX_INFLATE_RATIO);
        let decoder = GzDecoder::new(BufReader::new(file));

        let snapshot: Self = wire_format()
            .with_limit(limit)
            .deserialize_from(decoder)
            .map_err(CacheError::Decode)?;

        debug!(path = %path.display(), entries = snapshot.entries.len(), "Snapshot read");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    /// Serializes like a `u32` except for 666, which always fails.
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Picky(u32);

    impl Serialize for Picky {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            if self.0 == 666 {
                return Err(serde::ser::Error::custom("cannot encode"));
            }
            serializer.serialize_u32(self.0)
        }
    }

    fn settings() -> SnapshotSettings {
        SnapshotSettings {
            cache_size: 3,
            sequence: 42,
            actions: 17,
            reset_after: None,
            misses: 5,
            hits: 9,
            debug: true,
            lifetime: Lifetime::Seconds(120),
            update_interval_secs: 30,
            compressed: true,
            double_buffer: false,
        }
    }

    fn sample() -> Snapshot<String> {
        let mut entries = BTreeMap::new();
        entries.insert("0025-xml".to_string(), "xml data".to_string());
        entries.insert("0025-xls".to_string(), "xls data".to_string());
        Snapshot {
            entries,
            settings: settings(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");

        sample().write_to(&path).unwrap();
        let restored: Snapshot<String> = Snapshot::read_from(&path).unwrap();

        assert_eq!(restored, sample());
    }

    #[test]
    fn test_file_is_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");
        sample().write_to(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = Snapshot::<String>::read_from(&dir.path().join("nope.snap"));
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn test_truncated_file_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");
        sample().write_to(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let result = Snapshot::<String>::read_from(&path);
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }

    #[test]
    fn test_wrong_value_type_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");
        sample().write_to(&path).unwrap();

        let result = Snapshot::<bool>::read_from(&path);
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }

    #[test]
    fn test_oversized_length_prefix_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forged.snap");

        // One entry whose key claims to be almost u64::MAX bytes long.
        let mut raw = Vec::new();
        raw.extend_from_slice(&1u64.to_le_bytes());
        raw.extend_from_slice(&(u64::MAX - 16).to_le_bytes());
        raw.extend_from_slice(b"abc");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let result = Snapshot::<String>::read_from(&path);
        assert!(matches!(result, Err(CacheError::Decode(_))));
    }

    #[test]
    fn test_matches_plain_bincode_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");
        sample().write_to(&path).unwrap();

        let mut inflated = Vec::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, bincode::serialize(&sample()).unwrap());
    }

    #[test]
    fn test_failed_write_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.snap");

        let mut good = Snapshot {
            entries: BTreeMap::from([("good".to_string(), Picky(1))]),
            settings: settings(),
        };
        good.write_to(&path).unwrap();

        good.entries.insert("bad".to_string(), Picky(666));
        let result = good.write_to(&path);
        assert!(matches!(result, Err(CacheError::Encode(_))));

        let restored: Snapshot<Picky> = Snapshot::read_from(&path).unwrap();
        assert_eq!(restored.entries.len(), 1);
        assert_eq!(restored.entries["good"], Picky(1));

        // No temporary file is left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
