//! Payload Codec
//!
//! bincode + gzip packing for compressed cache entries.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Serializes `value` with bincode and gzips the result.
///
/// Fails with [`CacheError::Decode`] for types bincode can write but not read
/// back (self-describing types such as `serde_json::Value`), so nothing is
/// ever packed that [`decompress`] would reject.
pub fn compress<T: Serialize + DeserializeOwned>(value: &T) -> Result<Vec<u8>> {
    let raw = bincode::serialize(value).map_err(CacheError::Encode)?;
    bincode::deserialize::<T>(&raw).map_err(CacheError::Decode)?;

    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Reverses [`compress`].
pub fn decompress<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut raw = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(|e| CacheError::Decode(Box::new(bincode::ErrorKind::Io(e))))?;

    bincode::deserialize(&raw).map_err(CacheError::Decode)
}
