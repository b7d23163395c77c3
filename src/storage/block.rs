use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, Result};

const MAGIC: &[u8; 4] = b"SFDX";
pub const FORMAT_VERSION: u32 = 1;
// magic + version + compression + crc + payload length
const HEADER_SIZE: usize = 4 + 4 + 1 + 4 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,      // Fast, the default for segment files
    Zstd,     // Better ratio, slower
}

impl CompressionType {
    fn tag(self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Lz4 => 1,
            CompressionType::Zstd => 2,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lz4),
            2 => Ok(CompressionType::Zstd),
            other => Err(Error::store(format!("unknown compression tag {}", other))),
        }
    }

    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
            CompressionType::Zstd => zstd::encode_all(data, 3)
                .map_err(|e| Error::store(format!("zstd compression failed: {}", e))),
        }
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Lz4 => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| Error::store(format!("lz4 decompression failed: {}", e))),
            CompressionType::Zstd => zstd::decode_all(data)
                .map_err(|e| Error::store(format!("zstd decompression failed: {}", e))),
        }
    }
}

/// Frame a serialized value:
/// `[magic][version u32][compression u8][crc32 u32][len u64][payload]`.
/// The checksum covers the payload as written, after compression.
pub fn encode_block<T: Serialize>(value: &T, compression: CompressionType) -> Result<Vec<u8>> {
    let raw = bincode::serialize(value)?;
    let payload = compression.compress(&raw)?;

    let mut block = Vec::with_capacity(HEADER_SIZE + payload.len());
    block.extend_from_slice(MAGIC);
    block.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    block.push(compression.tag());
    block.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    block.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    block.extend_from_slice(&payload);
    Ok(block)
}

pub fn decode_block<T: for<'de> Deserialize<'de>>(block: &[u8]) -> Result<T> {
    if block.len() < HEADER_SIZE {
        return Err(Error::store(format!("truncated block: {} bytes", block.len())));
    }
    if &block[0..4] != MAGIC {
        return Err(Error::store("bad block magic"));
    }

    let version = u32::from_le_bytes(read_array(&block[4..8]));
    if version != FORMAT_VERSION {
        return Err(Error::store(format!("unsupported format version {}", version)));
    }

    let compression = CompressionType::from_tag(block[8])?;
    let expected_crc = u32::from_le_bytes(read_array(&block[9..13]));
    let len = u64::from_le_bytes(read_array(&block[13..21])) as usize;

    let payload = &block[HEADER_SIZE..];
    if payload.len() != len {
        return Err(Error::store(format!("block length mismatch: header {} vs {}", len, payload.len())));
    }
    if crc32fast::hash(payload) != expected_crc {
        return Err(Error::store("block checksum mismatch"));
    }

    let raw = compression.decompress(payload)?;
    Ok(bincode::deserialize(&raw)?)
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Write a framed block and fsync it. Returns the CRC32 of the whole file.
pub fn write_block<T: Serialize>(path: &Path, value: &T, compression: CompressionType) -> Result<u32> {
    let block = encode_block(value, compression)?;
    write_synced(path, &block)?;
    Ok(crc32fast::hash(&block))
}

pub fn read_block<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path)
        .map_err(|e| Error::store(format!("cannot read {}: {}", path.display(), e)))?;
    decode_block(&data).map_err(|e| e.with_context(path.display()))
}

pub fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| Error::store(format!("cannot create {}: {}", path.display(), e)))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| Error::store(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn every_codec_restores_the_value() {
        let value: Vec<String> = (0..200).map(|i| format!("term-{}", i % 7)).collect();
        for compression in [CompressionType::None, CompressionType::Lz4, CompressionType::Zstd] {
            let block = encode_block(&value, compression).unwrap();
            let decoded: Vec<String> = decode_block(&block).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn flipped_payload_byte_fails_checksum() {
        let mut block = encode_block(&vec![1u64, 2, 3], CompressionType::None).unwrap();
        let last = block.len() - 1;
        block[last] ^= 0x55;

        let err = decode_block::<Vec<u64>>(&block).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreIo);
    }

    #[test]
    fn truncated_and_foreign_blocks_are_rejected() {
        let block = encode_block(&"payload".to_string(), CompressionType::Lz4).unwrap();
        assert!(decode_block::<String>(&block[..10]).is_err());
        assert!(decode_block::<String>(&block[..block.len() - 1]).is_err());

        let mut foreign = block.clone();
        foreign[0] = b'X';
        assert!(decode_block::<String>(&foreign).is_err());
    }
}
