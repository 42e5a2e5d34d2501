//! Entry payload decoding.

use std::io::Read;

use flate2::Crc;
use flate2::read::DeflateDecoder;

use crate::error::ArchiveError;

use super::structures::{ArchiveEntry, CompressionMethod};

/// Upper bound on the buffer reserved up front, whatever the header claims.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// Decode the compressed bytes of `entry` and verify them against the
/// central directory's size and CRC-32.
pub fn decompress(entry: &ArchiveEntry, data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if entry.is_encrypted() {
        return Err(ArchiveError::Encrypted);
    }

    let expected = usize::try_from(entry.uncompressed_size)
        .map_err(|_| ArchiveError::TooLarge(entry.uncompressed_size))?;

    let output = match entry.compression_method {
        CompressionMethod::Stored => data.to_vec(),
        CompressionMethod::Deflate => {
            let mut output = Vec::with_capacity(expected.min(MAX_PREALLOC));
            // One byte past the declared size is enough to detect a lie.
            DeflateDecoder::new(data)
                .take(entry.uncompressed_size.saturating_add(1))
                .read_to_end(&mut output)
                .map_err(ArchiveError::Decompression)?;
            output
        }
        CompressionMethod::Unknown(method) => {
            return Err(ArchiveError::UnsupportedCompression(method));
        }
    };

    if output.len() != expected {
        return Err(ArchiveError::SizeMismatch {
            expected: entry.uncompressed_size,
            actual: output.len() as u64,
        });
    }

    let mut crc = Crc::new();
    crc.update(&output);
    if crc.sum() != entry.crc32 {
        return Err(ArchiveError::ChecksumMismatch {
            expected: entry.crc32,
            actual: crc.sum(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn entry(method: CompressionMethod, body: &[u8], compressed: &[u8]) -> ArchiveEntry {
        let mut crc = Crc::new();
        crc.update(body);
        ArchiveEntry {
            name: "file.bin".into(),
            is_directory: false,
            uncompressed_size: body.len() as u64,
            compressed_size: compressed.len() as u64,
            compression_method: method,
            flags: 0,
            crc32: crc.sum(),
            lfh_offset: 0,
            last_mod_time: 0,
            last_mod_date: 0,
        }
    }

    fn deflate(body: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_deflate_entries() {
        let body = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        let compressed = deflate(&body);
        let entry = entry(CompressionMethod::Deflate, &body, &compressed);
        assert_eq!(decompress(&entry, &compressed).unwrap(), body);
    }

    #[test]
    fn stored_entries_are_copied() {
        let entry = entry(CompressionMethod::Stored, b"raw", b"raw");
        assert_eq!(decompress(&entry, b"raw").unwrap(), b"raw");
    }

    #[test]
    fn checksum_is_verified() {
        let mut entry = entry(CompressionMethod::Stored, b"raw", b"raw");
        entry.crc32 ^= 1;
        assert!(matches!(
            decompress(&entry, b"raw"),
            Err(ArchiveError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn declared_size_is_enforced() {
        let body = vec![7u8; 4096];
        let compressed = deflate(&body);
        let mut entry = entry(CompressionMethod::Deflate, &body, &compressed);
        entry.uncompressed_size = 100;
        assert!(matches!(
            decompress(&entry, &compressed),
            Err(ArchiveError::SizeMismatch { expected: 100, actual: 101 })
        ));
    }

    #[test]
    fn rejects_unknown_methods_and_encryption() {
        let unknown = entry(CompressionMethod::Unknown(14), b"x", b"x");
        assert!(matches!(
            decompress(&unknown, b"x"),
            Err(ArchiveError::UnsupportedCompression(14))
        ));

        let mut encrypted = entry(CompressionMethod::Stored, b"x", b"x");
        encrypted.flags |= 1;
        assert!(matches!(decompress(&encrypted, b"x"), Err(ArchiveError::Encrypted)));
    }

    #[test]
    fn corrupt_deflate_stream_fails() {
        let body = b"payload payload payload";
        let mut compressed = deflate(body);
        compressed.truncate(compressed.len() / 2);
        let entry = entry(CompressionMethod::Deflate, body, &compressed);
        assert!(decompress(&entry, &compressed).is_err());
    }
}
