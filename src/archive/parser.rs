//! ZIP container reader over an in-memory buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all entries
//! 4. For extraction, read each entry's Local File Header and data
//!
//! The whole central directory is parsed once by [`ZipArchive::open`]. Local
//! headers are only looked at when an entry is accessed, so a single damaged
//! entry does not prevent reading the others.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::ops::Range;
use std::path::Path;

use crate::error::ArchiveError;

use super::decompress;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// An opened ZIP archive borrowing its bytes.
///
/// Dropping the archive releases everything it holds, so there is no
/// explicit close.
#[derive(Debug)]
pub struct ZipArchive<'a> {
    data: &'a [u8],
    entries: Vec<ArchiveEntry>,
}

impl<'a> ZipArchive<'a> {
    /// Validate `data` as a ZIP container and read its central directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Malformed`] if no end of central directory
    /// record can be found, the archive spans several disks, or the central
    /// directory cannot be read.
    pub fn open(data: &'a [u8]) -> Result<Self, ArchiveError> {
        let (eocd, eocd_offset) = find_eocd(data)?;

        if eocd.is_multi_disk() {
            return Err(ArchiveError::malformed("multi-disk archives are not supported"));
        }

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = read_zip64_eocd(data, eocd_offset)?;
            if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
                return Err(ArchiveError::malformed("multi-disk archives are not supported"));
            }
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_range = checked_range(cd_offset, cd_size, data.len())
            .ok_or_else(|| ArchiveError::malformed("central directory lies outside the archive"))?;
        let cd_data = &data[cd_range];

        // Every header takes at least CDFH_MIN_SIZE bytes, so a huge declared
        // count cannot be honoured by a small directory.
        if total_entries > (cd_data.len() / CDFH_MIN_SIZE) as u64 {
            return Err(ArchiveError::malformed(format!(
                "central directory of {} bytes cannot hold {} entries",
                cd_data.len(),
                total_entries
            )));
        }

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data);
        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor).map_err(|err| {
                ArchiveError::malformed(format!("central directory entry {index}: {err}"))
            })?;
            entries.push(entry);
        }

        tracing::debug!(entries = entries.len(), "opened archive");
        Ok(Self { data, entries })
    }

    /// Number of entries listed in the central directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the central directory lists no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Describe the entry at `index`.
    ///
    /// Fails if the index is out of range or the entry's local header is
    /// damaged. Callers are expected to skip such entries.
    pub fn stat(&self, index: usize) -> Result<&ArchiveEntry, ArchiveError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(ArchiveError::IndexOutOfRange(index))?;
        self.data_range(index, entry)?;
        Ok(entry)
    }

    /// Iterate over all entries in central directory order, without
    /// validating local headers.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter()
    }

    /// Decompress the entry at `index` into a new buffer.
    pub fn extract_to_memory(&self, index: usize) -> Result<Vec<u8>, ArchiveError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(ArchiveError::IndexOutOfRange(index))?;
        let range = self.data_range(index, entry)?;
        decompress::decompress(entry, &self.data[range])
    }

    /// Decompress the entry at `index` and write it to `dest`, replacing any
    /// existing file.
    ///
    /// The data is fully decompressed and verified before `dest` is touched.
    /// A partially written file is removed again.
    pub fn extract_to_file(&self, index: usize, dest: &Path) -> Result<(), ArchiveError> {
        let data = self.extract_to_memory(index)?;
        write_or_remove(dest, |file| {
            file.write_all(&data)?;
            file.flush()
        })?;
        Ok(())
    }

    /// Get the byte range of the entry's compressed data.
    ///
    /// The Local File Header has variable-length fields (file name, extra
    /// field) that may differ from the Central Directory entry, so the data
    /// offset has to be computed from the local header itself.
    fn data_range(
        &self,
        index: usize,
        entry: &ArchiveEntry,
    ) -> Result<Range<usize>, ArchiveError> {
        let corrupt = |reason: &str| ArchiveError::CorruptEntry {
            index,
            reason: reason.to_string(),
        };

        let lfh_range = checked_range(entry.lfh_offset, LFH_SIZE as u64, self.data.len())
            .ok_or_else(|| corrupt("local header lies outside the archive"))?;
        let lfh = &self.data[lfh_range];

        // Verify LFH signature (PK\x03\x04)
        if &lfh[0..4] != LFH_SIGNATURE {
            return Err(corrupt("invalid local header signature"));
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = Cursor::new(&lfh[26..]);
        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        let data_offset =
            entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        checked_range(data_offset, entry.compressed_size, self.data.len())
            .ok_or_else(|| corrupt("entry data extends past the end of the archive"))
    }
}

/// Find and parse the End of Central Directory record.
///
/// The simple case without an archive comment is tried first. Otherwise the
/// tail of the buffer is searched backwards for the signature, accepting the
/// last record whose declared comment fits in the buffer.
fn find_eocd(data: &[u8]) -> Result<(EndOfCentralDirectory, usize), ArchiveError> {
    if data.len() < EndOfCentralDirectory::SIZE {
        return Err(ArchiveError::malformed("buffer is too small to be a ZIP archive"));
    }

    let offset = data.len() - EndOfCentralDirectory::SIZE;
    let tail = &data[offset..];
    if &tail[0..4] == EndOfCentralDirectory::SIGNATURE && tail[20..22] == [0, 0] {
        return Ok((EndOfCentralDirectory::from_bytes(tail)?, offset));
    }

    let search_start = data
        .len()
        .saturating_sub(MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE);

    for i in (search_start..=offset).rev() {
        if &data[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
            continue;
        }
        let comment_len = u16::from_le_bytes([data[i + 20], data[i + 21]]) as usize;
        if i + EndOfCentralDirectory::SIZE + comment_len <= data.len() {
            return Ok((EndOfCentralDirectory::from_bytes(&data[i..])?, i));
        }
    }

    Err(ArchiveError::malformed("end of central directory not found"))
}

/// Read the ZIP64 End of Central Directory record.
///
/// Called when the regular EOCD indicates ZIP64 extensions are needed
/// (fields set to 0xFFFF or 0xFFFFFFFF). The locator sits immediately
/// before the regular EOCD.
fn read_zip64_eocd(data: &[u8], eocd_offset: usize) -> Result<Zip64EOCD, ArchiveError> {
    let locator_offset = eocd_offset
        .checked_sub(Zip64EOCDLocator::SIZE)
        .ok_or_else(|| ArchiveError::malformed("missing ZIP64 locator"))?;
    let locator = Zip64EOCDLocator::from_bytes(&data[locator_offset..eocd_offset])?;
    if locator.disk_with_eocd64 != 0 || locator.total_disks > 1 {
        return Err(ArchiveError::malformed("multi-disk archives are not supported"));
    }

    let range = checked_range(locator.eocd64_offset, Zip64EOCD::MIN_SIZE as u64, data.len())
        .ok_or_else(|| {
            ArchiveError::malformed("ZIP64 end of central directory lies outside the archive")
        })?;
    Zip64EOCD::from_bytes(&data[range])
}

/// Parse a Central Directory File Header from a cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ArchiveEntry, ArchiveError> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(ArchiveError::malformed("invalid central directory header signature"));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    let is_directory = name.ends_with('/') || external_attrs & DOS_DIRECTORY_ATTR != 0;

    let mut extra_bytes = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra_bytes)?;
    let mut extra = Cursor::new(extra_bytes.as_slice());

    while extra.position() + 4 <= extra_field_length as u64 {
        let header_id = extra.read_u16::<LittleEndian>()?;
        let field_size = extra.read_u16::<LittleEndian>()? as u64;
        let field_end = extra.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            // Fields are present only if the corresponding header field is
            // saturated, and always in this order.
            if uncompressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                uncompressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                compressed_size = extra.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && extra.position() + 8 <= field_end {
                lfh_offset = extra.read_u64::<LittleEndian>()?;
            }
        }
        extra.set_position(field_end);
    }

    // Skip over the file comment
    let mut comment = vec![0u8; file_comment_length as usize];
    cursor.read_exact(&mut comment)?;

    Ok(ArchiveEntry {
        name,
        is_directory,
        uncompressed_size,
        compressed_size,
        compression_method: CompressionMethod::from_u16(compression_method),
        flags,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
    })
}

/// Create `dest` and fill it with `write`, deleting it again if that fails.
fn write_or_remove(
    dest: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let mut file = File::create(dest)?;
    if let Err(err) = write(&mut file) {
        drop(file);
        if let Err(remove_err) = fs::remove_file(dest) {
            tracing::debug!(dest = %dest.display(), %remove_err, "cannot remove partial file");
        }
        return Err(err);
    }
    Ok(())
}

/// `offset..offset + len` if it fits inside a buffer of `total` bytes.
fn checked_range(offset: u64, len: u64, total: usize) -> Option<Range<usize>> {
    let end = offset.checked_add(len)?;
    if end > total as u64 {
        return None;
    }
    Some(offset as usize..end as usize)
}
