#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// What to put into a fixture archive.
pub enum Item<'a> {
    File(&'a str, &'a [u8]),
    Stored(&'a str, &'a [u8]),
    Dir(&'a str),
}

fn options(method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(method)
}

/// Build a ZIP archive in memory.
pub fn build_zip(items: &[Item<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for item in items {
        match *item {
            Item::File(name, body) => {
                writer.start_file(name, options(CompressionMethod::Deflated)).unwrap();
                writer.write_all(body).unwrap();
            }
            Item::Stored(name, body) => {
                writer.start_file(name, options(CompressionMethod::Stored)).unwrap();
                writer.write_all(body).unwrap();
            }
            Item::Dir(name) => {
                writer.add_directory(name, options(CompressionMethod::Stored)).unwrap();
            }
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Offsets of every central directory header in `data`.
pub fn central_headers(data: &[u8]) -> Vec<usize> {
    data.windows(4)
        .enumerate()
        .filter(|(_, window)| *window == b"PK\x01\x02")
        .map(|(offset, _)| offset)
        .collect()
}

/// Overwrite the uncompressed size declared by the `nth` central directory
/// header.
pub fn patch_uncompressed_size(data: &mut [u8], nth: usize, size: u32) {
    let header = central_headers(data)[nth];
    data[header + 24..header + 28].copy_from_slice(&size.to_le_bytes());
}

/// Overwrite the local header offset declared by the `nth` central directory
/// header.
pub fn patch_local_header_offset(data: &mut [u8], nth: usize, offset: u32) {
    let header = central_headers(data)[nth];
    data[header + 42..header + 46].copy_from_slice(&offset.to_le_bytes());
}
