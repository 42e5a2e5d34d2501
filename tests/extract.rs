mod common;

use std::fs;
use std::path::Path;

use common::{Item, build_zip, patch_local_header_offset, patch_uncompressed_size};
use zipfetch::{
    ArchiveError, ExtractError, ExtractOptions, SkipReason, extract_to_disk,
    try_unzip_all_files_to_memory, unzip_all_files_to_memory,
};

fn extract(data: &[u8], root: &Path) -> Result<zipfetch::ExtractReport, ExtractError> {
    extract_to_disk(data, root, &ExtractOptions::default())
}

/// Every regular file below `dir`, relative to it.
fn files_under(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else { return };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                out.push(path.strip_prefix(base).unwrap().to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

#[test]
fn single_nested_entry_creates_its_directory() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("dest");
    let data = build_zip(&[Item::File("a/b.txt", b"bee")]);

    let report = extract(&data, &root).unwrap();

    assert_eq!(report.files, vec![root.join("a").join("b.txt")]);
    assert!(report.skipped.is_empty());
    assert!(root.join("a").is_dir());
    assert_eq!(fs::read(root.join("a/b.txt")).unwrap(), b"bee");
    assert_eq!(files_under(&root), ["a/b.txt"]);
}

#[test]
fn round_trip_reproduces_file_contents() {
    let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let items = [
        Item::Dir("project/"),
        Item::File("project/README.md", b"# readme\n"),
        Item::File("project/src/main.rs", b"fn main() {}\n"),
        Item::Stored("project/assets/raw.bin", b"\x00\x01\x02\x03"),
        Item::File("project/assets/big.bin", &big),
        Item::File("top.txt", b""),
    ];
    let data = build_zip(&items);
    let temp = tempfile::tempdir().unwrap();

    let report = extract(&data, temp.path()).unwrap();

    let expected: Vec<_> = items
        .iter()
        .filter_map(|item| match *item {
            Item::File(name, body) | Item::Stored(name, body) => Some((name, body)),
            Item::Dir(_) => None,
        })
        .collect();
    assert_eq!(report.files.len(), expected.len());
    for ((name, body), written) in expected.iter().zip(&report.files) {
        assert_eq!(*written, temp.path().join(name));
        assert_eq!(fs::read(written).unwrap(), *body, "{name}");
    }
}

#[test]
fn parent_traversal_never_writes_outside_root() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("outer").join("dest");
    let data = build_zip(&[
        Item::File("../../evil.txt", b"pwned"),
        Item::File("safe/../../escape.txt", b"pwned"),
        Item::File("ok.txt", b"fine"),
    ]);

    let report = extract(&data, &root).unwrap();

    assert_eq!(report.files, vec![root.join("ok.txt")]);
    assert_eq!(files_under(temp.path()), ["outer/dest/ok.txt"]);

    let rejected: Vec<_> = report.unsafe_entries().map(|e| e.name.as_str()).collect();
    assert_eq!(rejected, ["../../evil.txt", "safe/../../escape.txt"]);
}

#[test]
fn directory_entries_are_not_results() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[Item::Dir("a/"), Item::Dir("a/b/")]);

    let report = extract(&data, temp.path()).unwrap();
    assert!(report.files.is_empty());
    assert!(report.skipped.is_empty());
    assert!(unzip_all_files_to_memory(&data).is_empty());
}

#[test]
fn empty_archive_is_an_empty_success() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[]);

    let report = extract(&data, temp.path()).unwrap();
    assert_eq!(report, zipfetch::ExtractReport::default());
    assert!(try_unzip_all_files_to_memory(&data).unwrap().is_empty());
}

#[test]
fn corrupted_body_has_no_usable_entries() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("dest");
    let data = build_zip(&[Item::File("a.txt", b"aaaa"), Item::File("b.txt", b"bbbb")]);
    let truncated = &data[..data.len() / 2];

    assert!(unzip_all_files_to_memory(truncated).is_empty());
    assert!(matches!(
        try_unzip_all_files_to_memory(truncated),
        Err(ArchiveError::Malformed(_))
    ));
    assert!(matches!(
        extract(truncated, &root),
        Err(ExtractError::Archive(ArchiveError::Malformed(_)))
    ));
    assert!(!root.exists());

    let garbage = b"<html>404 Not Found</html>";
    assert!(unzip_all_files_to_memory(garbage).is_empty());
}

#[test]
fn damaged_entry_does_not_stop_the_rest() {
    let temp = tempfile::tempdir().unwrap();
    let mut data = build_zip(&[
        Item::File("first.txt", b"1"),
        Item::File("second.txt", b"2"),
    ]);
    patch_local_header_offset(&mut data, 0, 0x7FFF_0000);

    let report = extract(&data, temp.path()).unwrap();

    assert_eq!(report.files, vec![temp.path().join("second.txt")]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "first.txt");
    assert_eq!(report.skipped[0].reason, SkipReason::UnreadableHeader);
}

#[test]
fn checksum_failure_skips_only_that_entry() {
    let temp = tempfile::tempdir().unwrap();
    let mut data = build_zip(&[
        Item::Stored("bad.txt", b"PAYLOAD-123"),
        Item::Stored("good.txt", b"fine"),
    ]);
    let at = data
        .windows(11)
        .position(|w| w == b"PAYLOAD-123")
        .unwrap();
    data[at + 10] = b'4';

    let report = extract(&data, temp.path()).unwrap();

    assert_eq!(report.files, vec![temp.path().join("good.txt")]);
    assert!(matches!(report.skipped[0].reason, SkipReason::Extraction(_)));
    assert!(!temp.path().join("bad.txt").exists());

    let blobs = unzip_all_files_to_memory(&data);
    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].name, "good.txt");
}

#[test]
fn directory_creation_failure_aborts_extraction() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("a"), b"a regular file").unwrap();
    let data = build_zip(&[Item::File("a/b.txt", b"b"), Item::File("c.txt", b"c")]);

    let err = extract(&data, temp.path()).unwrap_err();

    assert!(matches!(
        err,
        ExtractError::DirectoryCreation { ref path, .. } if path == &temp.path().join("a")
    ));
    assert!(!temp.path().join("c.txt").exists());
}

#[test]
fn strip_root_folder_removes_common_prefix() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[
        Item::Dir("miniz-master/"),
        Item::File("miniz-master/miniz.c", b"c"),
        Item::File("miniz-master/examples/example1.c", b"e"),
    ]);
    let options = ExtractOptions {
        strip_root_folder: true,
    };

    let report = extract_to_disk(&data, temp.path(), &options).unwrap();

    assert_eq!(
        report.files,
        vec![
            temp.path().join("miniz.c"),
            temp.path().join("examples/example1.c"),
        ]
    );
}

#[test]
fn strip_root_folder_uses_the_top_level_folder_of_a_nested_first_entry() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[
        Item::File("proj/src/a.rs", b"a"),
        Item::File("proj/README", b"r"),
        Item::File("proj/src/b.rs", b"b"),
    ]);
    let options = ExtractOptions {
        strip_root_folder: true,
    };

    extract_to_disk(&data, temp.path(), &options).unwrap();

    assert_eq!(files_under(temp.path()), ["README", "src/a.rs", "src/b.rs"]);
}

#[test]
fn strip_root_folder_keeps_paths_without_a_shared_root() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[
        Item::File("proj/src/a.rs", b"a"),
        Item::File("other/README", b"r"),
    ]);
    let options = ExtractOptions {
        strip_root_folder: true,
    };

    extract_to_disk(&data, temp.path(), &options).unwrap();

    assert_eq!(files_under(temp.path()), ["other/README", "proj/src/a.rs"]);
}

#[test]
fn duplicate_names_last_write_wins() {
    let temp = tempfile::tempdir().unwrap();
    let mut data = build_zip(&[
        Item::File("dup1.txt", b"first"),
        Item::File("dup2.txt", b"second"),
    ]);
    while let Some(at) = data.windows(8).position(|w| w == b"dup2.txt") {
        data[at + 3] = b'1';
    }

    let report = extract(&data, temp.path()).unwrap();

    let path = temp.path().join("dup1.txt");
    assert_eq!(report.files, vec![path.clone(), path.clone()]);
    assert_eq!(fs::read(&path).unwrap(), b"second");
}

#[test]
fn extracting_twice_overwrites_with_identical_content() {
    let temp = tempfile::tempdir().unwrap();
    let data = build_zip(&[Item::File("x/y.txt", b"same")]);

    let first = extract(&data, temp.path()).unwrap();
    let second = extract(&data, temp.path()).unwrap();

    assert_eq!(first, second);
    assert_eq!(fs::read(temp.path().join("x/y.txt")).unwrap(), b"same");
}

#[test]
fn memory_mode_keeps_raw_names_in_archive_order() {
    let data = build_zip(&[
        Item::Dir("dir/"),
        Item::File("dir/one.txt", b"1"),
        Item::File("../two.txt", b"2"),
        Item::Stored("three.bin", b"\x03"),
    ]);

    let blobs = unzip_all_files_to_memory(&data);

    let names: Vec<_> = blobs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["dir/one.txt", "../two.txt", "three.bin"]);
    assert_eq!(blobs[2].data, b"\x03");
}

#[test]
fn memory_mode_skips_entries_over_the_size_bound() {
    let mut data = build_zip(&[Item::Stored("huge.bin", b"h"), Item::Stored("small.txt", b"s")]);
    patch_uncompressed_size(&mut data, 0, 0x8000_0000);

    let blobs = try_unzip_all_files_to_memory(&data).unwrap();

    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].name, "small.txt");
    assert!(zipfetch::archive::MAX_IN_MEMORY_SIZE < 0x8000_0000);
}
