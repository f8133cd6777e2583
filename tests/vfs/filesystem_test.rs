/*!
 * Filesystem Tests
 * Preconditions, config merging and listings over both bundled adapters
 */

use pretty_assertions::assert_eq;
use prefixfs::vfs::{Adapter, Drained, Filesystem, FsConfig, Local, MemoryAdapter, Stream};
use prefixfs::{VfsError, Visibility};
use std::io::Read;
use tempfile::TempDir;

fn local() -> (TempDir, Filesystem) {
    let temp = TempDir::new().unwrap();
    let fs = Filesystem::new(Local::new(temp.path()).unwrap());
    (temp, fs)
}

fn memory() -> Filesystem {
    Filesystem::new(MemoryAdapter::new())
}

/// Run a check against a disk-backed and a memory-backed filesystem
fn on_both(check: impl Fn(&Filesystem)) {
    let (_temp, disk) = local();
    check(&disk);
    check(&memory());
}

fn paths(listing: &[prefixfs::FileMetadata]) -> Vec<&str> {
    listing.iter().map(|m| m.path.as_str()).collect()
}

#[test]
fn test_write_twice_fails() {
    on_both(|fs| {
        let config = FsConfig::default();
        assert!(fs.write("a/b.txt", b"one", &config).unwrap());
        assert!(matches!(
            fs.write("a/b.txt", b"two", &config),
            Err(VfsError::FileExists { .. })
        ));
        assert!(matches!(
            fs.write("./a//b.txt", b"two", &config),
            Err(VfsError::FileExists { .. })
        ));
    });
}

#[test]
fn test_update_then_read() {
    on_both(|fs| {
        let config = FsConfig::default();
        assert!(matches!(
            fs.update("missing", b"x", &config),
            Err(VfsError::FileNotExists { .. })
        ));
        fs.write("f", b"old", &config).unwrap();
        assert!(fs.update("f", b"new", &config).unwrap());
        assert_eq!(fs.read("f").unwrap(), b"new");
    });
}

#[test]
fn test_put_is_an_upsert() {
    on_both(|fs| {
        let config = FsConfig::default();
        assert!(fs.put("p", b"1", &config).unwrap());
        assert!(fs.put("p", b"2", &config).unwrap());
        assert_eq!(fs.read("p").unwrap(), b"2");
    });
}

#[test]
fn test_stream_round_trip_rewinds_first() {
    on_both(|fs| {
        let config = FsConfig::default();
        let mut stream = Stream::from_bytes("streamed");
        let mut head = [0u8; 3];
        stream.read_exact(&mut head).unwrap();

        assert!(fs.write_stream("s", &mut stream, &config).unwrap());
        assert_eq!(fs.read("s").unwrap(), b"streamed");

        let mut replacement = Stream::from_bytes("again");
        replacement.read_exact(&mut head).unwrap();
        assert!(fs.put_stream("s", &mut replacement, &config).unwrap());
        assert_eq!(fs.read_stream("s").unwrap().read_all().unwrap(), b"again");
    });
}

#[test]
fn test_consumed_pipe_passes_through() {
    on_both(|fs| {
        let mut pipe = Stream::pipe(&b"0123456789"[..]);
        let mut head = [0u8; 4];
        pipe.read_exact(&mut head).unwrap();

        assert!(fs.write_stream("pipe", &mut pipe, &FsConfig::default()).unwrap());
        assert_eq!(fs.read("pipe").unwrap(), b"456789");
    });
}

#[test]
fn test_delete_then_read_fails() {
    on_both(|fs| {
        fs.write("gone", b"x", &FsConfig::default()).unwrap();
        assert!(fs.delete("gone").unwrap());
        assert!(matches!(fs.read("gone"), Err(VfsError::FileNotExists { .. })));
        assert!(matches!(fs.delete("gone"), Err(VfsError::FileNotExists { .. })));
    });
}

#[test]
fn test_read_and_delete() {
    on_both(|fs| {
        fs.write("once", b"payload", &FsConfig::default()).unwrap();
        assert_eq!(
            fs.read_and_delete("once").unwrap(),
            Drained {
                contents: b"payload".to_vec(),
                deleted: true
            }
        );
        assert!(!fs.exists("once").unwrap());
        assert!(matches!(
            fs.read_and_delete("once"),
            Err(VfsError::FileNotExists { .. })
        ));
    });
}

#[test]
fn test_rename_rejects_existing_destination() {
    on_both(|fs| {
        let config = FsConfig::default();
        fs.write("from", b"a", &config).unwrap();
        fs.write("to", b"b", &config).unwrap();

        assert!(matches!(fs.rename("from", "to"), Err(VfsError::FileExists { .. })));
        assert!(matches!(fs.rename("nope", "x"), Err(VfsError::FileNotExists { .. })));
        assert!(fs.rename("from", "nested/dest").unwrap());
        assert_eq!(fs.read("nested/dest").unwrap(), b"a");
    });
}

#[test]
fn test_root_handling() {
    on_both(|fs| {
        assert!(!fs.exists("").unwrap());
        assert!(!fs.exists("/").unwrap());
        assert!(matches!(fs.delete_dir(""), Err(VfsError::DirectoryNotExists { .. })));
        assert!(matches!(fs.delete_dir("a/.."), Err(VfsError::DirectoryNotExists { .. })));
        assert!(matches!(fs.read(""), Err(VfsError::FileNotExists { .. })));
    });
}

#[test]
fn test_paths_cannot_escape_the_root() {
    on_both(|fs| {
        let config = FsConfig::default();
        assert!(matches!(
            fs.write("../outside", b"x", &config),
            Err(VfsError::PathOutOfRange { .. })
        ));
        assert!(matches!(
            fs.read("a/../../etc/passwd"),
            Err(VfsError::PathOutOfRange { .. })
        ));
        assert!(matches!(
            fs.list_contents("..", true),
            Err(VfsError::PathOutOfRange { .. })
        ));
    });
}

#[test]
fn test_listing_counts() {
    on_both(|fs| {
        let config = FsConfig::default();
        fs.write("x", b"1", &config).unwrap();
        fs.write("d/y", b"22", &config).unwrap();
        fs.write("d/e/z", b"333", &config).unwrap();

        let recursive = fs.list_contents("", true).unwrap();
        assert_eq!(paths(&recursive), vec!["d", "d/e", "d/e/z", "d/y", "x"]);

        let flat = fs.list_contents("/", false).unwrap();
        assert_eq!(paths(&flat), vec!["d", "x"]);

        let scoped = fs.list_contents("d", false).unwrap();
        assert_eq!(paths(&scoped), vec!["d/e", "d/y"]);
        assert_eq!(scoped[1].size, Some(2));

        assert!(fs.list_contents("missing", true).unwrap().is_empty());
    });
}

#[test]
fn test_filesystem_default_visibility() {
    let fs = Filesystem::new(MemoryAdapter::new())
        .with_config(FsConfig::with_visibility(Visibility::Private));

    fs.write("default", b"x", &FsConfig::default()).unwrap();
    assert_eq!(fs.get_visibility("default").unwrap(), Visibility::Private);

    fs.write("override", b"x", &FsConfig::with_visibility(Visibility::Public))
        .unwrap();
    assert_eq!(fs.get_visibility("override").unwrap(), Visibility::Public);
}

#[test]
fn test_metadata_and_mime() {
    on_both(|fs| {
        fs.write("doc.json", b"", &FsConfig::default()).unwrap();

        let metadata = fs.get_metadata("doc.json").unwrap().unwrap();
        assert!(metadata.is_file());
        assert_eq!(metadata.path, "doc.json");
        assert_eq!(metadata.size, Some(0));
        assert_eq!(fs.get_mime_type("doc.json").unwrap(), "application/json");
        assert!(matches!(
            fs.get_metadata("nope"),
            Err(VfsError::FileNotExists { .. })
        ));
    });
}

#[test]
fn test_error_names_the_adapter() {
    let (_temp, disk) = local();
    let error = disk.read("missing").unwrap_err();
    assert_eq!(error.adapter(), Some("local"));
    assert_eq!(error.path(), Some("missing"));

    let error = memory().read("missing").unwrap_err();
    assert_eq!(error.adapter(), Some(memory().adapter().name()));
}

#[cfg(unix)]
#[test]
#[serial_test::serial]
fn test_concrete_scenario() {
    let (temp, fs) = local();

    assert!(fs
        .write("a/b.txt", b"hello", &FsConfig::with_visibility(Visibility::Public))
        .unwrap());
    assert!(fs.exists("a/b.txt").unwrap());
    assert_eq!(fs.get_mime_type("a/b.txt").unwrap(), "text/plain");
    assert_eq!(fs.get_visibility("a/b.txt").unwrap(), Visibility::Public);

    assert!(fs.rename("a/b.txt", "a/c.txt").unwrap());
    assert!(!fs.exists("a/b.txt").unwrap());
    assert_eq!(fs.read("a/c.txt").unwrap(), b"hello");

    assert!(fs.delete_dir("a").unwrap());
    assert!(!fs.exists("a").unwrap());
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[cfg(unix)]
#[test]
#[serial_test::serial]
fn test_visibility_round_trip() {
    on_both(|fs| {
        fs.write("v", b"x", &FsConfig::default()).unwrap();
        assert!(fs.set_visibility("v", Visibility::Private).unwrap());
        assert_eq!(fs.get_visibility("v").unwrap(), Visibility::Private);
        assert!(fs.set_visibility("v", Visibility::Public).unwrap());
        assert_eq!(fs.get_visibility("v").unwrap(), Visibility::Public);

        assert!(fs
            .create_dir("private", &FsConfig::with_visibility(Visibility::Private))
            .unwrap());
        assert_eq!(fs.get_visibility("private").unwrap(), Visibility::Private);
        assert!(matches!(
            fs.create_dir("private", &FsConfig::default()),
            Err(VfsError::DirectoryExists { .. })
        ));
    });
}
