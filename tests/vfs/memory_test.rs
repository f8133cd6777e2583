/*!
 * Memory Adapter Tests
 * Contract checks for the volatile adapter used directly and shared across threads
 */

use std::sync::Arc;
use std::thread;

use prefixfs::vfs::{Adapter, Filesystem, FsConfig, MemoryAdapter};
use prefixfs::{VfsError, Visibility};

#[test]
fn test_memory_basic() {
    let fs = MemoryAdapter::new();
    let config = FsConfig::default();

    assert!(fs.write("test.txt", b"hello", &config).unwrap());
    assert_eq!(fs.read("test.txt").unwrap(), b"hello");

    assert!(fs.exists("test.txt"));
    assert!(!fs.exists("missing.txt"));

    assert!(fs.delete("test.txt").unwrap());
    assert!(!fs.exists("test.txt"));
}

#[test]
fn test_memory_directories() {
    let fs = MemoryAdapter::new();
    let config = FsConfig::default();

    assert!(fs.create_dir("testdir", &config).unwrap());
    assert!(fs.exists("testdir"));

    assert!(fs.create_dir("testdir/nested", &config).unwrap());
    assert!(fs.exists("testdir/nested"));

    fs.write("testdir/file.txt", b"content", &config).unwrap();
    let entries = fs.list_contents("testdir", false).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn test_file_cannot_become_a_parent() {
    let fs = MemoryAdapter::new();
    let config = FsConfig::default();
    fs.write("blocker", b"x", &config).unwrap();

    assert!(matches!(
        fs.write("blocker/child", b"y", &config),
        Err(VfsError::DirectoryCreateFailure { .. })
    ));
    assert!(!fs.create_dir("blocker", &config).unwrap());
}

#[test]
fn test_reading_a_directory_fails() {
    let fs = MemoryAdapter::new();
    fs.create_dir("d", &FsConfig::default()).unwrap();

    assert!(matches!(fs.read("d"), Err(VfsError::FileReadFailure { .. })));
    assert_eq!(fs.get_mime_type("d").unwrap(), "directory");
}

#[test]
fn test_visibility_per_node() {
    let fs = MemoryAdapter::new();
    fs.write("a", b"x", &FsConfig::with_visibility(Visibility::Private))
        .unwrap();
    assert_eq!(fs.get_visibility("a").unwrap(), Visibility::Private);

    fs.update("a", b"y", &FsConfig::default()).unwrap();
    assert_eq!(fs.get_visibility("a").unwrap(), Visibility::Private);

    fs.update("a", b"z", &FsConfig::with_visibility(Visibility::Public))
        .unwrap();
    assert_eq!(fs.get_visibility("a").unwrap(), Visibility::Public);
}

#[test]
fn test_concurrent_writers() {
    let fs = Arc::new(Filesystem::new(MemoryAdapter::new()));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..50 {
                    let path = format!("w{}/f{}", worker, i);
                    fs.write(&path, path.as_bytes(), &FsConfig::default()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.list_contents("", true).unwrap().len(), 8 * 51);
    assert_eq!(fs.read("w3/f7").unwrap(), b"w3/f7");
}

#[test]
fn test_concurrent_create_has_one_winner() {
    let fs = Arc::new(MemoryAdapter::new());

    let winners: usize = (0..8)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || fs.write("race", b"x", &FsConfig::default()).is_ok())
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap() as usize)
        .sum();

    assert_eq!(winners, 1);
}
