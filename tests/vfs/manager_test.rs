/*!
 * Manager Tests
 * Prefix routing, cross-backend copy/move and name-based dispatch
 */

use std::sync::Arc;

use pretty_assertions::assert_eq;
use prefixfs::vfs::{CallArg, CallOutput, Filesystem, FsConfig, Local, Manager, MemoryAdapter, Stream};
use prefixfs::{VfsError, Visibility};
use tempfile::TempDir;

fn manager() -> (TempDir, Manager) {
    let temp = TempDir::new().unwrap();
    let manager = Manager::with_filesystems([
        ("local", Filesystem::new(Local::new(temp.path()).unwrap())),
        ("mem", Filesystem::new(MemoryAdapter::new())),
    ])
    .unwrap();
    (temp, manager)
}

#[test]
fn test_cross_backend_move() {
    let (temp, manager) = manager();
    let config = FsConfig::default();
    manager.write("local://docs/a.txt", b"moving", &config).unwrap();

    assert!(manager.move_file("local://docs/a.txt", "mem://archive/a.txt", &config).unwrap());
    assert!(!manager.exists("local://docs/a.txt").unwrap());
    assert!(!temp.path().join("docs/a.txt").exists());
    assert_eq!(manager.read("mem://archive/a.txt").unwrap(), b"moving");
}

#[test]
fn test_cross_backend_move_refuses_existing_destination() {
    let (_temp, manager) = manager();
    let config = FsConfig::default();
    manager.write("local://a", b"source", &config).unwrap();
    manager.write("mem://a", b"existing", &config).unwrap();

    assert!(matches!(
        manager.move_file("local://a", "mem://a", &config),
        Err(VfsError::FileExists { .. })
    ));
    assert_eq!(manager.read("local://a").unwrap(), b"source");
    assert_eq!(manager.read("mem://a").unwrap(), b"existing");
}

#[test]
fn test_copy_keeps_source() {
    let (_temp, manager) = manager();
    let config = FsConfig::with_visibility(Visibility::Private);
    manager.write("mem://src", b"copied", &FsConfig::default()).unwrap();

    assert!(manager.copy("mem://src", "local://dst", &config).unwrap());
    assert_eq!(manager.read("mem://src").unwrap(), b"copied");
    assert_eq!(manager.read("local://dst").unwrap(), b"copied");
    #[cfg(unix)]
    assert_eq!(manager.get_visibility("local://dst").unwrap(), Visibility::Private);
}

#[test]
fn test_same_prefix_move_is_a_rename() {
    let (_temp, manager) = manager();
    let config = FsConfig::default();
    manager.write("mem://a", b"a", &config).unwrap();
    manager.write("mem://b", b"b", &config).unwrap();

    assert!(matches!(
        manager.move_file("mem://a", "mem://b", &config),
        Err(VfsError::FileExists { .. })
    ));
    assert_eq!(manager.read("mem://b").unwrap(), b"b");

    let private = FsConfig::with_visibility(Visibility::Private);
    assert!(manager.move_file("mem://a", "mem://c", &private).unwrap());
    assert!(!manager.exists("mem://a").unwrap());
    assert_eq!(manager.get_visibility("mem://c").unwrap(), Visibility::Private);
}

#[test]
fn test_bad_uris() {
    let (_temp, manager) = manager();
    let config = FsConfig::default();

    assert!(matches!(manager.read("no-prefix"), Err(VfsError::PrefixTypeError)));
    assert!(matches!(
        manager.read("ftp://file"),
        Err(VfsError::PrefixUndefined { .. })
    ));
    assert!(matches!(
        manager.copy("mem://a", "nowhere", &config),
        Err(VfsError::PrefixTypeError)
    ));
    assert!(matches!(
        manager.move_file("ftp://a", "mem://a", &config),
        Err(VfsError::PrefixUndefined { .. })
    ));
}

#[test]
fn test_listing_tags_prefix() {
    let (_temp, manager) = manager();
    let config = FsConfig::default();
    manager.write("local://x", b"1", &config).unwrap();
    manager.write("local://d/y", b"2", &config).unwrap();
    manager.write("local://d/e/z", b"3", &config).unwrap();

    let recursive = manager.list_contents("local://", true).unwrap();
    assert_eq!(recursive.len(), 5);
    assert!(recursive
        .iter()
        .all(|m| m.filesystem.as_deref() == Some("local")));
    assert_eq!(manager.list_contents("local://", false).unwrap().len(), 2);
}

#[test]
fn test_shared_manager_across_threads() {
    let (_temp, manager) = manager();
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                let uri = format!("mem://t{}", i);
                manager.put(&uri, uri.as_bytes(), &FsConfig::default()).unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(manager.list_contents("mem://", false).unwrap().len(), 4);
}

#[test]
fn test_call_dispatch() {
    let (_temp, manager) = manager();

    let output = manager
        .call(
            "write",
            vec![
                "mem://call.txt".into(),
                b"via call".to_vec().into(),
                FsConfig::with_visibility(Visibility::Private).into(),
            ],
        )
        .unwrap();
    assert_eq!(output.as_bool(), Some(true));

    let output = manager
        .call("put_stream", vec!["mem://stream.txt".into(), Stream::from_bytes("s").into()])
        .unwrap();
    assert_eq!(output.as_bool(), Some(true));

    match manager.call("list_contents", vec!["mem://".into(), true.into()]).unwrap() {
        CallOutput::Listing(listing) => assert_eq!(listing.len(), 2),
        other => panic!("unexpected output: {:?}", other),
    }

    match manager.call("get_mime_type", vec!["mem://call.txt".into()]).unwrap() {
        CallOutput::Text(mime) => assert_eq!(mime, "text/plain"),
        other => panic!("unexpected output: {:?}", other),
    }

    let output = manager
        .call("set_visibility", vec!["mem://call.txt".into(), "public".into()])
        .unwrap();
    assert_eq!(output.as_bool(), Some(true));
    assert!(matches!(
        manager.call("set_visibility", vec!["mem://call.txt".into(), "hidden".into()]),
        Err(VfsError::InvalidVisibility { .. })
    ));

    let output = manager
        .call("move", vec!["mem://call.txt".into(), "local://moved.txt".into()])
        .unwrap();
    assert_eq!(output.as_bool(), Some(true));

    let drained = manager
        .call("read_and_delete", vec!["local://moved.txt".into()])
        .unwrap();
    assert_eq!(drained.into_bytes().unwrap(), b"via call");
}

#[test]
fn test_call_errors() {
    let (_temp, manager) = manager();

    assert!(matches!(
        manager.call("read", Vec::new()),
        Err(VfsError::MethodArgumentsUndefined { .. })
    ));
    assert!(matches!(
        manager.call("read", vec![CallArg::Bytes(b"mem://x".to_vec())]),
        Err(VfsError::PathTypeError)
    ));
    assert!(matches!(
        manager.call("chown", vec!["mem://x".into()]),
        Err(VfsError::BadMethodCall { .. })
    ));
    assert!(matches!(
        manager.call("update_stream", vec!["mem://x".into(), b"bytes".to_vec().into()]),
        Err(VfsError::RewindResourceTypeError)
    ));
}
