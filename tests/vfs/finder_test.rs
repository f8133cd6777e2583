/*!
 * Finder Tests
 * Name patterns, exclusions and directory globs over a temp tree
 */

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use prefixfs::vfs::Finder;
use prefixfs::VfsError;
use tempfile::TempDir;

fn tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    for dir in ["src/vfs", "docs", ".git/objects", "build"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    for file in [
        "src/lib.rs",
        "src/vfs/mod.rs",
        "src/vfs/notes.txt",
        "docs/guide.md",
        "docs/.hidden.md",
        ".git/objects/abc",
        "build/out.rs",
        "Cargo.toml",
    ] {
        fs::write(root.join(file), file).unwrap();
    }
    temp
}

fn relative(finder: &Finder) -> Vec<String> {
    let mut found: Vec<String> = finder
        .find()
        .unwrap()
        .into_iter()
        .map(|entry| entry.relative_pathname().to_string())
        .collect();
    found.sort();
    found
}

#[test]
fn test_find_files_by_glob() {
    let temp = tree();
    let finder = Finder::new().files().name("*.rs").unwrap().in_dir(temp.path()).unwrap();

    assert_eq!(relative(&finder), vec!["build/out.rs", "src/lib.rs", "src/vfs/mod.rs"]);
}

#[test]
fn test_vcs_directories_are_skipped() {
    let temp = tree();
    let finder = Finder::new().in_dir(temp.path()).unwrap();
    assert!(relative(&finder).iter().all(|path| !path.starts_with(".git")));

    let with_vcs = Finder::new().include_vcs().in_dir(temp.path()).unwrap();
    assert!(relative(&with_vcs).contains(&".git/objects/abc".to_string()));
}

#[test]
fn test_exclude_and_not_name() {
    let temp = tree();
    let finder = Finder::new()
        .files()
        .exclude("build")
        .not_name("*.txt")
        .unwrap()
        .in_dir(temp.path())
        .unwrap();

    assert_eq!(
        relative(&finder),
        vec!["Cargo.toml", "docs/.hidden.md", "docs/guide.md", "src/lib.rs", "src/vfs/mod.rs"]
    );
}

#[test]
fn test_regex_names_and_hidden_files() {
    let temp = tree();

    let glob = Finder::new().name("*.md").unwrap().in_dir(temp.path()).unwrap();
    assert_eq!(relative(&glob), vec!["docs/guide.md"]);

    let regex = Finder::new().name("/\\.md$/").unwrap().in_dir(temp.path()).unwrap();
    assert_eq!(relative(&regex), vec!["docs/.hidden.md", "docs/guide.md"]);

    let case_insensitive = Finder::new().name("/^CARGO/i").unwrap().in_dir(temp.path()).unwrap();
    assert_eq!(relative(&case_insensitive), vec!["Cargo.toml"]);

    assert!(matches!(
        Finder::new().name("/(unclosed/"),
        Err(VfsError::InvalidPattern { .. })
    ));
}

#[test]
fn test_children_come_before_parents() {
    let temp = tree();
    let found = Finder::new().in_dir(temp.path().join("src")).unwrap().find().unwrap();

    let position = |name: &str| {
        found
            .iter()
            .position(|entry| entry.relative_pathname() == name)
            .unwrap()
    };
    assert!(position("vfs/mod.rs") < position("vfs"));
    assert_eq!(found.len(), 4);

    let dir = &found[position("vfs")];
    assert!(dir.is_dir());
    assert_eq!(dir.relative_path(), "");
    let file = &found[position("vfs/notes.txt")];
    assert_eq!(file.relative_path(), "vfs");
    assert_eq!(file.stem(), "notes");
    assert_eq!(file.contents().unwrap(), b"src/vfs/notes.txt");
}

#[test]
fn test_custom_filter_and_count() {
    let temp = tree();
    let finder = Finder::new()
        .files()
        .filter(|entry| entry.file_name().len() > 6)
        .in_dir(temp.path())
        .unwrap();

    assert_eq!(finder.count().unwrap(), 4);
}

#[test]
fn test_directory_globs() {
    let temp = tree();
    let pattern = temp.path().join("{src,docs}");

    let finder = Finder::new().dirs().in_dir(&pattern).unwrap();
    assert_eq!(relative(&finder), vec!["vfs"]);

    let nested = temp.path().join("s*/v?s");
    let found = Finder::new().files().in_dir(&nested).unwrap().find().unwrap();
    assert_eq!(found.len(), 2);

    assert!(matches!(
        Finder::new().in_dir(temp.path().join("nothing*")),
        Err(VfsError::DirectoryNotExists { .. })
    ));
}

#[test]
fn test_search_requires_directory() {
    assert!(matches!(Finder::new().count(), Err(VfsError::FindInPathUndefined)));
    assert!(matches!(
        Finder::new().in_dir(Path::new("/definitely/not/here")),
        Err(VfsError::DirectoryNotExists { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_linked_directories_are_reported_but_not_walked() {
    let temp = tree();
    std::os::unix::fs::symlink(temp.path().join("src"), temp.path().join("docs/src-link")).unwrap();

    let found = Finder::new().in_dir(temp.path().join("docs")).unwrap().find().unwrap();
    let link = found
        .iter()
        .find(|entry| entry.relative_pathname() == "src-link")
        .unwrap();
    assert!(link.is_dir());
    assert!(found
        .iter()
        .all(|entry| !entry.relative_pathname().starts_with("src-link/")));

    let files = Finder::new().files().in_dir(temp.path().join("docs")).unwrap();
    assert_eq!(relative(&files), vec![".hidden.md", "guide.md"]);
}
