use diskscope_scan::{ScanConfig, ScanError, Walker, WarningKind};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_sized(path: &Path, size: usize) {
    fs::write(path, vec![b'z'; size]).unwrap();
}

#[test]
fn test_walk_is_complete_and_folder_sizes_match() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("a/b/c")).unwrap();
    fs::create_dir_all(root.join("d")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();

    write_sized(&root.join("top.bin"), 11);
    write_sized(&root.join("a/one.bin"), 100);
    write_sized(&root.join("a/b/two.bin"), 200);
    write_sized(&root.join("a/b/c/three.bin"), 300);
    write_sized(&root.join("d/four.bin"), 4000);
    write_sized(&root.join("d/zero.bin"), 0);

    let inventory = Walker::new().scan(&ScanConfig::new(root)).unwrap();

    assert_eq!(inventory.file_count(), 6);
    assert_eq!(inventory.total_size(), 11 + 100 + 200 + 300 + 4000);
    // Zero-size files stay in the inventory.
    assert!(inventory.files.iter().any(|f| f.name == "zero.bin" && f.size == 0));

    let size_of = |name: &str| {
        inventory
            .folders
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.size)
            .unwrap()
    };
    assert_eq!(size_of("a"), 600);
    assert_eq!(size_of("d"), 4000);
    assert_eq!(size_of("empty"), 0);
    assert_eq!(inventory.folders.len(), 3);

    // Folder sizes add up with root-level files to the total.
    let folder_total: u64 = inventory.folders.iter().map(|f| f.size).sum();
    let root_total: u64 = inventory.root_files().map(|f| f.size).sum();
    assert_eq!(folder_total + root_total, inventory.total_size());
}

#[test]
fn test_paths_are_unique_and_absolute() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("x/y")).unwrap();
    for i in 0..20 {
        write_sized(&root.join(format!("x/y/f{i}.dat")), i);
    }

    let inventory = Walker::new().scan(&ScanConfig::new(root)).unwrap();

    let mut paths: Vec<_> = inventory.files.iter().map(|f| f.path.clone()).collect();
    assert!(paths.iter().all(|p| p.is_absolute()));
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 20);
}

#[test]
fn test_extensions_recorded() {
    let temp = TempDir::new().unwrap();
    write_sized(&temp.path().join("Movie.MKV"), 3);
    write_sized(&temp.path().join("README"), 3);

    let inventory = Walker::new().scan(&ScanConfig::new(temp.path())).unwrap();

    let movie = inventory.files.iter().find(|f| f.name == "Movie.MKV").unwrap();
    assert_eq!(movie.extension, ".mkv");
    let readme = inventory.files.iter().find(|f| f.name == "README").unwrap();
    assert_eq!(readme.extension, "no-extension");
}

#[test]
fn test_missing_root_is_access_error() {
    let temp = TempDir::new().unwrap();
    let result = Walker::new().scan(&ScanConfig::new(temp.path().join("nope")));

    let err = result.unwrap_err();
    assert!(err.is_access_error());
    assert!(matches!(err, ScanError::NotFound { .. }));
}

#[cfg(unix)]
#[test]
fn test_unreadable_subtree_is_skipped_with_warning() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("open")).unwrap();
    fs::create_dir_all(root.join("locked/inner")).unwrap();
    write_sized(&root.join("open/visible.bin"), 10);
    write_sized(&root.join("locked/hidden.bin"), 20);
    write_sized(&root.join("locked/inner/deeper.bin"), 30);

    let locked = root.join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still list the directory; nothing to check then.
    let enforced = fs::read_dir(&locked).is_err();

    let result = Walker::new().scan(&ScanConfig::new(root));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let inventory = result.unwrap();

    if enforced {
        assert_eq!(inventory.file_count(), 1);
        assert_eq!(inventory.files[0].name, "visible.bin");
        assert!(inventory.warnings.iter().any(|w| {
            w.path.ends_with("locked")
                && matches!(w.kind, WarningKind::PermissionDenied | WarningKind::ReadError)
        }));
        let locked_folder = inventory.folders.iter().find(|f| f.name == "locked").unwrap();
        assert_eq!(locked_folder.size, 0);
    } else {
        assert_eq!(inventory.file_count(), 3);
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_not_inventoried() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_sized(&root.join("real.bin"), 5);
    std::os::unix::fs::symlink(root.join("real.bin"), root.join("link.bin")).unwrap();

    let inventory = Walker::new().scan(&ScanConfig::new(root)).unwrap();

    assert_eq!(inventory.file_count(), 1);
    assert_eq!(inventory.files[0].name, "real.bin");
}
