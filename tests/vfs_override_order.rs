use std::fs;
use std::sync::Arc;

use devserve::ChainedFs;

fn write_file(path: &std::path::Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn earliest_layer_wins_and_prune_reveals_next() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/x.html"), "alpha content");
    write_file(&root.path().join("beta/web/x.html"), "beta content");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    let got = cfs.open("/x.html").unwrap().read_all().unwrap();
    assert_eq!(got, b"alpha content");

    // Remove alpha on disk; until a stale pass runs the layer list is
    // unchanged, afterwards beta becomes visible.
    fs::remove_dir_all(root.path().join("alpha")).unwrap();
    cfs.prune_stale();
    let got = cfs.open("/x.html").unwrap().read_all().unwrap();
    assert_eq!(got, b"beta content");
}

#[test]
fn static_order_is_lexicographic_not_creation_order() {
    let root = tempfile::tempdir().unwrap();
    // Create in reverse order; probing must still prefer "aaa".
    write_file(&root.path().join("zzz/web/f.txt"), "from zzz");
    write_file(&root.path().join("aaa/web/f.txt"), "from aaa");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    let got = cfs.open("/f.txt").unwrap().read_all().unwrap();
    assert_eq!(got, b"from aaa");
}

#[test]
fn miss_on_every_layer_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/present.txt"), "x");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    assert!(cfs.open("/absent.txt").is_err());
    assert!(cfs.open("/present.txt").is_ok());
}

#[test]
fn file_in_later_layer_only_is_still_served() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/a-only.txt"), "a");
    write_file(&root.path().join("beta/web/b-only.txt"), "b");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    assert_eq!(cfs.open("/b-only.txt").unwrap().read_all().unwrap(), b"b");
}

#[test]
fn directory_handles_expose_no_entries() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/sub/inner.html"), "secret");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    let dir = cfs.open("/sub").unwrap();
    assert!(dir.is_dir());
    assert!(dir.entries().is_empty());
}

#[test]
fn readers_hold_a_consistent_snapshot_across_prune() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/x.html"), "alpha");
    write_file(&root.path().join("beta/web/x.html"), "beta");

    let cfs = Arc::new(ChainedFs::initialize(root.path(), false).unwrap());
    let snapshot = cfs.snapshot();
    assert_eq!(snapshot.layers().len(), 2);

    fs::remove_dir_all(root.path().join("alpha")).unwrap();
    cfs.prune_stale();

    // The old snapshot still lists both layers; the store moved on.
    assert_eq!(snapshot.layers().len(), 2);
    assert_eq!(cfs.snapshot().layers().len(), 1);
}
