use std::fs;

use devserve::{ChainedFs, BUNDLE_MARKER};

fn write_file(path: &std::path::Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn prune_removes_exactly_the_dead_layer_and_its_key() {
    let dir = tempfile::tempdir().unwrap();
    let marker_one = dir.path().join("first").join(BUNDLE_MARKER);
    let marker_two = dir.path().join("second").join(BUNDLE_MARKER);
    write_file(&marker_one.join("one/bundle.html"), "1");
    write_file(&marker_two.join("two/bundle.html"), "2");

    let cfs = ChainedFs::empty(false);
    assert!(cfs.register_candidate(&marker_one));
    assert!(cfs.register_candidate(&marker_two));
    assert_eq!(cfs.snapshot().layers().len(), 2);

    fs::remove_dir_all(&marker_one).unwrap();
    cfs.prune_stale();

    let snapshot = cfs.snapshot();
    assert_eq!(snapshot.layers().len(), 1);
    assert_eq!(snapshot.layers()[0].plugin_key(), "two/bundle.html");

    let plugins = cfs.plugins_snapshot();
    assert!(!plugins.contains_key("one/bundle.html"));
    assert_eq!(plugins.get("two/bundle.html"), Some(&true));
}

#[test]
fn prune_with_nothing_stale_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(BUNDLE_MARKER);
    write_file(&marker.join("keep/bundle.html"), "x");

    let cfs = ChainedFs::empty(false);
    assert!(cfs.register_candidate(&marker));
    cfs.prune_stale();
    assert_eq!(cfs.snapshot().layers().len(), 1);
    assert_eq!(cfs.plugins_snapshot().len(), 1);
}

#[test]
fn pruned_static_layer_keeps_builtin_plugin_map_intact() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("alpha/web/x.txt"), "a");
    write_file(&root.path().join("beta/web/x.txt"), "b");

    let cfs = ChainedFs::initialize(root.path(), false).unwrap();
    let plugins_before = cfs.plugins_snapshot();
    assert!(!plugins_before.is_empty());

    fs::remove_dir_all(root.path().join("alpha")).unwrap();
    cfs.prune_stale();

    // Static layers carry no plugin key; the enabled map is untouched.
    assert_eq!(cfs.plugins_snapshot(), plugins_before);
    assert_eq!(cfs.snapshot().layers().len(), 1);
}

#[test]
fn removed_bundle_can_be_rediscovered_after_reinstall() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join(BUNDLE_MARKER);
    write_file(&marker.join("p/bundle.html"), "v1");

    let cfs = ChainedFs::empty(false);
    assert!(cfs.register_candidate(&marker));

    fs::remove_dir_all(&marker).unwrap();
    cfs.prune_stale();
    assert!(cfs.snapshot().layers().is_empty());

    write_file(&marker.join("p/bundle.html"), "v2");
    assert!(cfs.register_candidate(&marker));
    assert_eq!(
        cfs.open("/p/bundle.html").unwrap().read_all().unwrap(),
        b"v2"
    );
}
