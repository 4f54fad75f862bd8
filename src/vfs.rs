/*!
Layered virtual filesystem over installed asset bundles.

One Layer maps a bundle's web-asset directory into the composed filesystem;
earlier layers shadow later ones on a path collision. The layer list and the
enabled-plugin map live in an immutable LayerSet snapshot behind a single
mutex. Mutations build a fresh LayerSet and swap the pointer, so a reader
always iterates a complete snapshot; the lock is never held across
filesystem I/O.
*/

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

/// Directory base name that identifies an installable bundle.
pub const BUNDLE_MARKER: &str = "devserve-bundle";

/// Plugin pages enabled out of the box for the statically configured bundles.
static BUILTIN_PLUGINS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "plugins/authenticationPlugin.html",
        "plugins/fileClientPlugin.html",
        "plugins/webEditingPlugin.html",
        "plugins/pageLinksPlugin.html",
        "plugins/preferencesPlugin.html",
        "plugins/taskPlugin.html",
        "plugins/jslintPlugin.html",
        "plugins/csslintPlugin.html",
        "edit/content/imageViewerPlugin.html",
        "edit/content/jsonEditorPlugin.html",
        "shell/plugins/shellPagePlugin.html",
        "search/plugins/searchPagePlugin.html",
    ]
});

/// One bundle's contribution to the virtual filesystem.
#[derive(Debug, Clone)]
pub struct Layer {
    dir: PathBuf,
    plugin_key: String,
}

impl Layer {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<subdir>/bundle.html` for discovered bundles; empty for static layers.
    pub fn plugin_key(&self) -> &str {
        &self.plugin_key
    }

    fn open(&self, rel: &Path) -> io::Result<BundleFile> {
        let full = self.dir.join(rel);
        let file = File::open(&full)?;
        let meta = file.metadata()?;
        Ok(BundleFile {
            path: full,
            len: meta.len(),
            is_dir: meta.is_dir(),
            file,
        })
    }
}

/// An opened file from the composed filesystem.
///
/// Directory handles never expose their contents: `entries` is always empty
/// so clients cannot enumerate bundle-internal layout.
#[derive(Debug)]
pub struct BundleFile {
    path: PathBuf,
    file: File,
    len: u64,
    is_dir: bool,
}

impl BundleFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Directory listing is suppressed for every handle.
    pub fn entries(&self) -> Vec<String> {
        Vec::new()
    }

    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len as usize);
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for BundleFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Immutable snapshot: ordered layers plus the enabled-plugin map.
#[derive(Debug, Default, Clone)]
pub struct LayerSet {
    layers: Vec<Layer>,
    plugins: BTreeMap<String, bool>,
}

impl LayerSet {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn plugins(&self) -> &BTreeMap<String, bool> {
        &self.plugins
    }
}

/// The composed, hot-reloadable filesystem served to clients.
pub struct ChainedFs {
    current: Mutex<Arc<LayerSet>>,
    debug: bool,
}

impl ChainedFs {
    /// Build the static layer list from the immediate subdirectories of
    /// `bundle_root`, sorted lexicographically so override order is
    /// reproducible. An unreadable bundle root is fatal to startup.
    pub fn initialize(bundle_root: &Path, debug: bool) -> io::Result<ChainedFs> {
        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(bundle_root)? {
            let entry = entry?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                if let Ok(name) = entry.file_name().into_string() {
                    names.push(name);
                }
            }
        }
        names.sort();

        let mut layers = Vec::with_capacity(names.len());
        for name in &names {
            let dir = bundle_root.join(name).join("web");
            if debug {
                eprintln!("devserve: bundle path {} added", dir.display());
            }
            layers.push(Layer {
                dir,
                plugin_key: String::new(),
            });
        }

        let mut plugins = BTreeMap::new();
        for key in BUILTIN_PLUGINS.iter() {
            plugins.insert((*key).to_string(), true);
        }

        Ok(ChainedFs {
            current: Mutex::new(Arc::new(LayerSet { layers, plugins })),
            debug,
        })
    }

    /// Empty filesystem, for tests and for contexts built without a bundle root.
    pub fn empty(debug: bool) -> ChainedFs {
        ChainedFs {
            current: Mutex::new(Arc::new(LayerSet::default())),
            debug,
        }
    }

    /// Current snapshot; the lock is held only for the pointer clone.
    pub fn snapshot(&self) -> Arc<LayerSet> {
        let guard = self.current.lock().expect("layer set lock");
        guard.clone()
    }

    /// Copy of the enabled-plugin map at this instant.
    pub fn plugins_snapshot(&self) -> BTreeMap<String, bool> {
        self.snapshot().plugins.clone()
    }

    /// Probe layers in stored order and return the first hit. A miss on a
    /// non-last layer just continues the probe; the last layer's failure is
    /// the overall result.
    pub fn open(&self, logical_path: &str) -> io::Result<BundleFile> {
        let rel = clean_logical_path(logical_path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "invalid path")
        })?;

        let snapshot = self.snapshot();
        let layers = snapshot.layers();
        let last_idx = match layers.len().checked_sub(1) {
            Some(i) => i,
            None => {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no bundle layers"));
            }
        };

        for (i, layer) in layers.iter().enumerate() {
            match layer.open(&rel) {
                Ok(f) => {
                    if self.debug {
                        eprintln!("devserve: hit: {}", logical_path);
                    }
                    return Ok(f);
                }
                Err(e) if i == last_idx => {
                    if self.debug {
                        eprintln!("devserve: miss: {}", logical_path);
                    }
                    return Err(e);
                }
                Err(_) => {}
            }
        }
        Err(io::Error::new(io::ErrorKind::Other, "probe loop exhausted"))
    }

    /// Register a discovered marker directory as a dynamic layer.
    ///
    /// The candidate qualifies only if it holds exactly one entry, a
    /// subdirectory containing `bundle.html`. Re-registering a tracked
    /// directory or plugin key is a no-op. Returns whether a layer was added.
    pub fn register_candidate(&self, path: &Path) -> bool {
        // Shape checks are filesystem I/O: do them before taking the lock.
        let entries: Vec<PathBuf> = match fs::read_dir(path) {
            Ok(rd) => rd.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => return false,
        };
        if entries.len() != 1 {
            return false;
        }
        let subdir = &entries[0];
        if !subdir.join("bundle.html").is_file() {
            return false;
        }
        let subdir_name = match subdir.file_name().and_then(|n| n.to_str()) {
            Some(n) => n.to_string(),
            None => return false,
        };
        let plugin_key = format!("{}/bundle.html", subdir_name);

        let mut guard = self.current.lock().expect("layer set lock");
        let data = guard.clone();
        if data.layers.iter().any(|l| l.dir.as_path() == path) || data.plugins.contains_key(&plugin_key)
        {
            return false;
        }
        let mut next = (*data).clone();
        next.layers.push(Layer {
            dir: path.to_path_buf(),
            plugin_key: plugin_key.clone(),
        });
        next.plugins.insert(plugin_key.clone(), true);
        *guard = Arc::new(next);
        drop(guard);

        if self.debug {
            eprintln!("devserve: added bundle {}", plugin_key);
        }
        true
    }

    /// Drop layers whose backing directory has disappeared, together with
    /// their plugin keys. The stat pass runs against a snapshot outside the
    /// lock; the swap installs a freshly filtered list.
    pub fn prune_stale(&self) {
        let snapshot = self.snapshot();
        let mut dead: Vec<PathBuf> = Vec::new();
        for layer in snapshot.layers() {
            if fs::metadata(&layer.dir).is_err() {
                dead.push(layer.dir.clone());
            }
        }
        if dead.is_empty() {
            return;
        }

        let mut removed_keys: Vec<String> = Vec::new();
        {
            let mut guard = self.current.lock().expect("layer set lock");
            let data = guard.clone();
            let mut next = LayerSet {
                layers: Vec::with_capacity(data.layers.len()),
                plugins: data.plugins.clone(),
            };
            for layer in &data.layers {
                if dead.contains(&layer.dir) {
                    if !layer.plugin_key.is_empty() {
                        next.plugins.remove(&layer.plugin_key);
                        removed_keys.push(layer.plugin_key.clone());
                    }
                } else {
                    next.layers.push(layer.clone());
                }
            }
            *guard = Arc::new(next);
        }

        if self.debug {
            for key in removed_keys {
                eprintln!("devserve: removed bundle {}", key);
            }
        }
    }
}

/// Normalize a request path into a relative path safe to join under a layer
/// root. Rejects traversal segments outright.
fn clean_logical_path(logical: &str) -> Option<PathBuf> {
    if logical.contains('\0') {
        return None;
    }
    let mut rel = PathBuf::new();
    for seg in logical.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." || seg.contains('\\') {
            return None;
        }
        rel.push(seg);
    }
    Some(rel)
}
