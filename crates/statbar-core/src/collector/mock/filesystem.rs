//! In-memory [`FileSystem`] for exercising the procfs sources off Linux.
//!
//! Clones share one tree, so a test can hand a clone to a source and keep
//! rewriting counters between samples.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::collector::traits::FileSystem;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    File(String),
    Dir,
}

fn not_found(kind: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such {}: {}", kind, path.display()),
    )
}

/// Tree of files and directories keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    nodes: Arc<RwLock<BTreeMap<PathBuf, Node>>>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: &Path, node: Node) {
        let mut nodes = self.write();
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
        nodes.insert(path.to_path_buf(), node);
    }

    /// Writes `content` at `path`, creating missing parents. An existing
    /// file is overwritten.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.insert(path.as_ref(), Node::File(content.into()));
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), Node::Dir);
    }

    /// Removes `path` and, for a directory, everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.write().retain(|p, _| !p.starts_with(path));
    }

    /// Creates `<proc_path>/<pid>/stat`.
    pub fn add_process(&self, proc_path: impl AsRef<Path>, pid: u32, stat: &str) {
        self.add_file(proc_path.as_ref().join(pid.to_string()).join("stat"), stat);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.read().get(path) {
            Some(Node::File(content)) => Ok(content.clone()),
            _ => Err(not_found("file", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.read().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let nodes = self.read();
        if nodes.get(path) != Some(&Node::Dir) {
            return Err(not_found("directory", path));
        }
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}
