/*!
Local filesystem storage adapter implementation.
*/

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{StorageAdapter, StoredEntry};
use crate::{StorageError, StorageResult};

/// Hidden file in each directory listing its entries in first-save order.
const ORDER_MANIFEST: &str = ".order";

/// Local filesystem storage adapter
///
/// This implementation stores each entry as a file on the local filesystem.
/// It automatically creates parent directories if they don't exist, writes
/// through a temporary file so readers never see a half-written entry, and
/// keeps a small `.order` manifest per directory so sequences come back in
/// the order entries were first saved.
///
/// # Example
/// ```rust
/// use shelf_core::storage::{LocalFileStorage, StorageAdapter};
///
/// # let dir = tempfile::tempdir()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path());
/// // Will create any missing directories
/// storage.save(br#"{"id":"1"}"#, "app/user/1.json")?;
/// assert!(storage.exists("app/user"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    /// Optional base directory for all entries
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Create a new local file storage adapter without a base directory
    ///
    /// Paths are resolved against the current working directory.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a new local file storage adapter with a base directory
    ///
    /// All paths will be resolved relative to the base directory.
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// The base directory, if one was configured
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Resolve the full path for a given storage path
    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    /// Ensure the parent directory exists, creating it if necessary
    ///
    /// Returns the parent and, when directories had to be created, the
    /// outermost one of them.
    fn ensure_parent_dir(&self, path: &Path) -> StorageResult<(PathBuf, Option<PathBuf>)> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if parent.exists() {
            return Ok((parent.to_path_buf(), None));
        }

        let outermost = parent
            .ancestors()
            .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
            .last()
            .map(Path::to_path_buf);
        fs::create_dir_all(parent).map_err(|e| StorageError::io(display(parent), e))?;
        Ok((parent.to_path_buf(), outermost))
    }
}

impl Default for LocalFileStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn file_name(path: &Path) -> StorageResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| StorageError::backend(format!("no file name in {}", path.display())))
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Visible file names directly inside `dir`
fn visible_files(dir: &Path) -> StorageResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let entries = fs::read_dir(dir).map_err(|e| StorageError::io(display(dir), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(display(dir), e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| StorageError::io(display(&entry.path()), e))?
            .is_file();
        if let Some(name) = entry.file_name().to_str() {
            if is_file && !is_hidden(name) {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}

fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> StorageResult<()> {
    let mut staged = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(display(dir), e))?;
    staged
        .write_all(data)
        .map_err(|e| StorageError::io(display(staged.path()), e))?;
    staged
        .persist(target)
        .map_err(|e| StorageError::io(display(target), e.error))?;
    Ok(())
}

/// Undo `create_dir_all` from `dir` up to and including `outermost`
///
/// Directories that are no longer empty are left alone.
fn remove_created_dirs(dir: &Path, outermost: &Path) {
    for created in dir.ancestors() {
        if fs::remove_dir(created).is_err() || created == outermost {
            break;
        }
    }
}

fn read_manifest(dir: &Path) -> StorageResult<Vec<String>> {
    let manifest = dir.join(ORDER_MANIFEST);
    match fs::read_to_string(&manifest) {
        Ok(text) => Ok(text
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(StorageError::io(display(&manifest), e)),
    }
}

fn append_to_manifest(dir: &Path, name: &str) -> StorageResult<()> {
    let manifest = dir.join(ORDER_MANIFEST);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&manifest)
        .map_err(|e| StorageError::io(display(&manifest), e))?;
    writeln!(file, "{name}").map_err(|e| StorageError::io(display(&manifest), e))
}

fn rewrite_manifest(dir: &Path, names: &[String]) -> StorageResult<()> {
    let manifest = dir.join(ORDER_MANIFEST);
    let mut text = names.join("\n");
    text.push('\n');
    fs::write(&manifest, text).map_err(|e| StorageError::io(display(&manifest), e))
}

/// Manifest order first, then anything the manifest does not know about by name
fn ordered_names(dir: &Path) -> StorageResult<Vec<String>> {
    let mut on_disk = visible_files(dir)?;
    let mut ordered = Vec::with_capacity(on_disk.len());
    for name in read_manifest(dir)? {
        if on_disk.remove(&name) {
            ordered.push(name);
        }
    }
    ordered.extend(on_disk);
    Ok(ordered)
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> StorageResult<()> {
        let full_path = self.resolve_path(path);
        let name = file_name(&full_path)?;
        let (parent, created) = self.ensure_parent_dir(&full_path)?;
        let is_new = !full_path.exists();

        if let Err(e) = write_atomically(&parent, &full_path, data) {
            if let Some(outermost) = created {
                remove_created_dirs(&parent, &outermost);
            }
            return Err(e);
        }

        // the entry is stored; a stale manifest only costs ordering
        if is_new {
            if let Err(e) = append_to_manifest(&parent, &name) {
                warn!(path = %full_path.display(), error = %e, "Failed to record entry order");
            }
        }

        debug!(path = %full_path.display(), bytes = data.len(), "Saved entry");
        Ok(())
    }

    fn load(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::Missing(path.to_string()),
            _ => StorageError::io(display(&full_path), e),
        })
    }

    fn load_sequence(&self, path: &str) -> StorageResult<Vec<StoredEntry>> {
        let dir = self.resolve_path(path);
        if !dir.is_dir() {
            return Err(StorageError::Missing(path.to_string()));
        }

        ordered_names(&dir)?
            .into_iter()
            .map(|name| {
                let file = dir.join(&name);
                let data = fs::read(&file).map_err(|e| StorageError::io(display(&file), e))?;
                Ok(StoredEntry { name, data })
            })
            .collect()
    }

    fn exists(&self, path: &str) -> bool {
        let full_path = self.resolve_path(path);
        full_path.exists()
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        let full_path = self.resolve_path(path);
        if !full_path.is_file() {
            return Err(StorageError::Missing(path.to_string()));
        }

        fs::remove_file(&full_path).map_err(|e| StorageError::io(display(&full_path), e))?;

        let Some(parent) = full_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };
        let name = file_name(&full_path)?;
        let remaining: Vec<String> = read_manifest(parent)?
            .into_iter()
            .filter(|entry| *entry != name)
            .collect();

        let has_children = fs::read_dir(parent)
            .map_err(|e| StorageError::io(display(parent), e))?
            .filter_map(|entry| entry.ok())
            .any(|entry| !entry.file_name().to_string_lossy().starts_with('.'));

        if has_children {
            rewrite_manifest(parent, &remaining)?;
        } else {
            // last entry gone: drop the directory so the collection stops existing
            let manifest = parent.join(ORDER_MANIFEST);
            if manifest.exists() {
                fs::remove_file(&manifest).map_err(|e| StorageError::io(display(&manifest), e))?;
            }
            if self.base_dir.as_deref() != Some(parent) {
                fs::remove_dir(parent).map_err(|e| StorageError::io(display(parent), e))?;
            }
        }

        debug!(path = %full_path.display(), "Deleted entry");
        Ok(())
    }

    fn clear(&self, root: &str) -> StorageResult<()> {
        let escapes = Path::new(root)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if root.is_empty() || escapes {
            return Err(StorageError::backend(format!(
                "refusing to clear '{root}' outside the storage base"
            )));
        }
        let full_path = self.resolve_path(root);

        let result = if full_path.is_dir() {
            fs::remove_dir_all(&full_path)
        } else if full_path.exists() {
            fs::remove_file(&full_path)
        } else {
            return Ok(());
        };
        result.map_err(|e| StorageError::io(display(&full_path), e))?;

        debug!(path = %full_path.display(), "Cleared root");
        Ok(())
    }

    fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        let dir = self.resolve_path(path);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(display(&dir), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(display(&dir), e))?;
            if let Some(name) = entry.file_name().to_str() {
                if !is_hidden(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
