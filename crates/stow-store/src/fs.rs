//! Filesystem-backed store.
//!
//! Each key occupies exactly one file at `<root>/<key>`. Keys containing `/`
//! map onto nested directories, created on demand.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::codec::Serializable;
use crate::error::{StoreError, StoreResult};
use crate::keys::validate_key;
use crate::traits::Store;

/// Prefix and suffix of in-flight temporary files written by `set`. Keys
/// whose last segment matches are rejected so `list` never hides a value.
const TEMP_PREFIX: &str = ".stow-";
const TEMP_SUFFIX: &str = ".tmp";

/// A store rooted at a local directory.
///
/// Writes go to a temporary file beside the target and are renamed into
/// place, so readers observe either the old value or the new one, never a
/// partial file. Deleting an absent key fails with
/// [`StoreError::KeyNotFound`].
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(StoreError::Configuration(
                "filesystem root path not specified".into(),
            ));
        }
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        let name = key.rsplit('/').next().unwrap_or(key);
        if is_temp_file(name) {
            return Err(StoreError::InvalidKey {
                key: key.to_string(),
                reason: format!("names matching {TEMP_PREFIX}*{TEMP_SUFFIX} are reserved"),
            });
        }
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }
}

fn is_temp_file(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

fn not_found_or(key: &str, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::not_found(key)
    } else {
        StoreError::Io(err)
    }
}

impl Store for FsStore {
    fn get(&self, key: &str, dst: &mut dyn Serializable) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if path.is_dir() {
            return Err(StoreError::not_found(key));
        }
        let data = fs::read(&path).map_err(|e| not_found_or(key, e))?;
        dst.deserialize(&data)
    }

    fn set(&self, key: &str, val: &dyn Serializable) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let data = val.serialize()?;

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(parent)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(key, path = %path.display(), len = data.len(), "fs set");
        Ok(())
    }

    fn del(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        if path.is_dir() {
            return Err(StoreError::not_found(key));
        }
        fs::remove_file(&path).map_err(|e| not_found_or(key, e))?;
        debug!(key, "fs del");
        Ok(())
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| match e.into_io_error() {
                Some(io) => StoreError::Io(io),
                None => StoreError::backend("filesystem", "directory walk failed"),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if is_temp_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
