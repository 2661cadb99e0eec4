use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hdc_types::Leaf;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::names::validate_file_name;
use crate::traits::{GroupHandle, StorageGroup};

/// Magic bytes at the start of every leaf file.
const LEAF_MAGIC: &[u8; 4] = b"HDCL";

/// Header size: 4 bytes magic + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// File-system backed storage group.
///
/// Groups are directories and leaves are files. On-disk leaf format:
/// ```text
/// [4 bytes: magic "HDCL"]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Leaf)]
/// ```
/// Leaves are written to a temporary file in the same directory and then
/// renamed into place, so a reader never sees a partially written leaf.
#[derive(Clone, Debug)]
pub struct DirectoryGroup {
    dir: PathBuf,
}

impl DirectoryGroup {
    /// Open (or create) a group rooted at the given directory.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.is_file() {
            return Err(StoreError::NodeKindMismatch {
                group: dir.display().to_string(),
                name: String::new(),
                expected: "group",
            });
        }
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Wrap this group in a shared [`GroupHandle`].
    pub fn handle(&self) -> GroupHandle {
        Arc::new(self.clone())
    }

    /// Directory backing this group.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn not_found(&self, name: &str) -> StoreError {
        StoreError::NotFound {
            group: self.path(),
            name: name.to_string(),
        }
    }

    fn mismatch(&self, name: &str, expected: &'static str) -> StoreError {
        StoreError::NodeKindMismatch {
            group: self.path(),
            name: name.to_string(),
            expected,
        }
    }

    fn list(&self, want_dirs: bool) -> StoreResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Hidden entries are temp files or foreign to the store.
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type()?.is_dir() == want_dirs {
                names.insert(name);
            }
        }
        Ok(names)
    }
}

fn encode_leaf(value: &Leaf) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(LEAF_MAGIC);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

fn decode_leaf(path: &Path, bytes: &[u8]) -> StoreResult<Leaf> {
    if bytes.len() < HEADER_SIZE || &bytes[..4] != LEAF_MAGIC {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: "missing leaf header".into(),
        });
    }
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[4..HEADER_SIZE]);
    let expected = u32::from_le_bytes(crc_bytes);
    let payload = &bytes[HEADER_SIZE..];
    let actual = crc32fast::hash(payload);
    if expected != actual {
        return Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("CRC mismatch: expected {expected:#010x}, got {actual:#010x}"),
        });
    }
    bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl StorageGroup for DirectoryGroup {
    fn path(&self) -> String {
        self.dir.display().to_string()
    }

    fn open_or_create_subgroup(&self, name: &str) -> StoreResult<GroupHandle> {
        validate_file_name(name)?;
        let path = self.dir.join(name);
        if path.is_file() {
            return Err(self.mismatch(name, "group"));
        }
        if !path.is_dir() {
            fs::create_dir(&path)?;
            debug!(group = %path.display(), "created group directory");
        }
        Ok(Arc::new(Self { dir: path }))
    }

    fn open_subgroup(&self, name: &str) -> StoreResult<GroupHandle> {
        validate_file_name(name)?;
        let path = self.dir.join(name);
        if !path.is_dir() {
            return Err(self.not_found(name));
        }
        Ok(Arc::new(Self { dir: path }))
    }

    fn list_leaf_names(&self) -> StoreResult<BTreeSet<String>> {
        self.list(false)
    }

    fn list_group_names(&self) -> StoreResult<BTreeSet<String>> {
        self.list(true)
    }

    fn read_leaf(&self, name: &str) -> StoreResult<Leaf> {
        validate_file_name(name)?;
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(self.not_found(name));
        }
        let bytes = fs::read(&path)?;
        decode_leaf(&path, &bytes)
    }

    fn write_leaf(&self, name: &str, value: &Leaf) -> StoreResult<()> {
        validate_file_name(name)?;
        if matches!(value, Leaf::Null) {
            return Err(StoreError::UnsupportedType {
                name: name.to_string(),
                type_name: value.type_name().to_string(),
            });
        }
        let path = self.dir.join(name);
        if path.is_dir() {
            return Err(self.mismatch(name, "leaf"));
        }
        let bytes = encode_leaf(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<bool> {
        validate_file_name(name)?;
        let path = self.dir.join(name);
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
            Ok(true)
        } else if path.is_file() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
