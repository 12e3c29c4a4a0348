use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{KvBackend, StorageError, StorageResult};

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io { path: path.display().to_string(), source }
}

/// In-process slots. Nothing survives the process; used by tests and by embedders that persist
/// elsewhere.
#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.read().len() }

    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// All slots in one JSON object file at `<dir>/storage.json`.
///
/// The whole map is rewritten on every mutation through a temp file and rename, so a crash leaves
/// either the old or the new document. A file that does not parse is treated as empty.
pub struct FileKv {
    path: PathBuf,
    map: RwLock<BTreeMap<String, String>>,
    /// Serializes writers so renames land in mutation order
    write_lock: Mutex<()>,
}

impl FileKv {
    pub const FILE_NAME: &'static str = "storage.json";

    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let path = dir.join(Self::FILE_NAME);
        let map = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    warn!(target: "adopta::storage", path = %path.display(), error = %e, "corrupt storage file; starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_err(&path, e)),
        };
        debug!(target: "adopta::storage", path = %path.display(), slots = map.len(), "storage opened");
        Ok(Self { path, map: RwLock::new(map), write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path { &self.path }

    fn flush(&self) -> StorageResult<()> {
        let _w = self.write_lock.lock();
        let bytes = {
            let m = self.map.read();
            serde_json::to_vec_pretty(&*m)?
        };
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))?;
        Ok(())
    }
}

impl KvBackend for FileKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let existed = self.map.write().remove(key).is_some();
        if existed { self.flush() } else { Ok(()) }
    }
}
