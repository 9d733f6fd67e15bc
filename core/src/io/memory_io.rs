use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::io::{PositionedWriter, SeekRead, SplitStorage};

#[derive(Debug, Default)]
struct MemoryFile {
    data: Arc<Mutex<Vec<u8>>>,
    permission: u32,
    replication: Option<u16>,
}

/// In-process storage. Clones share the same files.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<PathBuf, MemoryFile>>>,
}

struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Snapshot of the bytes written to `path` so far.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|f| f.data.lock().clone())
    }

    pub fn permission(&self, path: &Path) -> Option<u32> {
        self.files.lock().get(path).map(|f| f.permission)
    }

    pub fn replication(&self, path: &Path) -> Option<u16> {
        self.files.lock().get(path).and_then(|f| f.replication)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl SplitStorage for MemoryStorage {
    fn create(
        &self,
        path: &Path,
        permission: u32,
        replication: Option<u16>,
    ) -> Result<PositionedWriter> {
        let data = Arc::new(Mutex::new(Vec::new()));
        self.files.lock().insert(
            path.to_path_buf(),
            MemoryFile {
                data: data.clone(),
                permission,
                replication,
            },
        );
        Ok(PositionedWriter::new(Box::new(MemoryWriter { data })))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn SeekRead>> {
        let data = self
            .contents(path)
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn len(&self, path: &Path) -> Result<u64> {
        self.files
            .lock()
            .get(path)
            .map(|f| f.data.lock().len() as u64)
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }
}
