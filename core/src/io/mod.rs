use std::io::{Read, Seek, Write};
use std::path::Path;

use url::Url;

use crate::error::{Error, Result};

#[cfg(feature = "hdfs")]
pub mod hdfs_io;
pub mod local_fs_io;
pub mod memory_io;
pub mod writable;

#[cfg(feature = "hdfs")]
pub use hdfs_io::HdfsIO;
pub use local_fs_io::LocalFsIO;
pub use memory_io::MemoryStorage;

pub trait SeekRead: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekRead for T {}

/// The narrow set of filesystem operations the split files need.
pub trait SplitStorage {
    /// Creates (or truncates) `path` with the given unix permission bits and,
    /// where the backend has the notion, the given replication factor.
    fn create(
        &self,
        path: &Path,
        permission: u32,
        replication: Option<u16>,
    ) -> Result<PositionedWriter>;

    fn open(&self, path: &Path) -> Result<Box<dyn SeekRead>>;

    fn len(&self, path: &Path) -> Result<u64>;

    fn exists(&self, path: &Path) -> bool;
}

/// Sequential output stream that knows how many bytes went through it.
///
/// Dropping the writer releases the underlying handle, so a stream abandoned on
/// an error path is still closed.
pub struct PositionedWriter {
    inner: Box<dyn Write + Send>,
    pos: u64,
}

impl PositionedWriter {
    pub fn new(inner: Box<dyn Write + Send>) -> Self {
        PositionedWriter { inner, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Flushes and releases the stream.
    pub fn close(mut self) -> Result<()> {
        self.inner.flush()?;
        log::debug!("closed stream after {} bytes", self.pos);
        Ok(())
    }
}

impl Write for PositionedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.pos += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Picks a storage backend from the scheme of `uri`.
///
/// `file://` and `mem://` are always available, `hdfs://` needs the `hdfs`
/// feature. The returned path is the one to hand to the storage.
pub fn storage_for_uri(uri: &str) -> Result<(Box<dyn SplitStorage>, std::path::PathBuf)> {
    let url = Url::parse(uri)?;
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| Error::UnsupportedUri(uri.to_string()))?;
            Ok((Box::new(LocalFsIO::new()), path))
        }
        "mem" => Ok((Box::new(MemoryStorage::new()), url.path().into())),
        #[cfg(feature = "hdfs")]
        "hdfs" => {
            let host = url
                .host_str()
                .ok_or_else(|| Error::UnsupportedUri(uri.to_string()))?;
            let nn = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => format!("{host}:9000"),
            };
            Ok((Box::new(HdfsIO::connect(nn)?), url.path().into()))
        }
        _ => Err(Error::UnsupportedUri(uri.to_string())),
    }
}
