use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};
use crate::io::{PositionedWriter, SeekRead, SplitStorage};

/// Split storage on the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct LocalFsIO {}

impl LocalFsIO {
    pub fn new() -> Self {
        LocalFsIO {}
    }
}

impl SplitStorage for LocalFsIO {
    fn create(
        &self,
        path: &Path,
        permission: u32,
        replication: Option<u16>,
    ) -> Result<PositionedWriter> {
        if let Some(replication) = replication {
            log::debug!("ignoring replication {} for local file {:?}", replication, path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::Create {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            options.mode(permission);
            let file = options.open(path).map_err(|source| Error::Create {
                path: path.to_path_buf(),
                source,
            })?;
            // mode() is filtered by the umask and ignored for existing files
            file.set_permissions(fs::Permissions::from_mode(permission))?;
            log::debug!("created {:?} with mode {:o}", path, permission);
            Ok(PositionedWriter::new(Box::new(BufWriter::new(file))))
        }
        #[cfg(not(unix))]
        {
            let _ = permission;
            let file = options.open(path).map_err(|source| Error::Create {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(PositionedWriter::new(Box::new(BufWriter::new(file))))
        }
    }

    fn open(&self, path: &Path) -> Result<Box<dyn SeekRead>> {
        match File::open(path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn len(&self, path: &Path) -> Result<u64> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn create_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("job.split");
        let fs = LocalFsIO::new();

        let mut out = fs.create(&path, 0o644, Some(10)).unwrap();
        out.write_all(b"hello").unwrap();
        out.close().unwrap();

        assert!(fs.exists(&path));
        assert_eq!(fs.len(&path).unwrap(), 5);
        let mut buf = String::new();
        fs.open(&path).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn applies_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.splitmetainfo");
        LocalFsIO::new().create(&path, 0o644, None).unwrap().close().unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(matches!(LocalFsIO::new().open(&path), Err(Error::NotFound(_))));
        assert!(matches!(LocalFsIO::new().len(&path), Err(Error::NotFound(_))));
    }
}
