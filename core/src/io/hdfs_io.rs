use std::path::Path;

use hdrs::Client;

use crate::error::{Error, Result};
use crate::io::{PositionedWriter, SeekRead, SplitStorage};

pub struct HdfsIO {
    nn: String,
    fs: Client,
}

impl HdfsIO {
    /// Connects to the namenode named by the `namenode` environment variable.
    pub fn new() -> Result<Self> {
        let nn = match std::env::var("namenode") {
            Ok(nn) => nn,
            Err(_) => {
                return Err(Error::HdfsNamenode);
            }
        };
        Self::connect(nn + ":9000")
    }

    pub fn connect(nn: String) -> Result<Self> {
        let fs = match Client::connect(nn.as_str()) {
            Ok(fs) => fs,
            Err(_) => {
                return Err(Error::HdfsConnect(nn));
            }
        };
        Ok(HdfsIO { nn, fs })
    }

    fn path_str<'a>(&self, path: &'a Path) -> Result<&'a str> {
        path.to_str()
            .ok_or_else(|| Error::HdfsFileOpen(format!("{}: non utf-8 path {:?}", self.nn, path)))
    }
}

impl SplitStorage for HdfsIO {
    fn create(
        &self,
        path: &Path,
        permission: u32,
        replication: Option<u16>,
    ) -> Result<PositionedWriter> {
        let p = self.path_str(path)?;
        let mut oo = self.fs.open_file();
        oo.write(true).create(true).truncate(true);
        if let Some(replication) = replication {
            oo.with_replication(replication as usize);
        }
        let file = match oo.open(p) {
            Ok(file) => file,
            Err(_) => {
                return Err(Error::HdfsFileOpen(self.nn.clone()));
            }
        };
        // hdfs applies the namenode umask, the requested mode is informational
        log::debug!("created hdfs://{}{} (mode {:o})", self.nn, p, permission);
        Ok(PositionedWriter::new(Box::new(file)))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn SeekRead>> {
        let p = self.path_str(path)?;
        match self.fs.open_file().read(true).open(p) {
            Ok(file) => Ok(Box::new(file)),
            Err(_) => Err(Error::HdfsFileOpen(self.nn.to_string())),
        }
    }

    fn len(&self, path: &Path) -> Result<u64> {
        let p = self.path_str(path)?;
        match self.fs.metadata(p) {
            Ok(meta) => Ok(meta.len()),
            Err(_) => Err(Error::HdfsRead(self.nn.to_string())),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        match path.to_str() {
            Some(p) => self.fs.metadata(p).is_ok(),
            None => false,
        }
    }
}
