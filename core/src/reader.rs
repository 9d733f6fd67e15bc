//! Read side of the split files, for schedulers and the tasks that run splits.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};

use crate::conf::SplitWriterConf;
use crate::error::{Error, Result};
use crate::io::writable::{read_text, read_vint};
use crate::io::{SeekRead, SplitStorage};
use crate::meta::{
    job_split_file, job_split_meta_file, SplitMetaInfo, TaskSplitIndex, TaskSplitMetaInfo,
    META_SPLIT_FILE_HEADER, META_SPLIT_VERSION, SPLIT_FILE_HEADER, SPLIT_FILE_HEADER_LEN,
    SPLIT_VERSION,
};
use crate::registry::SplitCodecRegistry;
use crate::split::Split;

/// Loads the meta index of a submitted job, one entry per split.
pub fn read_split_meta_info(
    storage: &dyn SplitStorage,
    job_submit_dir: &Path,
    conf: &SplitWriterConf,
) -> Result<Vec<TaskSplitMetaInfo>> {
    let meta_file = job_split_meta_file(job_submit_dir);
    let max = conf.max_meta_info_size;
    let size = storage.len(&meta_file)?;
    if max > 0 && size > max as u64 {
        return Err(Error::MetaInfoTooLarge {
            path: meta_file,
            size,
            max: max as u64,
        });
    }

    let mut input = storage.open(&meta_file)?;
    let split_file = job_split_file(job_submit_dir);
    let info = read_meta_stream(&mut input)?
        .into_iter()
        .map(|meta| TaskSplitMetaInfo::new(split_file.clone(), meta))
        .collect::<Vec<_>>();
    log::debug!("read {} split meta records from {:?}", info.len(), meta_file);
    Ok(info)
}

/// Parses a whole meta stream: header, version, count, records.
pub fn read_meta_stream<R: Read + ?Sized>(input: &mut R) -> Result<Vec<SplitMetaInfo>> {
    let mut header = [0u8; META_SPLIT_FILE_HEADER.len()];
    input.read_exact(&mut header)?;
    if &header != META_SPLIT_FILE_HEADER {
        return Err(Error::Format("invalid header on split meta file".to_string()));
    }
    let version = read_vint(input)?;
    if version != META_SPLIT_VERSION {
        return Err(Error::Format(format!("unsupported split meta version {version}")));
    }
    let count = read_vint(input)?;
    if count < 0 {
        return Err(Error::Format(format!("negative split count {count}")));
    }
    (0..count).map(|_| SplitMetaInfo::read(input)).collect()
}

/// Random access to the records of a split data file.
pub struct SplitFileReader {
    path: PathBuf,
    input: Box<dyn SeekRead>,
    registry: SplitCodecRegistry,
    len: u64,
}

impl SplitFileReader {
    /// Opens `path` and checks its header.
    pub fn open(
        storage: &dyn SplitStorage,
        path: &Path,
        registry: SplitCodecRegistry,
    ) -> Result<Self> {
        let mut input = storage.open(path)?;
        let len = input.seek(SeekFrom::End(0))?;
        input.seek(SeekFrom::Start(0))?;
        read_split_header(&mut input)?;
        Ok(SplitFileReader {
            path: path.to_path_buf(),
            input,
            registry,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decodes the record starting at `offset`.
    pub fn read_split_at(&mut self, offset: u64) -> Result<Box<dyn Split>> {
        if offset >= self.len {
            return Err(Error::Format(format!(
                "split offset {} beyond end of {:?} ({} bytes)",
                offset, self.path, self.len
            )));
        }
        self.input.seek(SeekFrom::Start(offset))?;
        self.read_next()
    }

    pub fn read_split(&mut self, index: &TaskSplitIndex) -> Result<Box<dyn Split>> {
        self.read_split_at(index.start_offset)
    }

    /// Every record from the header to the end of the file, with its offset.
    pub fn read_all(&mut self) -> Result<Vec<(u64, Box<dyn Split>)>> {
        let mut pos = self.input.seek(SeekFrom::Start(SPLIT_FILE_HEADER_LEN))?;
        let mut splits = Vec::new();
        while pos < self.len {
            let split = self.read_next()?;
            splits.push((pos, split));
            pos = self.input.stream_position()?;
        }
        Ok(splits)
    }

    fn read_next(&mut self) -> Result<Box<dyn Split>> {
        let type_tag = read_text(&mut self.input)?;
        let codec = self.registry.get(&type_tag)?;
        codec.decode(&mut self.input)
    }
}

pub fn read_split_header<R: Read + ?Sized>(input: &mut R) -> Result<()> {
    let mut header = [0u8; SPLIT_FILE_HEADER.len()];
    input.read_exact(&mut header)?;
    if &header != SPLIT_FILE_HEADER {
        return Err(Error::Format("invalid header on split file".to_string()));
    }
    let version = input.read_i32::<BigEndian>()?;
    if version != SPLIT_VERSION {
        return Err(Error::Format(format!("unsupported split version {version}")));
    }
    Ok(())
}
