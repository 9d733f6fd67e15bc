//! Split file layout and the per-split index records of the meta file.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::writable::{read_text, read_vint, read_vlong, write_text, write_vint, write_vlong};

pub const SPLIT_FILE_HEADER: &[u8; 3] = b"SPL";
pub const META_SPLIT_FILE_HEADER: &[u8; 8] = b"META-SPL";
pub const META_SPLIT_VERSION: i32 = 1;
pub const SPLIT_VERSION: i32 = META_SPLIT_VERSION;
/// Magic plus the big-endian version.
pub const SPLIT_FILE_HEADER_LEN: u64 = SPLIT_FILE_HEADER.len() as u64 + 4;

pub const JOB_SPLIT: &str = "job.split";
pub const JOB_SPLIT_METAINFO: &str = "job.splitmetainfo";
/// rw-r--r--
pub const JOB_FILE_PERMISSION: u32 = 0o644;

pub fn job_split_file(job_submit_dir: &Path) -> PathBuf {
    job_submit_dir.join(JOB_SPLIT)
}

pub fn job_split_meta_file(job_submit_dir: &Path) -> PathBuf {
    job_submit_dir.join(JOB_SPLIT_METAINFO)
}

/// Where a split lives and where it wants to run, as written to the meta file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMetaInfo {
    locations: Vec<String>,
    start_offset: u64,
    input_data_length: u64,
}

impl SplitMetaInfo {
    pub fn new(locations: Vec<String>, start_offset: u64, input_data_length: u64) -> Self {
        SplitMetaInfo {
            locations,
            start_offset,
            input_data_length,
        }
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn input_data_length(&self) -> u64 {
        self.input_data_length
    }

    /// Location count, each location, offset, length.
    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        write_vint(out, self.locations.len() as i32)?;
        for location in &self.locations {
            write_text(out, location)?;
        }
        write_vlong(out, self.start_offset as i64)?;
        write_vlong(out, self.input_data_length as i64)
    }

    pub fn read<R: Read + ?Sized>(input: &mut R) -> Result<Self> {
        let len = read_vint(input)?;
        if len < 0 {
            return Err(Error::Format(format!("negative location count {len}")));
        }
        let locations = (0..len).map(|_| read_text(input)).collect::<Result<Vec<_>>>()?;
        let start_offset = read_non_negative(input, "start offset")?;
        let input_data_length = read_non_negative(input, "input data length")?;
        Ok(SplitMetaInfo {
            locations,
            start_offset,
            input_data_length,
        })
    }
}

fn read_non_negative<R: Read + ?Sized>(input: &mut R, what: &str) -> Result<u64> {
    let value = read_vlong(input)?;
    u64::try_from(value).map_err(|_| Error::Format(format!("negative {what} {value}")))
}

impl std::fmt::Display for SplitMetaInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "data-size : {}\nstart-offset : {}\nlocations : \n  {}",
            self.input_data_length,
            self.start_offset,
            self.locations.iter().join("\n  ")
        )
    }
}

/// Pointer to a split record inside a data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSplitIndex {
    pub split_location: PathBuf,
    pub start_offset: u64,
}

/// What a scheduler needs per task, resolved from the meta file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSplitMetaInfo {
    pub split_index: TaskSplitIndex,
    pub locations: Vec<String>,
    pub input_data_length: u64,
}

impl TaskSplitMetaInfo {
    pub fn new(split_location: PathBuf, meta: SplitMetaInfo) -> Self {
        TaskSplitMetaInfo {
            split_index: TaskSplitIndex {
                split_location,
                start_offset: meta.start_offset,
            },
            locations: meta.locations,
            input_data_length: meta.input_data_length,
        }
    }
}
