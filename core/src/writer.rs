//! Writes the split data file and its meta index for a job submission.
//!
//! The data file is `"SPL"`, a big-endian `i32` version, then one record per
//! split: the type tag as a `Text` string followed by the payload bytes of the
//! codec registered for that tag. The meta file is `"META-SPL"`, a VInt
//! version, a VInt record count and one [`SplitMetaInfo`] per split. Meta
//! offsets point at the first byte of the matching record's type tag.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use byteorder::{BigEndian, WriteBytesExt};

use crate::conf::SplitWriterConf;
use crate::error::{Error, Result};
use crate::io::writable::{write_text, write_vint};
use crate::io::{PositionedWriter, SplitStorage};
use crate::meta::{
    job_split_file, job_split_meta_file, SplitMetaInfo, JOB_FILE_PERMISSION,
    META_SPLIT_FILE_HEADER, META_SPLIT_VERSION, SPLIT_FILE_HEADER, SPLIT_VERSION,
};
use crate::registry::SplitCodecRegistry;
use crate::split::Split;

/// Receives the recoverable conditions met while writing splits.
pub trait SplitReporter: Send + Sync {
    fn max_locations_exceeded(&self, split: &dyn Split, observed: usize, max: usize);
}

/// Forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl SplitReporter for LogReporter {
    fn max_locations_exceeded(&self, split: &dyn Split, observed: usize, max: usize) {
        log::warn!(
            "Max block location exceeded for split: {:?} splitsize: {} maxsize: {}",
            split,
            observed,
            max
        );
    }
}

pub struct SplitFileWriter {
    conf: SplitWriterConf,
    registry: SplitCodecRegistry,
    reporter: Arc<dyn SplitReporter>,
}

impl SplitFileWriter {
    pub fn new(conf: SplitWriterConf, registry: SplitCodecRegistry) -> Self {
        SplitFileWriter {
            conf,
            registry,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SplitReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn conf(&self) -> &SplitWriterConf {
        &self.conf
    }

    pub fn registry(&self) -> &SplitCodecRegistry {
        &self.registry
    }

    /// Writes `job.split` and then `job.splitmetainfo` under `job_submit_dir`.
    ///
    /// The meta file is only created once the data file has been written and
    /// closed; any failure before that leaves no meta file behind.
    pub fn create_split_files(
        &self,
        storage: &dyn SplitStorage,
        job_submit_dir: &Path,
        splits: &[Box<dyn Split>],
    ) -> Result<Vec<SplitMetaInfo>> {
        let split_file = job_split_file(job_submit_dir);
        let mut out = self.create_file(storage, &split_file)?;
        // an early return drops `out`, which releases the handle
        let info = self.write_splits(&mut out, splits)?;
        out.close()?;
        log::debug!("wrote {} splits to {:?}", info.len(), split_file);

        let meta_file = job_split_meta_file(job_submit_dir);
        self.write_split_meta_info(storage, &meta_file, META_SPLIT_VERSION, &info)?;
        log::info!(
            "created split files for {} splits under {:?}",
            info.len(),
            job_submit_dir
        );
        Ok(info)
    }

    fn create_file(&self, storage: &dyn SplitStorage, path: &Path) -> Result<PositionedWriter> {
        let mut out = storage.create(
            path,
            JOB_FILE_PERMISSION,
            Some(self.conf.submit_replication),
        )?;
        write_split_header(&mut out)?;
        Ok(out)
    }

    /// Appends one record per split to `out`, which must already hold the
    /// header, and returns their index entries in the same order.
    pub fn write_splits(
        &self,
        out: &mut PositionedWriter,
        splits: &[Box<dyn Split>],
    ) -> Result<Vec<SplitMetaInfo>> {
        let mut info = Vec::with_capacity(splits.len());
        let mut offset = out.position();
        for split in splits {
            let split: &dyn Split = &**split;
            let codec = self.registry.get(split.type_tag())?;

            let prev_pos = out.position();
            write_text(out, split.type_tag())?;
            codec.encode(split, out)?;
            let curr_pos = out.position();

            let locations = self.truncated_locations(split);
            info.push(SplitMetaInfo::new(locations, offset, split.length()));
            offset += curr_pos - prev_pos;
        }
        Ok(info)
    }

    fn truncated_locations(&self, split: &dyn Split) -> Vec<String> {
        let mut locations = split.locations();
        let max = self.conf.max_split_locations;
        if locations.len() > max {
            self.reporter.max_locations_exceeded(split, locations.len(), max);
            locations.truncate(max);
        }
        locations
    }

    /// Writes the meta index to `path`. The stream is released on every exit.
    pub fn write_split_meta_info(
        &self,
        storage: &dyn SplitStorage,
        path: &Path,
        version: i32,
        all_split_meta_info: &[SplitMetaInfo],
    ) -> Result<()> {
        let mut out = storage.create(path, JOB_FILE_PERMISSION, None)?;
        write_meta_stream(&mut out, version, all_split_meta_info)?;
        out.close()
    }
}

pub fn write_split_header<W: Write + ?Sized>(out: &mut W) -> std::io::Result<()> {
    out.write_all(SPLIT_FILE_HEADER)?;
    out.write_i32::<BigEndian>(SPLIT_VERSION)
}

pub fn write_meta_stream<W: Write + ?Sized>(
    out: &mut W,
    version: i32,
    all_split_meta_info: &[SplitMetaInfo],
) -> Result<()> {
    let count = i32::try_from(all_split_meta_info.len())
        .map_err(|_| Error::Format(format!("{} splits", all_split_meta_info.len())))?;
    out.write_all(META_SPLIT_FILE_HEADER)?;
    write_vint(out, version)?;
    write_vint(out, count)?;
    for split_meta_info in all_split_meta_info {
        split_meta_info.write(out)?;
    }
    Ok(())
}
