use std::path::{Path, PathBuf};

use atomic_split::*;
use itertools::Itertools;

const SPLIT_SIZE: u64 = 64 * 1024 * 1024;

/// One `FileSplit` per `SPLIT_SIZE` chunk of every file directly under `dir`.
fn file_splits(dir: &Path) -> Result<Vec<Box<dyn Split>>> {
    let mut splits: Vec<Box<dyn Split>> = Vec::new();
    let entries = std::fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .sorted_by_key(|e| e.path());
    for entry in entries {
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let path = entry.path().to_string_lossy().into_owned();
        let mut start = 0;
        loop {
            let length = SPLIT_SIZE.min(meta.len() - start);
            splits.push(Box::new(FileSplit::new(
                path.clone(),
                start,
                length,
                vec!["localhost".to_string()],
            )));
            start += length;
            if start >= meta.len() {
                break;
            }
        }
    }
    Ok(splits)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| "./csv_folder".to_string()));
    let staging = args.next().unwrap_or_else(|| "file:///tmp/atomic-staging".to_string());

    initialize_loggers(None)?;
    let conf = SplitWriterConf::from_env()?;
    let (storage, staging_dir) = storage_for_uri(&staging)?;
    let job_dir = staging_dir.join(format!("job_{}", uuid::Uuid::new_v4().simple()));

    let splits = file_splits(&input)?;
    let writer = SplitFileWriter::new(conf.clone(), SplitCodecRegistry::with_defaults());
    writer.create_split_files(storage.as_ref(), &job_dir, &splits)?;

    for task in read_split_meta_info(storage.as_ref(), &job_dir, &conf)? {
        println!(
            "{:?}@{} len={} [{}]",
            task.split_index.split_location,
            task.split_index.start_offset,
            task.input_data_length,
            task.locations.iter().join(",")
        );
    }
    log::info!("job directory: {:?}", job_dir);
    Ok(())
}
