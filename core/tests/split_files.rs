use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use atomic_split::meta::{job_split_file, job_split_meta_file, JOB_FILE_PERMISSION};
use atomic_split::reader::read_meta_stream;
use atomic_split::writer::write_split_header;
use atomic_split::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct IntSplit {
    value: i32,
    length: u64,
    locations: Vec<String>,
}

impl IntSplit {
    fn new(value: i32, length: u64, locations: &[&str]) -> Self {
        IntSplit {
            value,
            length,
            locations: locations.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Split for IntSplit {
    fn type_tag(&self) -> &str {
        "intSplit"
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn locations(&self) -> Vec<String> {
        self.locations.clone()
    }
}

#[derive(Default)]
struct Warnings(Mutex<Vec<String>>);

impl SplitReporter for Warnings {
    fn max_locations_exceeded(&self, split: &dyn Split, observed: usize, max: usize) {
        self.0
            .lock()
            .push(format!("{:?} {} {}", split, observed, max));
    }
}

fn registry() -> SplitCodecRegistry {
    let mut registry = SplitCodecRegistry::with_defaults();
    registry.register_bincode::<IntSplit>("intSplit");
    registry
}

fn writer() -> SplitFileWriter {
    SplitFileWriter::new(SplitWriterConf::default(), registry())
}

fn job_dir() -> PathBuf {
    PathBuf::from("/staging/job_0001")
}

#[test]
fn single_split_round_trip() {
    let storage = MemoryStorage::new();
    let splits: Vec<Box<dyn Split>> = vec![Box::new(IntSplit::new(42, 100, &["h1", "h2"]))];

    let info = writer().create_split_files(&storage, &job_dir(), &splits).unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].start_offset(), 7);
    assert_eq!(info[0].locations(), &["h1".to_string(), "h2".to_string()]);
    assert_eq!(info[0].input_data_length(), 100);

    let tasks = read_split_meta_info(&storage, &job_dir(), &SplitWriterConf::default()).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].split_index.start_offset, 7);
    assert_eq!(tasks[0].split_index.split_location, job_split_file(&job_dir()));
    assert_eq!(tasks[0].locations, vec!["h1", "h2"]);
    assert_eq!(tasks[0].input_data_length, 100);

    let mut reader =
        SplitFileReader::open(&storage, &tasks[0].split_index.split_location, registry()).unwrap();
    let split = reader.read_split(&tasks[0].split_index).unwrap();
    assert_eq!(split.type_tag(), "intSplit");
    assert_eq!(split.length(), 100);
    assert_eq!(
        split.downcast_ref::<IntSplit>(),
        Some(&IntSplit::new(42, 100, &["h1", "h2"]))
    );
}

#[test]
fn offsets_point_at_each_record() {
    let storage = MemoryStorage::new();
    let splits: Vec<Box<dyn Split>> = vec![
        Box::new(IntSplit::new(1, 10, &["h1"])),
        Box::new(FileSplit::new("/input/part-00000", 0, 4096, vec!["h2".into(), "h3".into()])),
        Box::new(IntSplit::new(-7, 20, &[])),
        Box::new(FileSplit::new("/input/part-00001", 4096, 512, vec![])),
        Box::new(IntSplit::new(i32::MAX, 30, &["h4", "h5", "h6"])),
    ];

    let info = writer().create_split_files(&storage, &job_dir(), &splits).unwrap();
    assert_eq!(info.len(), splits.len());

    let mut reader = SplitFileReader::open(&storage, &job_split_file(&job_dir()), registry()).unwrap();
    for (meta, split) in info.iter().zip(&splits) {
        let decoded = reader.read_split_at(meta.start_offset()).unwrap();
        assert_eq!(decoded.type_tag(), split.type_tag());
        assert_eq!(decoded.length(), split.length());
        assert_eq!(meta.input_data_length(), split.length());
        assert_eq!(meta.locations(), &split.locations()[..]);
    }

    // a sequential scan finds the same record boundaries
    let offsets: Vec<u64> = reader.read_all().unwrap().into_iter().map(|(pos, _)| pos).collect();
    let expected: Vec<u64> = info.iter().map(|m| m.start_offset()).collect();
    assert_eq!(offsets, expected);
    assert_eq!(offsets[0], 7);
}

#[test]
fn too_many_locations_are_truncated_and_reported() {
    let storage = MemoryStorage::new();
    let hosts: Vec<String> = (0..15).map(|i| format!("dn-{i}")).collect();
    let splits: Vec<Box<dyn Split>> = vec![
        Box::new(IntSplit::new(5, 64, &["a"])),
        Box::new(FileSplit::new("/input/wide", 0, 128, hosts.clone())),
    ];
    let warnings = Arc::new(Warnings::default());
    let writer = writer().with_reporter(warnings.clone());

    let untruncated = SplitFileWriter::new(
        SplitWriterConf::default().with_max_split_locations(20),
        registry(),
    )
    .create_split_files(&MemoryStorage::new(), &job_dir(), &splits)
    .unwrap();
    let info = writer.create_split_files(&storage, &job_dir(), &splits).unwrap();

    assert_eq!(info[1].locations(), &hosts[..10]);
    assert_eq!(info[1].input_data_length(), 128);
    assert_eq!(info[1].start_offset(), untruncated[1].start_offset());

    let warnings = warnings.0.lock().clone();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("/input/wide"));
    assert!(warnings[0].ends_with(" 15 10"));

    let tasks = read_split_meta_info(&storage, &job_dir(), &SplitWriterConf::default()).unwrap();
    assert_eq!(tasks[1].locations, hosts[..10].to_vec());
}

#[test]
fn empty_split_list() {
    let storage = MemoryStorage::new();
    let info = writer().create_split_files(&storage, &job_dir(), &[]).unwrap();
    assert!(info.is_empty());

    assert_eq!(
        storage.contents(&job_split_file(&job_dir())).unwrap(),
        b"SPL\x00\x00\x00\x01"
    );
    assert_eq!(
        storage.contents(&job_split_meta_file(&job_dir())).unwrap(),
        b"META-SPL\x01\x00"
    );
    let tasks = read_split_meta_info(&storage, &job_dir(), &SplitWriterConf::default()).unwrap();
    assert!(tasks.is_empty());
}

#[test]
fn unregistered_split_type_aborts_before_meta() {
    let storage = MemoryStorage::new();
    let splits: Vec<Box<dyn Split>> = vec![Box::new(IntSplit::new(1, 1, &[]))];
    let writer = SplitFileWriter::new(SplitWriterConf::default(), SplitCodecRegistry::with_defaults());

    let err = writer.create_split_files(&storage, &job_dir(), &splits).unwrap_err();
    assert!(err.is_encoding());
    assert!(!storage.exists(&job_split_meta_file(&job_dir())));
}

/// Fails every write once `remaining` bytes have gone through.
struct FailAfter {
    inner: PositionedWriter,
    remaining: usize,
}

impl Write for FailAfter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.len() > self.remaining {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        }
        self.remaining -= buf.len();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

struct FailingStorage {
    inner: MemoryStorage,
    fail_path: PathBuf,
    budget: usize,
}

impl SplitStorage for FailingStorage {
    fn create(
        &self,
        path: &Path,
        permission: u32,
        replication: Option<u16>,
    ) -> Result<PositionedWriter> {
        let inner = self.inner.create(path, permission, replication)?;
        if path == self.fail_path {
            return Ok(PositionedWriter::new(Box::new(FailAfter {
                inner,
                remaining: self.budget,
            })));
        }
        Ok(inner)
    }

    fn open(&self, path: &Path) -> Result<Box<dyn io::SeekRead>> {
        self.inner.open(path)
    }

    fn len(&self, path: &Path) -> Result<u64> {
        self.inner.len(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
}

#[test]
fn write_failure_leaves_no_meta_file() {
    let splits: Vec<Box<dyn Split>> = (0..5)
        .map(|i| Box::new(IntSplit::new(i, 10, &["h1"])) as Box<dyn Split>)
        .collect();

    // header and the first two records fit, the third does not
    let mut probe = PositionedWriter::new(Box::new(Vec::new()));
    write_split_header(&mut probe).unwrap();
    writer().write_splits(&mut probe, &splits[..2]).unwrap();

    let storage = FailingStorage {
        inner: MemoryStorage::new(),
        fail_path: job_split_file(&job_dir()),
        budget: probe.position() as usize,
    };
    let err = writer().create_split_files(&storage, &job_dir(), &splits).unwrap_err();

    assert!(err.is_io(), "unexpected error {err:?}");
    assert!(storage.exists(&job_split_file(&job_dir())));
    assert!(!storage.exists(&job_split_meta_file(&job_dir())));
}

#[test]
fn meta_write_failure_is_io() {
    let storage = FailingStorage {
        inner: MemoryStorage::new(),
        fail_path: job_split_meta_file(&job_dir()),
        budget: 4,
    };
    let err = writer().create_split_files(&storage, &job_dir(), &[]).unwrap_err();
    assert!(err.is_io());
}

#[test]
fn reader_enforces_meta_size_limit() {
    let storage = MemoryStorage::new();
    let splits: Vec<Box<dyn Split>> = vec![Box::new(IntSplit::new(1, 1, &["h1"]))];
    writer().create_split_files(&storage, &job_dir(), &splits).unwrap();

    let mut conf = SplitWriterConf::default();
    conf.max_meta_info_size = 4;
    let err = read_split_meta_info(&storage, &job_dir(), &conf).unwrap_err();
    assert!(matches!(err, Error::MetaInfoTooLarge { max: 4, .. }));

    conf.max_meta_info_size = -1;
    assert_eq!(read_split_meta_info(&storage, &job_dir(), &conf).unwrap().len(), 1);
}

#[test]
fn reader_rejects_unknown_type_tag() {
    let storage = MemoryStorage::new();
    let splits: Vec<Box<dyn Split>> = vec![Box::new(IntSplit::new(1, 1, &[]))];
    let info = writer().create_split_files(&storage, &job_dir(), &splits).unwrap();

    let mut reader = SplitFileReader::open(
        &storage,
        &job_split_file(&job_dir()),
        SplitCodecRegistry::with_defaults(),
    )
    .unwrap();
    let err = reader.read_split_at(info[0].start_offset()).err().unwrap();
    assert!(matches!(err, Error::UnregisteredTypeTag(ref tag) if tag == "intSplit"));
    assert!(matches!(reader.read_split_at(1 << 20), Err(Error::Format(_))));
}

#[test]
fn local_filesystem_layout() {
    let dir = tempfile::tempdir().unwrap();
    let job_dir = dir.path().join("job_0002");
    let storage = LocalFsIO::new();
    let splits: Vec<Box<dyn Split>> = vec![
        Box::new(FileSplit::new("/input/a", 0, 10, vec!["h1".into()])),
        Box::new(FileSplit::new("/input/b", 0, 20, vec!["h2".into()])),
    ];

    let info = writer().create_split_files(&storage, &job_dir, &splits).unwrap();

    let meta_bytes = std::fs::read(job_split_meta_file(&job_dir)).unwrap();
    assert_eq!(read_meta_stream(&mut meta_bytes.as_slice()).unwrap(), info);

    let data_len = std::fs::metadata(job_split_file(&job_dir)).unwrap().len();
    let mut reader = SplitFileReader::open(&storage, &job_split_file(&job_dir), registry()).unwrap();
    let all = reader.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all[1].1.downcast_ref::<FileSplit>(),
        Some(&FileSplit::new("/input/b", 0, 20, vec!["h2".into()]))
    );
    assert!(info[1].start_offset() < data_len);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(job_split_file(&job_dir)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, JOB_FILE_PERMISSION);
    }
}
