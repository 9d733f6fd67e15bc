//! Job split files: the `job.split` data file holding every serialized split
//! of a job and the `job.splitmetainfo` index a scheduler reads to place tasks
//! without touching the data file.

pub mod conf;
mod error;
pub mod io;
pub mod meta;
pub mod reader;
pub mod registry;
pub mod split;
pub mod utils;
pub mod writer;

// Re-exports:
pub use conf::{JobConf, SplitWriterConf};
pub use error::*;
pub use io::{storage_for_uri, LocalFsIO, MemoryStorage, PositionedWriter, SplitStorage};
pub use meta::{SplitMetaInfo, TaskSplitIndex, TaskSplitMetaInfo};
pub use reader::{read_split_meta_info, SplitFileReader};
pub use registry::{BincodeCodec, SplitCodec, SplitCodecRegistry};
pub use split::{FileSplit, Split};
pub use utils::initialize_loggers;
pub use writer::{LogReporter, SplitFileWriter, SplitReporter};
