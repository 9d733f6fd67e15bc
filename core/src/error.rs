use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no split codec registered for type tag `{0}`")]
    UnregisteredTypeTag(String),

    #[error("failed to encode split of type `{type_tag}`: {source}")]
    Encoding {
        type_tag: String,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to decode split of type `{type_tag}`: {source}")]
    Decoding {
        type_tag: String,
        #[source]
        source: bincode::Error,
    },

    #[error("split of type `{type_tag}` handed to a codec for `{expected}`")]
    CodecMismatch { type_tag: String, expected: String },

    #[error("invalid split file format: {0}")]
    Format(String),

    #[error("split meta info file {path:?} is {size} bytes, larger than the allowed {max}")]
    MetaInfoTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("failed to create {path:?}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such file {0:?}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("bad configuration value for `{key}`: `{value}`")]
    Config { key: String, value: String },

    #[error("failed to load configuration")]
    ConfigLoad(#[from] envy::Error),

    #[error("failed to parse configuration file")]
    ConfigFile(#[from] toml::de::Error),

    #[error("unsupported storage uri `{0}`")]
    UnsupportedUri(String),

    #[error("failed to parse storage uri")]
    UriParse(#[from] url::ParseError),

    #[error("failed to initialize loggers")]
    Logger(#[from] log::SetLoggerError),

    #[error("namenode not set, export `namenode`")]
    HdfsNamenode,

    #[error("failed to connect to hdfs namenode {0}")]
    HdfsConnect(String),

    #[error("failed to open file on hdfs namenode {0}")]
    HdfsFileOpen(String),

    #[error("failed to write to hdfs namenode {0}")]
    HdfsWrite(String),

    #[error("failed to read from hdfs namenode {0}")]
    HdfsRead(String),
}

impl Error {
    /// True for the write/close/create failures of the output streams.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Create { .. }
                | Error::NotFound(_)
                | Error::HdfsConnect(_)
                | Error::HdfsFileOpen(_)
                | Error::HdfsWrite(_)
                | Error::HdfsRead(_)
        )
    }

    /// True when a split could not be turned into bytes.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            Error::UnregisteredTypeTag(_) | Error::Encoding { .. } | Error::CodecMismatch { .. }
        )
    }
}
