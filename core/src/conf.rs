use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod config {
    /// Replication factor of the split data file.
    pub const SUBMIT_REPLICATION: &str = "mapred.submit.replication";
    pub const DEFAULT_SUBMIT_REPLICATION: u16 = 10;

    /// Location hints kept per split in the meta file.
    pub const MAX_SPLIT_LOCATIONS: &str = "mapreduce.job.max.split.locations";
    pub const DEFAULT_MAX_SPLIT_LOCATIONS: usize = 10;

    /// Largest meta file a reader accepts, zero or negative disables the check.
    pub const SPLIT_METAINFO_MAXSIZE: &str = "mapreduce.job.split.metainfo.maxsize";
    pub const DEFAULT_SPLIT_METAINFO_MAXSIZE: i64 = 10_000_000;

    pub const ENV_PREFIX: &str = "ATOMIC_SPLIT_";
}

/// Job configuration as plain string settings.
#[derive(Debug, Clone, Default)]
pub struct JobConf {
    settings: Arc<RwLock<HashMap<String, String>>>,
}

impl JobConf {
    pub fn new() -> Self {
        JobConf::default()
    }

    pub fn set(&self, key: &str, value: impl ToString) -> &Self {
        self.settings.write().insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.settings.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.read().contains_key(key)
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses `key` as a number, `default` when unset.
    pub fn get_int<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| Error::Config {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// The settings the split writer and reader consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitWriterConf {
    pub submit_replication: u16,
    pub max_split_locations: usize,
    pub max_meta_info_size: i64,
}

impl Default for SplitWriterConf {
    fn default() -> Self {
        SplitWriterConf {
            submit_replication: config::DEFAULT_SUBMIT_REPLICATION,
            max_split_locations: config::DEFAULT_MAX_SPLIT_LOCATIONS,
            max_meta_info_size: config::DEFAULT_SPLIT_METAINFO_MAXSIZE,
        }
    }
}

impl SplitWriterConf {
    pub fn from_job_conf(conf: &JobConf) -> Result<Self> {
        Ok(SplitWriterConf {
            submit_replication: conf
                .get_int(config::SUBMIT_REPLICATION, config::DEFAULT_SUBMIT_REPLICATION)?,
            max_split_locations: conf
                .get_int(config::MAX_SPLIT_LOCATIONS, config::DEFAULT_MAX_SPLIT_LOCATIONS)?,
            max_meta_info_size: conf.get_int(
                config::SPLIT_METAINFO_MAXSIZE,
                config::DEFAULT_SPLIT_METAINFO_MAXSIZE,
            )?,
        })
    }

    /// Reads `ATOMIC_SPLIT_SUBMIT_REPLICATION` and friends, unset ones keep
    /// their defaults.
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed(config::ENV_PREFIX).from_env::<SplitWriterConf>()?)
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(config::ENV_PREFIX).from_iter::<_, SplitWriterConf>(vars)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_max_split_locations(mut self, max: usize) -> Self {
        self.max_split_locations = max;
        self
    }

    pub fn with_submit_replication(mut self, replication: u16) -> Self {
        self.submit_replication = replication;
        self
    }
}
