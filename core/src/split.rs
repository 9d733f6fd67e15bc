use std::fmt;

use downcast_rs::{impl_downcast, DowncastSync};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One unit of partitioned job input.
///
/// The payload is the implementing value itself; it is turned into bytes by the
/// codec registered for [`Split::type_tag`].
pub trait Split: DowncastSync + dyn_clone::DynClone + fmt::Debug {
    /// Name under which the payload codec is registered.
    fn type_tag(&self) -> &str;

    /// Logical size of the input this split covers.
    fn length(&self) -> u64;

    /// Hosts where the data is local, most preferred first.
    fn locations(&self) -> Vec<String>;
}

impl_downcast!(sync Split);
dyn_clone::clone_trait_object!(Split);

/// A byte range of a single file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileSplit {
    path: String,
    start: u64,
    length: u64,
    hosts: Vec<String>,
}

impl FileSplit {
    pub const TYPE_TAG: &'static str = "FileSplit";

    pub fn new(path: impl Into<String>, start: u64, length: u64, hosts: Vec<String>) -> Self {
        FileSplit {
            path: path.into(),
            start,
            length,
            hosts,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn start(&self) -> u64 {
        self.start
    }
}

impl Split for FileSplit {
    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn locations(&self) -> Vec<String> {
        self.hosts.clone()
    }
}

impl fmt::Display for FileSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}+{} [{}]",
            self.path,
            self.start,
            self.length,
            self.hosts.iter().join(",")
        )
    }
}
