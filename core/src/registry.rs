//! Type tag to payload codec resolution.
//!
//! A split record in the data file carries only its type tag, so the reader has
//! to be handed the same registry the writer used.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::split::{FileSplit, Split};

/// Payload encoder/decoder for one split type.
///
/// Decoding must consume exactly the bytes `encode` produced: records in the
/// data file are not length prefixed.
pub trait SplitCodec: Send + Sync {
    fn encode(&self, split: &dyn Split, out: &mut dyn Write) -> Result<()>;

    fn decode(&self, input: &mut dyn Read) -> Result<Box<dyn Split>>;
}

/// Codec for any serde type, using bincode's self-delimiting layout.
pub struct BincodeCodec<T> {
    type_tag: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new(type_tag: impl Into<String>) -> Self {
        BincodeCodec {
            type_tag: type_tag.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> SplitCodec for BincodeCodec<T>
where
    T: Split + Serialize + DeserializeOwned,
{
    fn encode(&self, split: &dyn Split, out: &mut dyn Write) -> Result<()> {
        let split = split
            .downcast_ref::<T>()
            .ok_or_else(|| Error::CodecMismatch {
                type_tag: split.type_tag().to_string(),
                expected: self.type_tag.clone(),
            })?;
        bincode::serialize_into(out, split).map_err(|source| match *source {
            bincode::ErrorKind::Io(e) => Error::Io(e),
            other => Error::Encoding {
                type_tag: self.type_tag.clone(),
                source: Box::new(other),
            },
        })
    }

    fn decode(&self, input: &mut dyn Read) -> Result<Box<dyn Split>> {
        let split: T = bincode::deserialize_from(input).map_err(|source| Error::Decoding {
            type_tag: self.type_tag.clone(),
            source,
        })?;
        Ok(Box::new(split))
    }
}

#[derive(Clone, Default)]
pub struct SplitCodecRegistry {
    codecs: HashMap<String, Arc<dyn SplitCodec>>,
}

impl SplitCodecRegistry {
    pub fn new() -> Self {
        SplitCodecRegistry::default()
    }

    /// Registry knowing the split types shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = SplitCodecRegistry::new();
        registry.register_bincode::<FileSplit>(FileSplit::TYPE_TAG);
        registry
    }

    /// Registers `codec` for `type_tag`, returning the codec it replaced.
    pub fn register(
        &mut self,
        type_tag: impl Into<String>,
        codec: Arc<dyn SplitCodec>,
    ) -> Option<Arc<dyn SplitCodec>> {
        self.codecs.insert(type_tag.into(), codec)
    }

    pub fn register_bincode<T>(&mut self, type_tag: &str) -> Option<Arc<dyn SplitCodec>>
    where
        T: Split + Serialize + DeserializeOwned,
    {
        self.register(type_tag, Arc::new(BincodeCodec::<T>::new(type_tag)))
    }

    pub fn get(&self, type_tag: &str) -> Result<&Arc<dyn SplitCodec>> {
        self.codecs
            .get(type_tag)
            .ok_or_else(|| Error::UnregisteredTypeTag(type_tag.to_string()))
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.codecs.contains_key(type_tag)
    }
}

impl std::fmt::Debug for SplitCodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.codecs.keys().collect();
        tags.sort();
        f.debug_struct("SplitCodecRegistry").field("type_tags", &tags).finish()
    }
}
