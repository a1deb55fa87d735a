//! Raw inputs handed over by the event reader.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// One raw byte block of an event.
///
/// The index identifies the originating channel or device and is supplied
/// by the reader; it is never decoded from the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    /// Externally supplied block index.
    pub index: u32,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl DataBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(index: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            bytes: bytes.into(),
        }
    }

    /// Number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the block holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Begin-of-run configuration tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagMap {
    tags: BTreeMap<String, String>,
}

impl TagMap {
    /// Creates an empty tag map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a tag, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Builder-style [`TagMap::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value of a tag.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Value of a tag that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTag`] if the tag is absent.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::MissingTag(key.to_string()))
    }

    /// Parses a tag value, `Ok(None)` when the tag is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] if the value does not parse.
    pub fn parse_opt<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                value.trim().parse().map_err(|_| Error::InvalidTag {
                    tag: key.to_string(),
                    value: value.to_string(),
                })
            })
            .transpose()
    }

    /// Parses a tag value that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingTag`] or [`Error::InvalidTag`].
    pub fn parse_required<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        self.parse_opt(key)?
            .ok_or_else(|| Error::MissingTag(key.to_string()))
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if no tag is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tags: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
