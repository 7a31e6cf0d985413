//! MemIndex implementation
//!
//! BTreeMap-based index with approximate size tracking.

use std::collections::BTreeMap;

use super::Index;

/// Default in-memory index
#[derive(Debug, Default, Clone)]
pub struct MemIndex {
    data: BTreeMap<Vec<u8>, Vec<u8>>,

    /// Approximate size in bytes (keys + values)
    size: usize,
}

impl MemIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Borrowing lookup for callers holding a concrete `MemIndex`
    pub fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.data.get(key)
    }
}

impl Index for MemIndex {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let key_len = key.len();
        let value_len = value.len();
        match self.data.insert(key, value) {
            Some(old) => {
                self.size = self.size - old.len() + value_len;
            }
            None => {
                self.size += key_len + value_len;
            }
        }
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        match self.data.remove(key) {
            Some(old) => {
                self.size -= key.len() + old.len();
                true
            }
            None => false,
        }
    }

    fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    fn enumerate(&self) -> Box<dyn Iterator<Item = (&[u8], &[u8])> + '_> {
        Box::new(
            self.data
                .iter()
                .map(|(k, v)| (k.as_slice(), v.as_slice())),
        )
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
    }
}
