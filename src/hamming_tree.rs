use tracing::debug;

use crate::error::Result;
use crate::hamming::{hex_distance, pad_key, Hamming, HammingKey, KeyBits};
use crate::tree::{BkTree, Match};

/// BK-tree over fixed width binary fingerprints written in hex.
///
/// Every key handed in is zero-padded on the left to `key_bits / 4` digits
/// before it reaches the tree, so `"1"` and `"0000000000000001"` name the same
/// 64-bit key.
pub struct BkHammingTree {
    key_bits: KeyBits,
    tree: BkTree<HammingKey, Hamming>,
}

impl BkHammingTree {
    /// Fails with [`BkError::InvalidKeyBits`](crate::BkError::InvalidKeyBits)
    /// unless `key_bits` is a positive multiple of 64.
    pub fn new(key_bits: usize) -> Result<Self> {
        let key_bits = KeyBits::new(key_bits)?;
        debug!(key_bits = key_bits.bits(), "created hamming tree");
        Ok(Self::with_key_bits(key_bits))
    }

    pub fn with_key_bits(key_bits: KeyBits) -> Self {
        BkHammingTree {
            key_bits,
            tree: BkTree::new(Hamming),
        }
    }

    pub fn key_bits(&self) -> KeyBits {
        self.key_bits
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn pad_key(&self, key: &str) -> Result<String> {
        pad_key(key, self.key_bits)
    }

    fn canonical(&self, key: &str) -> Result<HammingKey> {
        HammingKey::new(key, self.key_bits)
    }

    /// Hamming distance between two keys after padding both.
    pub fn distance(&self, a: &str, b: &str) -> Result<u32> {
        hex_distance(&self.pad_key(a)?, &self.pad_key(b)?)
    }

    pub fn add(&mut self, key: &str) -> Result<&mut Self> {
        let key = self.canonical(key)?;
        self.tree.add(key)?;
        Ok(self)
    }

    /// Inserts keys in order. Every key is validated first, so a bad key
    /// leaves the tree untouched.
    pub fn add_all<I, S>(&mut self, keys: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|key| self.canonical(key.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.tree.add_all(keys)?;
        Ok(self)
    }

    /// Calls `visit(key, distance)` for each stored key within `max_dist` of
    /// `key`, parents before children.
    pub fn query<F>(&self, key: &str, max_dist: u32, mut visit: F) -> Result<&Self>
    where
        F: FnMut(&str, u32),
    {
        let key = self.canonical(key)?;
        self.tree
            .query(&key, max_dist, |k, distance| visit(k.as_str(), distance))?;
        Ok(self)
    }

    /// Every stored key within `max_dist` of `key`, nearest first.
    pub fn find(&self, key: &str, max_dist: u32) -> Result<Vec<Match<HammingKey>>> {
        self.tree.find(&self.canonical(key)?, max_dist)
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        self.tree.has(&self.canonical(key)?)
    }

    /// Visits every stored (canonical) key once with its depth.
    pub fn walk<F>(&self, mut visit: F) -> &Self
    where
        F: FnMut(&str, usize),
    {
        self.tree.walk(|k, depth| visit(k.as_str(), depth));
        self
    }
}
