//! Burkhard-Keller trees for range queries under a discrete metric, with a
//! specialised tree for fixed width hex fingerprints compared by Hamming
//! distance.
//!
//! ```rust
//! use bktree::BkHammingTree;
//!
//! let mut tree = BkHammingTree::new(64).unwrap();
//! tree.add_all(["1", "2", "3"]).unwrap();
//!
//! let near: Vec<_> = tree
//!     .find("2", 1)
//!     .unwrap()
//!     .into_iter()
//!     .map(|m| (m.key.to_string(), m.distance))
//!     .collect();
//! assert_eq!(near[0], ("0000000000000002".to_string(), 0));
//! assert_eq!(near[1], ("0000000000000003".to_string(), 1));
//! ```

use pyo3::prelude::*;
use pyo3::types::PyTuple;

mod error;
mod hamming;
mod hamming_tree;
mod tree;
mod util;

#[cfg(test)]
mod proptests;

pub use error::{BkError, Result};
pub use hamming::{bit_count, hex_distance, pad_key, Hamming, HammingKey, KeyBits};
pub use hamming_tree::BkHammingTree;
pub use tree::{BkTree, DistanceFn, Match, Metric};

// Strings are keys; anything else is iterated, so nested lists flatten.
fn collect_keys(obj: &Bound<'_, PyAny>, out: &mut Vec<String>) -> PyResult<()> {
    if let Ok(key) = obj.extract::<String>() {
        out.push(key);
        return Ok(());
    }
    for item in obj.try_iter()? {
        collect_keys(&item?, out)?;
    }
    Ok(())
}

#[pyclass(name = "BKHammingTree")]
struct PyBkHammingTree {
    tree: BkHammingTree,
}

#[pymethods]
impl PyBkHammingTree {
    #[new]
    fn new(key_bits: usize) -> PyResult<Self> {
        Ok(PyBkHammingTree {
            tree: BkHammingTree::new(key_bits)?,
        })
    }

    #[getter]
    fn key_bits(&self) -> usize {
        self.tree.key_bits().bits()
    }

    #[getter]
    fn size(&self) -> usize {
        self.tree.size()
    }

    fn __len__(&self) -> usize {
        self.tree.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "<BKHammingTree key_bits={} size={}>",
            self.tree.key_bits().bits(),
            self.tree.size()
        )
    }

    fn pad_key(&self, key: &str) -> PyResult<String> {
        Ok(self.tree.pad_key(key)?)
    }

    fn distance(&self, a: &str, b: &str) -> PyResult<u32> {
        Ok(self.tree.distance(a, b)?)
    }

    #[pyo3(signature = (*keys))]
    fn add<'py>(
        mut slf: PyRefMut<'py, Self>,
        keys: &Bound<'py, PyTuple>,
    ) -> PyResult<PyRefMut<'py, Self>> {
        let mut flat = Vec::new();
        collect_keys(keys.as_any(), &mut flat)?;
        slf.tree.add_all(&flat)?;
        Ok(slf)
    }

    // Matches are gathered before calling back into Python so a callback
    // error can't interrupt the traversal half way.
    fn query<'py>(
        slf: PyRef<'py, Self>,
        key: &str,
        max_dist: u32,
        callback: &Bound<'py, PyAny>,
    ) -> PyResult<PyRef<'py, Self>> {
        let mut hits = Vec::new();
        slf.tree
            .query(key, max_dist, |k, distance| hits.push((k.to_owned(), distance)))?;
        for hit in hits {
            callback.call1(hit)?;
        }
        Ok(slf)
    }

    fn walk<'py>(
        slf: PyRef<'py, Self>,
        callback: &Bound<'py, PyAny>,
    ) -> PyResult<PyRef<'py, Self>> {
        let mut nodes = Vec::with_capacity(slf.tree.size());
        slf.tree.walk(|k, depth| nodes.push((k.to_owned(), depth)));
        for node in nodes {
            callback.call1(node)?;
        }
        Ok(slf)
    }

    fn find(&self, key: &str, max_dist: u32) -> PyResult<Vec<(String, u32)>> {
        Ok(self
            .tree
            .find(key, max_dist)?
            .into_iter()
            .map(|m| (m.key.to_string(), m.distance))
            .collect())
    }

    fn has(&self, key: &str) -> PyResult<bool> {
        Ok(self.tree.has(key)?)
    }
}

/// Python bindings for the Hamming BK-tree.
#[pymodule]
mod bktree {
    use pyo3::prelude::*;

    #[pymodule_export]
    use super::PyBkHammingTree;

    /// Hamming distance between two equal length hex strings.
    #[pyfunction]
    fn hamming_distance(a: &str, b: &str) -> PyResult<u32> {
        Ok(super::hex_distance(a, b)?)
    }
}
