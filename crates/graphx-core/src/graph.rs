// Copyright The GraphX Authors
// Use of this source code is governed by an MIT OR Apache-2.0 license
// that can be found in the LICENSE file.

//! Immutable compressed-sparse-row adjacency store.
//!
//! Three parallel arrays plus a node count: `row_index` prefix-sums into
//! `col_index`/`values`. Every query is read-only and allocation-free.

use remain::sorted;
use thiserror::Error;

#[sorted]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("col_index is not sorted ascending within row {row}")]
    ColIndexNotSorted { row: usize },
    #[error("row_index is empty")]
    EmptyRowIndex,
    #[error("row_index is not non-decreasing at index {index}")]
    RowIndexNotMonotonic { index: usize },
    #[error("row_index[n] = {declared} does not match col_index.len() = {actual}")]
    RowIndexTotalMismatch { declared: usize, actual: usize },
    #[error("values.len() = {values_len} does not match col_index.len() = {col_len}")]
    ValuesLengthMismatch { values_len: usize, col_len: usize },
}

#[derive(Debug, Clone)]
pub struct CsrGraph {
    row_index: Vec<i32>,
    col_index: Vec<i32>,
    values: Vec<i32>,
}

impl CsrGraph {
    /// Validates and builds a CSR graph from its three parallel arrays.
    ///
    /// Checks every invariant the data model requires: `row_index` is
    /// non-decreasing, `row_index[n]` matches the edge count, and each row's
    /// slice of `col_index` is sorted ascending (required for [`Self::has_edge`]'s
    /// binary search).
    pub fn new(row_index: Vec<i32>, col_index: Vec<i32>, values: Vec<i32>) -> Result<Self, GraphError> {
        if row_index.is_empty() {
            return Err(GraphError::EmptyRowIndex);
        }
        if values.len() != col_index.len() {
            return Err(GraphError::ValuesLengthMismatch {
                values_len: values.len(),
                col_len: col_index.len(),
            });
        }
        for (index, window) in row_index.windows(2).enumerate() {
            if window[1] < window[0] {
                return Err(GraphError::RowIndexNotMonotonic { index: index + 1 });
            }
        }
        let declared_total = *row_index.last().unwrap();
        if declared_total < 0 || declared_total as usize != col_index.len() {
            return Err(GraphError::RowIndexTotalMismatch {
                declared: declared_total.max(0) as usize,
                actual: col_index.len(),
            });
        }

        let graph = CsrGraph {
            row_index,
            col_index,
            values,
        };

        for u in 0..graph.n() {
            let row = graph.row_slice(u);
            if !row.windows(2).all(|w| w[0] <= w[1]) {
                return Err(GraphError::ColIndexNotSorted { row: u });
            }
        }

        Ok(graph)
    }

    /// Number of nodes: `row_index.len() - 1`.
    pub fn n(&self) -> usize {
        self.row_index.len() - 1
    }

    fn row_range(&self, u: usize) -> std::ops::Range<usize> {
        self.row_index[u] as usize..self.row_index[u + 1] as usize
    }

    fn row_slice(&self, u: usize) -> &[i32] {
        &self.col_index[self.row_range(u)]
    }

    /// `row_index[u+1] - row_index[u]`. Caller guarantees `u < n()`.
    pub fn degree(&self, u: usize) -> u32 {
        (self.row_index[u + 1] - self.row_index[u]) as u32
    }

    /// The neighbor ids of `u`, in CSR storage order (ascending, per the
    /// construction-time invariant).
    pub fn neighbors(&self, u: usize) -> &[i32] {
        self.row_slice(u)
    }

    /// Binary search over `u`'s row for `v`.
    pub fn has_edge(&self, u: usize, v: i32) -> bool {
        self.row_slice(u).binary_search(&v).is_ok()
    }

    /// The `offset`-th edge out of `u` in storage order, as `(neighbor, weight)`,
    /// or `None` if `u` has no such offset. This is the sequential-iteration
    /// counterpart to [`Self::has_edge`]/[`Self::weight`]'s binary search, and is
    /// what `NNEXT`/`ENEXT` walk with.
    pub fn edge_at(&self, u: usize, offset: usize) -> Option<(i32, i32)> {
        let range = self.row_range(u);
        let idx = range.start + offset;
        if idx >= range.end {
            None
        } else {
            Some((self.col_index[idx], self.values[idx]))
        }
    }

    /// The weight of edge `u -> v`, or 0 if the edge doesn't exist. A real
    /// zero-weight edge is therefore indistinguishable from "no edge" through
    /// this method alone; callers that must tell them apart should gate on
    /// [`Self::has_edge`] first.
    pub fn weight(&self, u: usize, v: i32) -> i32 {
        let range = self.row_range(u);
        match self.col_index[range.clone()].binary_search(&v) {
            Ok(offset) => self.values[range.start + offset],
            Err(_) => 0,
        }
    }
}
