//! Bit-packed transitive closure over the collapsed network.

use crate::domain::CollapsedId;

use super::CollapsedNetwork;

/// Transitive closure of the collapsed adjacency, one bit per ordered pair.
///
/// Rows are packed into 64-bit words so the Warshall update becomes a
/// word-wise OR over whole rows: Θ(n³/64) bit operations instead of a
/// boolean matrix walk, and each row stays in cache. `reachable(i, j)`
/// answers "is j reachable from i via at least one collapsed hop" in O(1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityMatrix {
    n: usize,
    /// Words per row.
    stride: usize,
    bits: Vec<u64>,
}

impl ReachabilityMatrix {
    /// Computes the closure of a collapsed network's adjacency.
    pub fn closure(collapsed: &CollapsedNetwork) -> Self {
        Self::from_edges(
            collapsed.event_count(),
            collapsed
                .activities()
                .map(|hop| (hop.source.index(), hop.target.index())),
        )
    }

    /// Computes the closure of an arbitrary edge list over `n` nodes.
    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let stride = n.div_ceil(64);
        let mut matrix = Self {
            n,
            stride,
            bits: vec![0; n * stride],
        };
        for (i, j) in edges {
            matrix.set(i, j);
        }
        matrix.close();
        matrix
    }

    /// Warshall closure: for every pivot k, every row that reaches k also
    /// reaches everything k reaches. The pivot row is snapshotted once per
    /// k so the word-OR can run over the flat bit store.
    fn close(&mut self) {
        let mut pivot = vec![0u64; self.stride];
        for k in 0..self.n {
            pivot.copy_from_slice(&self.bits[k * self.stride..(k + 1) * self.stride]);
            for i in 0..self.n {
                if i == k || !self.bit(i, k) {
                    continue;
                }
                let row = &mut self.bits[i * self.stride..(i + 1) * self.stride];
                for (word, &pivot_word) in row.iter_mut().zip(&pivot) {
                    *word |= pivot_word;
                }
            }
        }
    }

    fn set(&mut self, i: usize, j: usize) {
        self.bits[i * self.stride + j / 64] |= 1 << (j % 64);
    }

    fn bit(&self, i: usize, j: usize) -> bool {
        self.bits[i * self.stride + j / 64] & (1 << (j % 64)) != 0
    }

    /// Whether `to` is reachable from `from` via one or more collapsed
    /// hops.
    pub fn reachable(&self, from: CollapsedId, to: CollapsedId) -> bool {
        self.bit(from.index(), to.index())
    }

    /// Packs a set of target nodes into row-mask form for
    /// [`reaches_any`](Self::reaches_any).
    pub fn target_mask(&self, targets: impl IntoIterator<Item = CollapsedId>) -> Vec<u64> {
        let mut mask = vec![0u64; self.stride];
        for target in targets {
            mask[target.index() / 64] |= 1 << (target.index() % 64);
        }
        mask
    }

    /// Whether any node of the mask is reachable from `from`. One AND per
    /// word; this is the pruning test of the minimal-hop search.
    pub fn reaches_any(&self, from: CollapsedId, mask: &[u64]) -> bool {
        let row = &self.bits[from.index() * self.stride..(from.index() + 1) * self.stride];
        row.iter().zip(mask).any(|(word, m)| word & m != 0)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}
