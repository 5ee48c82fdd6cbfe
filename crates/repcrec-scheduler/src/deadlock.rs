//! Wait-for graph for deadlock detection
//!
//! Every read or write of a read-write transaction is recorded against its
//! variable. A new access that conflicts with an earlier access of another
//! transaction adds a wait-for edge from the newcomer to the earlier holder.
//! A cycle in that graph is a deadlock.

use repcrec_types::{Timestamp, TxId, VarId};
use std::collections::{BTreeMap, BTreeSet};

/// Kind of recorded access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Shared access
    Read,
    /// Exclusive access
    Write,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Color {
    /// Not yet visited
    White,
    /// On the current DFS path
    Gray,
    /// Fully explored
    Black,
}

/// DFS frame: a vertex and the successors still to explore
struct Frame {
    node: TxId,
    successors: Vec<TxId>,
    next: usize,
}

/// Wait-for graph over live read-write transactions
#[derive(Debug, Default)]
pub struct DeadlockDetector {
    /// Accesses recorded per variable, in arrival order
    var_index: BTreeMap<VarId, Vec<(TxId, Access)>>,
    /// Edges: tx -> transactions it waits for
    wait_for: BTreeMap<TxId, BTreeSet<TxId>>,
}

impl DeadlockDetector {
    /// Create a new empty detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access and add the wait-for edges it implies
    ///
    /// Accesses by the same transaction never conflict with each other.
    pub fn record(&mut self, tx_id: TxId, access: Access, var: VarId) {
        let recorded = self.var_index.entry(var).or_default();

        let waits_on: BTreeSet<TxId> = match access {
            Access::Read => {
                if recorded.iter().any(|(tx, _)| *tx == tx_id) {
                    BTreeSet::new()
                } else {
                    recorded
                        .iter()
                        .filter(|(tx, kind)| *tx != tx_id && *kind == Access::Write)
                        .map(|(tx, _)| *tx)
                        .collect()
                }
            }
            Access::Write => {
                if recorded
                    .iter()
                    .any(|(tx, kind)| *tx == tx_id && *kind == Access::Write)
                {
                    BTreeSet::new()
                } else {
                    recorded
                        .iter()
                        .filter(|(tx, _)| *tx != tx_id)
                        .map(|(tx, _)| *tx)
                        .collect()
                }
            }
        };

        recorded.push((tx_id, access));

        if !waits_on.is_empty() {
            tracing::debug!(tx = %tx_id, var = %var, ?waits_on, "wait-for edges added");
            self.wait_for.entry(tx_id).or_default().extend(waits_on);
        }
    }

    /// Transactions `tx_id` waits for
    pub fn waits_for(&self, tx_id: TxId) -> BTreeSet<TxId> {
        self.wait_for.get(&tx_id).cloned().unwrap_or_default()
    }

    /// Find a cycle, returning its vertices
    ///
    /// Iterative depth-first search with an explicit stack. Vertices are
    /// explored in ascending ID order, so the result is deterministic.
    pub fn find_cycle(&self) -> Option<BTreeSet<TxId>> {
        let vertices: BTreeSet<TxId> = self
            .wait_for
            .iter()
            .flat_map(|(from, targets)| std::iter::once(*from).chain(targets.iter().copied()))
            .collect();
        let mut color: BTreeMap<TxId, Color> =
            vertices.iter().map(|tx| (*tx, Color::White)).collect();

        for start in vertices {
            if color.get(&start) != Some(&Color::White) {
                continue;
            }

            color.insert(start, Color::Gray);
            let mut stack = vec![self.frame(start)];

            while let Some(frame) = stack.last_mut() {
                let Some(&succ) = frame.successors.get(frame.next) else {
                    color.insert(frame.node, Color::Black);
                    stack.pop();
                    continue;
                };
                frame.next += 1;

                match color.get(&succ).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(succ, Color::Gray);
                        stack.push(self.frame(succ));
                    }
                    Color::Gray => {
                        let pos = stack.iter().position(|f| f.node == succ)?;
                        return Some(stack[pos..].iter().map(|f| f.node).collect());
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    /// Check whether the graph contains a cycle
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Forget a finished transaction
    ///
    /// Drops its recorded accesses, its outgoing edges and every edge
    /// pointing at it, so no stale edge can close a cycle later.
    pub fn purge(&mut self, tx_id: TxId) {
        for recorded in self.var_index.values_mut() {
            recorded.retain(|(tx, _)| *tx != tx_id);
        }
        self.var_index.retain(|_, recorded| !recorded.is_empty());

        self.wait_for.remove(&tx_id);
        for targets in self.wait_for.values_mut() {
            targets.remove(&tx_id);
        }
        self.wait_for.retain(|_, targets| !targets.is_empty());
    }

    /// Get total number of wait-for edges
    pub fn edge_count(&self) -> usize {
        self.wait_for.values().map(BTreeSet::len).sum()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.var_index.is_empty() && self.wait_for.is_empty()
    }

    fn frame(&self, node: TxId) -> Frame {
        Frame {
            node,
            successors: self
                .wait_for
                .get(&node)
                .map(|targets| targets.iter().copied().collect())
                .unwrap_or_default(),
            next: 0,
        }
    }
}

/// Pick the deadlock victim: the youngest transaction
///
/// Largest start time wins; equal start times fall back to the larger ID.
pub fn select_victim<I>(candidates: I) -> Option<TxId>
where
    I: IntoIterator<Item = (TxId, Timestamp)>,
{
    candidates
        .into_iter()
        .max_by_key(|(tx, start)| (*start, *tx))
        .map(|(tx, _)| tx)
}
