use std::collections::HashMap;

use log::{trace, warn};

use crate::ir::{Flow, FlowDocument};

use super::NodeKind;

#[derive(Debug, Clone)]
pub(super) struct NodeRecord {
    pub(super) id: String,
    pub(super) kind: NodeKind,
    pub(super) label: String,
    /// Participant id; `None` for gateways.
    pub(super) lane_owner: Option<String>,
    /// Explicit phase id.
    pub(super) rank_hint: Option<String>,
}

/// Contiguous node records plus an id lookup, so later stages work on dense
/// indices. Tasks come first in declaration order, then gateways.
#[derive(Debug, Clone, Default)]
pub(super) struct NodeTable {
    nodes: Vec<NodeRecord>,
    index: HashMap<String, usize>,
}

impl NodeTable {
    pub(super) fn from_document(doc: &FlowDocument) -> Self {
        let mut table = Self::default();
        for task in &doc.tasks {
            let label = if task.name.trim().is_empty() {
                task.id.clone()
            } else {
                task.name.clone()
            };
            table.insert(NodeRecord {
                id: task.id.clone(),
                kind: NodeKind::Task,
                label,
                lane_owner: Some(task.actor_id.clone()),
                rank_hint: task.phase_id.clone().filter(|phase| !phase.is_empty()),
            });
        }
        for gateway in &doc.gateways {
            table.insert(NodeRecord {
                id: gateway.id.clone(),
                kind: NodeKind::Gateway(gateway.kind),
                label: gateway.name.clone(),
                lane_owner: None,
                rank_hint: None,
            });
        }
        table
    }

    fn insert(&mut self, record: NodeRecord) {
        if record.id.is_empty() {
            warn!("skipping node with an empty id");
            return;
        }
        if self.index.contains_key(&record.id) {
            warn!("duplicate node id '{}', keeping the first declaration", record.id);
            return;
        }
        self.index.insert(record.id.clone(), self.nodes.len());
        self.nodes.push(record);
    }

    pub(super) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(super) fn get(&self, idx: usize) -> &NodeRecord {
        &self.nodes[idx]
    }

    pub(super) fn lookup(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (usize, &NodeRecord)> {
        self.nodes.iter().enumerate()
    }
}

/// Forward and reverse adjacency over dense node indices. Neighbor lists keep
/// flow declaration order.
#[derive(Debug, Clone, Default)]
pub(super) struct Adjacency {
    pub(super) forward: Vec<Vec<usize>>,
    pub(super) reverse: Vec<Vec<usize>>,
}

impl Adjacency {
    /// Edges with an empty id on either end are skipped. Edges naming an unknown
    /// node carry no structure; the router reports them.
    pub(super) fn build(table: &NodeTable, flows: &[Flow]) -> Self {
        let mut forward = vec![Vec::new(); table.len()];
        let mut reverse = vec![Vec::new(); table.len()];
        for flow in flows {
            if flow.from.is_empty() || flow.to.is_empty() {
                trace!("flow '{}' has an empty endpoint", flow.id);
                continue;
            }
            let (Some(from), Some(to)) = (table.lookup(&flow.from), table.lookup(&flow.to)) else {
                continue;
            };
            forward[from].push(to);
            reverse[to].push(from);
        }
        Self { forward, reverse }
    }

    pub(super) fn successors(&self, idx: usize) -> &[usize] {
        &self.forward[idx]
    }

    pub(super) fn predecessors(&self, idx: usize) -> &[usize] {
        &self.reverse[idx]
    }

    /// Strongly connected component id per node: two nodes share an id exactly
    /// when each reaches the other. Iterative, so deep chains cannot overflow.
    pub(super) fn components(&self) -> Vec<usize> {
        let n = self.forward.len();
        let mut visited = vec![false; n];
        let mut finish = Vec::with_capacity(n);
        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                if let Some(&next) = self.forward[node].get(cursor) {
                    top.1 += 1;
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, 0));
                    }
                } else {
                    finish.push(node);
                    stack.pop();
                }
            }
        }

        let mut component = vec![usize::MAX; n];
        let mut count = 0;
        for &root in finish.iter().rev() {
            if component[root] != usize::MAX {
                continue;
            }
            component[root] = count;
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                for &prev in &self.reverse[node] {
                    if component[prev] == usize::MAX {
                        component[prev] = count;
                        stack.push(prev);
                    }
                }
            }
            count += 1;
        }
        component
    }
}
