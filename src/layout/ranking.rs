use std::collections::{BTreeMap, HashMap, VecDeque};

use log::{debug, warn};

use crate::config::PhaseHintPolicy;
use crate::ir::Phase;

use super::graph::{Adjacency, NodeTable};

#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct RankSpec {
    pub(super) phase_id: Option<String>,
    pub(super) phase_label: Option<String>,
}

#[derive(Debug, Clone)]
pub(super) struct RankAssignment {
    pub(super) ranks: Vec<RankSpec>,
    pub(super) rank_of: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(super) struct RankOrder {
    /// Node indices per rank, top to bottom.
    pub(super) by_rank: Vec<Vec<usize>>,
    pub(super) order_in_rank: Vec<usize>,
}

/// Topological leveling: every node starts at its phase floor, zero in-degree
/// nodes seed a FIFO queue, and a successor is enqueued once all of its incoming
/// edges have been consumed, at `max(rank, rank(pred) + 1)`.
///
/// When the queue drains with nodes left over, some of them sit on a cycle. The
/// seed comes from a cycle none of whose outside predecessors are still waiting:
/// preferably its entry (the earliest declared member with a placed predecessor),
/// else its earliest declared member. The seed goes one rank past the maximum
/// assigned so far and the walk resumes from it; its remaining incoming edges count
/// as back-edges. Every node is processed exactly once, and an edge that does not
/// close a cycle always points to a higher rank.
pub(super) fn assign_ranks(
    table: &NodeTable,
    adj: &Adjacency,
    phases: &[Phase],
    policy: PhaseHintPolicy,
) -> RankAssignment {
    let n = table.len();
    let phase_index: HashMap<&str, usize> = phases
        .iter()
        .enumerate()
        .map(|(idx, phase)| (phase.id.as_str(), idx))
        .collect();

    let hinted_phase: Vec<Option<usize>> = table
        .iter()
        .map(|(_, node)| {
            let phase = node.rank_hint.as_deref()?;
            let idx = phase_index.get(phase).copied();
            if idx.is_none() {
                warn!("node '{}' names unknown phase '{}', ignoring it", node.id, phase);
            }
            idx
        })
        .collect();
    let floor: Vec<usize> = match policy {
        PhaseHintPolicy::Floor => hinted_phase.iter().map(|phase| phase.unwrap_or(0)).collect(),
        PhaseHintPolicy::Ignore => vec![0; n],
    };

    let mut rank = floor.clone();
    let mut indeg: Vec<usize> = (0..n).map(|idx| adj.predecessors(idx).len()).collect();
    let mut processed = vec![false; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&idx| indeg[idx] == 0).collect();
    let mut max_assigned: Option<usize> = None;
    let component = adj.components();

    loop {
        while let Some(current) = queue.pop_front() {
            if processed[current] {
                continue;
            }
            processed[current] = true;
            max_assigned = Some(max_assigned.map_or(rank[current], |max| max.max(rank[current])));
            for &next in adj.successors(current) {
                if processed[next] {
                    continue;
                }
                rank[next] = rank[next].max(rank[current] + 1);
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        let Some(seed) = next_seed(adj, &component, &processed) else {
            break;
        };
        let seed_rank = max_assigned.map_or(0, |max| max + 1).max(rank[seed]);
        debug!(
            "cycle through '{}', placing it at rank {}",
            table.get(seed).id,
            seed_rank
        );
        rank[seed] = seed_rank;
        indeg[seed] = 0;
        queue.push_back(seed);
    }

    // Phase floors can leave unused columns; compact to consecutive indices.
    let used: BTreeMap<usize, usize> = {
        let mut distinct: Vec<usize> = rank.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
            .into_iter()
            .enumerate()
            .map(|(compact, raw)| (raw, compact))
            .collect()
    };
    let rank_of: Vec<usize> = rank.iter().map(|raw| used[raw]).collect();

    let mut ranks = vec![RankSpec::default(); used.len()];
    let mut rank_phase: Vec<Option<usize>> = vec![None; used.len()];
    for (idx, phase) in hinted_phase.iter().enumerate() {
        let Some(phase) = *phase else { continue };
        let slot = &mut rank_phase[rank_of[idx]];
        if slot.is_none_or(|current| phase < current) {
            *slot = Some(phase);
        }
    }
    for (spec, phase) in ranks.iter_mut().zip(rank_phase) {
        if let Some(phase) = phase {
            spec.phase_id = Some(phases[phase].id.clone());
            spec.phase_label = Some(phases[phase].name.clone());
        }
    }

    RankAssignment { ranks, rank_of }
}

/// Picks the next cycle seed among unprocessed nodes, or `None` once all are
/// processed.
fn next_seed(adj: &Adjacency, component: &[usize], processed: &[bool]) -> Option<usize> {
    let mut waiting = vec![false; component.len()];
    for node in (0..processed.len()).filter(|&idx| !processed[idx]) {
        for &next in adj.successors(node) {
            if component[next] != component[node] {
                waiting[component[next]] = true;
            }
        }
    }
    let mut candidates = (0..processed.len()).filter(|&idx| !processed[idx] && !waiting[component[idx]]);
    let first = candidates.next()?;
    let entered = |idx: usize| adj.predecessors(idx).iter().any(|&pred| processed[pred]);
    if entered(first) {
        return Some(first);
    }
    Some(candidates.find(|&idx| entered(idx)).unwrap_or(first))
}

/// Sorts the nodes of each rank by `(lane, id)`.
pub(super) fn order_ranks(table: &NodeTable, ranking: &RankAssignment, lane_of: &[usize]) -> RankOrder {
    let mut by_rank: Vec<Vec<usize>> = vec![Vec::new(); ranking.ranks.len()];
    for (idx, _) in table.iter() {
        by_rank[ranking.rank_of[idx]].push(idx);
    }
    let mut order_in_rank = vec![0; table.len()];
    for bucket in &mut by_rank {
        bucket.sort_by(|&a, &b| {
            lane_of[a]
                .cmp(&lane_of[b])
                .then_with(|| table.get(a).id.cmp(&table.get(b).id))
        });
        for (order, &idx) in bucket.iter().enumerate() {
            order_in_rank[idx] = order;
        }
    }
    RankOrder {
        by_rank,
        order_in_rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FlowDocument, GatewayKind};

    fn ranks_of(doc: &FlowDocument, policy: PhaseHintPolicy) -> (NodeTable, RankAssignment) {
        let table = NodeTable::from_document(doc);
        let adj = Adjacency::build(&table, &doc.flows);
        let ranking = assign_ranks(&table, &adj, &doc.phases, policy);
        (table, ranking)
    }

    fn rank(table: &NodeTable, ranking: &RankAssignment, id: &str) -> usize {
        ranking.rank_of[table.lookup(id).unwrap()]
    }

    fn chain(ids: &[&str]) -> FlowDocument {
        let mut doc = FlowDocument::new();
        doc.add_actor("a", "A");
        for id in ids {
            doc.add_task(id, id, "a", None);
        }
        for pair in ids.windows(2) {
            doc.add_flow(pair[0], pair[1], None);
        }
        doc
    }

    #[test]
    fn linear_chain_levels() {
        let (table, ranking) = ranks_of(&chain(&["A", "B", "C"]), PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "A"), 0);
        assert_eq!(rank(&table, &ranking, "B"), 1);
        assert_eq!(rank(&table, &ranking, "C"), 2);
        assert_eq!(ranking.ranks.len(), 3);
    }

    #[test]
    fn longest_path_wins() {
        let mut doc = chain(&["A", "B", "C"]);
        doc.add_task("D", "D", "a", None);
        doc.add_flow("A", "D", None);
        doc.add_flow("D", "C", None);
        doc.add_flow("A", "C", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "D"), 1);
        assert_eq!(rank(&table, &ranking, "C"), 2);
    }

    #[test]
    fn two_cycle_gets_distinct_ranks() {
        let mut doc = chain(&["A", "B"]);
        doc.add_flow("B", "A", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "A"), 0);
        assert_eq!(rank(&table, &ranking, "B"), 1);
    }

    #[test]
    fn cycle_behind_a_source_is_placed_after_it() {
        let mut doc = chain(&["S", "A", "B"]);
        doc.add_flow("B", "A", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "S"), 0);
        assert_eq!(rank(&table, &ranking, "A"), 1);
        assert_eq!(rank(&table, &ranking, "B"), 2);
    }

    #[test]
    fn cycle_entry_is_seeded_before_downstream_nodes() {
        let mut doc = FlowDocument::new();
        doc.add_actor("a", "A");
        doc.add_task("start", "Start", "a", None);
        doc.add_task("done", "Done", "a", None);
        doc.add_task("work", "Work", "a", None);
        doc.add_gateway("merge", "", GatewayKind::Exclusive);
        doc.add_gateway("check", "Ok?", GatewayKind::Exclusive);
        doc.add_flow("start", "merge", None);
        doc.add_flow("merge", "work", None);
        doc.add_flow("work", "check", None);
        doc.add_flow("check", "merge", Some("no"));
        doc.add_flow("check", "done", Some("yes"));
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "start"), 0);
        assert_eq!(rank(&table, &ranking, "merge"), 1);
        assert_eq!(rank(&table, &ranking, "work"), 2);
        assert_eq!(rank(&table, &ranking, "check"), 3);
        assert!(rank(&table, &ranking, "done") > rank(&table, &ranking, "check"));
    }

    #[test]
    fn second_cycle_waits_for_the_first() {
        // B -> C leaves the first cycle, D <-> E is only reachable through C.
        let mut doc = chain(&["D", "E", "A", "B", "C"]);
        doc.flows.clear();
        doc.add_flow("A", "B", None);
        doc.add_flow("B", "A", None);
        doc.add_flow("B", "C", None);
        doc.add_flow("C", "D", None);
        doc.add_flow("D", "E", None);
        doc.add_flow("E", "D", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        let r = |id: &str| rank(&table, &ranking, id);
        assert_eq!(r("A"), 0);
        assert_eq!(r("B"), 1);
        assert!(r("C") > r("B"));
        assert!(r("D") > r("C"));
        assert!(r("E") > r("D"));
    }

    #[test]
    fn self_loop_terminates() {
        let mut doc = chain(&["A"]);
        doc.add_flow("A", "A", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "A"), 0);
    }

    #[test]
    fn phase_floor_pushes_rank_and_compacts() {
        let mut doc = FlowDocument::new();
        doc.add_actor("a", "A");
        doc.add_phase("p1", "One");
        doc.add_phase("p2", "Two");
        doc.add_phase("p3", "Three");
        doc.add_task("x", "X", "a", Some("p3"));
        doc.add_task("y", "Y", "a", Some("p1"));
        doc.add_flow("x", "y", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "x"), 0);
        assert_eq!(rank(&table, &ranking, "y"), 1);
        assert_eq!(ranking.ranks[0].phase_id.as_deref(), Some("p3"));
        assert_eq!(ranking.ranks[1].phase_label.as_deref(), Some("One"));
    }

    #[test]
    fn unconnected_phases_become_columns() {
        let mut doc = FlowDocument::new();
        doc.add_actor("a", "A");
        doc.add_phase("p1", "One");
        doc.add_phase("p2", "Two");
        doc.add_task("x", "X", "a", Some("p2"));
        doc.add_task("y", "Y", "a", Some("p1"));
        let (table, floor) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &floor, "x"), 1);
        assert_eq!(rank(&table, &floor, "y"), 0);
        let (table, ignore) = ranks_of(&doc, PhaseHintPolicy::Ignore);
        assert_eq!(rank(&table, &ignore, "x"), 0);
        assert_eq!(ignore.ranks.len(), 1);
    }

    #[test]
    fn gateway_rank_follows_predecessor() {
        let mut doc = chain(&["A", "B"]);
        doc.add_gateway("g", "G", GatewayKind::Exclusive);
        doc.flows.clear();
        doc.add_flow("A", "g", None);
        doc.add_flow("g", "B", None);
        let (table, ranking) = ranks_of(&doc, PhaseHintPolicy::Floor);
        assert_eq!(rank(&table, &ranking, "g"), 1);
        assert_eq!(rank(&table, &ranking, "B"), 2);
    }

    #[test]
    fn order_sorts_by_lane_then_id() {
        let mut doc = FlowDocument::new();
        doc.add_actor("a", "A");
        doc.add_actor("b", "B");
        doc.add_task("z", "Z", "a", None);
        doc.add_task("m", "M", "b", None);
        doc.add_task("c", "C", "b", None);
        let table = NodeTable::from_document(&doc);
        let adj = Adjacency::build(&table, &doc.flows);
        let ranking = assign_ranks(&table, &adj, &doc.phases, PhaseHintPolicy::Floor);
        let lane_of = vec![0, 1, 1];
        let order = order_ranks(&table, &ranking, &lane_of);
        let ids: Vec<&str> = order.by_rank[0]
            .iter()
            .map(|&idx| table.get(idx).id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "c", "m"]);
        assert_eq!(order.order_in_rank[table.lookup("m").unwrap()], 2);
    }
}
