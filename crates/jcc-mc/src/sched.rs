//! Instruction scheduling.
//!
//! Per block DAG: a forward adjacency list over the non-leaf nodes (an
//! edge per user → child dependence), Kahn's topological sort assigning
//! strictly increasing topological indices from the root down, and a
//! live-range pass shrinking each producer's interval end towards its
//! furthest consumer. Scheduled nodes are additionally spliced into a
//! doubly linked list.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::node::{McFunction, NodeId};

/// Schedules every block DAG of a function.
pub fn schedule(mcf: &mut McFunction) {
    for i in 0..mcf.subgraphs.len() {
        let root = mcf.subgraphs[i].root;
        let mut adj: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        build_adjacency(mcf, root, &mut adj);
        let order = topo_sort(mcf, &adj);
        // Splice the scheduled nodes into a doubly linked list and update
        // the producers' live ranges as each node lands.
        for pair in order.windows(2) {
            mcf.node_mut(pair[0]).next = Some(pair[1]);
            mcf.node_mut(pair[1]).prev = Some(pair[0]);
        }
        for &node in &order {
            for use_entry in mcf.node(node).uses().to_vec() {
                // Chain edges and unscheduled users do not extend a live
                // range.
                if use_entry.index as usize >= mcf.node(use_entry.user).arity() {
                    continue;
                }
                let user_idx = mcf.node(use_entry.user).topo_idx();
                if user_idx < 0 {
                    continue;
                }
                mcf.update_live_range(node, user_idx);
            }
        }
        mcf.subgraphs[i].sched_order = order;
    }
}

/// Forward adjacency over non-leaf nodes: one edge per (user, non-leaf
/// child) pair, discovered by walking children depth-first from the root.
fn build_adjacency(mcf: &McFunction, node: NodeId, adj: &mut FxHashMap<NodeId, Vec<NodeId>>) {
    if adj.contains_key(&node) {
        return;
    }
    let _ = adj.entry(node).or_default();
    let children: Vec<NodeId> = mcf.node(node).children().to_vec();
    for &child in &children {
        if mcf.node(child).arity() == 0 {
            continue;
        }
        adj.get_mut(&node).expect("node was just inserted").push(child);
    }
    for &child in children.iter().rev() {
        if mcf.node(child).arity() == 0 {
            continue;
        }
        build_adjacency(mcf, child, adj);
    }
}

/// Kahn's algorithm; indices increase strictly in pop order.
fn topo_sort(mcf: &mut McFunction, adj: &FxHashMap<NodeId, Vec<NodeId>>) -> Vec<NodeId> {
    let mut in_degree: FxHashMap<NodeId, usize> = FxHashMap::default();
    for (&node, children) in adj {
        let _ = in_degree.entry(node).or_insert(0);
        for &child in children {
            *in_degree.entry(child).or_insert(0) += 1;
        }
    }
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut roots: Vec<NodeId> = in_degree
        .iter()
        .filter_map(|(&node, &deg)| (deg == 0).then_some(node))
        .collect();
    roots.sort_unstable();
    queue.extend(roots);
    let mut order = Vec::with_capacity(in_degree.len());
    let mut next_idx = 0;
    while let Some(node) = queue.pop_front() {
        mcf.set_topo_idx(node, next_idx);
        next_idx += 1;
        order.push(node);
        for &child in adj.get(&node).map_or(&[][..], Vec::as_slice) {
            let deg = in_degree.get_mut(&child).expect("child has an in-degree entry");
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(child);
            }
        }
    }
    assert_eq!(order.len(), in_degree.len(), "block DAG contains a dependence cycle");
    order
}
