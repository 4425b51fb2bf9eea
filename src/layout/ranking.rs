use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Longest-path ranks over forward edges.
///
/// Nodes are visited in topological order with ties broken by declaration order. When a
/// cycle stalls the walk, the earliest declared unprocessed node is taken next and its
/// incoming edges from unprocessed nodes become back-edges.
pub(super) fn compute_ranks(node_count: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indeg = vec![0usize; node_count];
    for &(from, to) in edges {
        adj[from].push(to);
        indeg[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (node, deg) in indeg.iter().enumerate() {
        if *deg == 0 {
            ready.push(Reverse(node));
        }
    }

    let mut order = Vec::with_capacity(node_count);
    let mut processed = vec![false; node_count];
    loop {
        while let Some(Reverse(node)) = ready.pop() {
            if processed[node] {
                continue;
            }
            order.push(node);
            processed[node] = true;
            for &next in &adj[node] {
                if processed[next] {
                    continue;
                }
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() >= node_count {
            break;
        }
        match processed.iter().position(|done| !done) {
            Some(node) => ready.push(Reverse(node)),
            None => break,
        }
    }

    let mut order_index = vec![0usize; node_count];
    for (idx, node) in order.iter().enumerate() {
        order_index[*node] = idx;
    }

    let mut ranks = vec![0usize; node_count];
    for &node in &order {
        let rank = ranks[node];
        for &next in &adj[node] {
            if order_index[next] <= order_index[node] {
                continue;
            }
            ranks[next] = ranks[next].max(rank + 1);
        }
    }
    ranks
}

/// Reorders every rank with alternating down/up median sweeps and keeps the ordering
/// with the fewest crossings seen.
pub(super) fn order_rank_nodes(
    rank_nodes: &mut [Vec<usize>],
    edges: &[(usize, usize)],
    node_count: usize,
    passes: usize,
) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        outgoing[from].push(to);
        incoming[to].push(from);
    }

    let mut positions = vec![0usize; node_count];
    let update_positions = |rank_nodes: &[Vec<usize>], positions: &mut [usize]| {
        for bucket in rank_nodes {
            for (idx, node) in bucket.iter().enumerate() {
                positions[*node] = idx;
            }
        }
    };
    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<usize>, neighbors: &[Vec<usize>], positions: &[usize]| {
        let mut keyed: Vec<(f32, usize, usize)> = bucket
            .iter()
            .enumerate()
            .map(|(idx, node)| (median_position(*node, neighbors, positions, idx), idx, *node))
            .collect();
        keyed.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });
        for (slot, (_, _, node)) in bucket.iter_mut().zip(keyed) {
            *slot = node;
        }
    };

    let mut best = rank_nodes.to_vec();
    let mut best_crossings = count_crossings(rank_nodes, edges, &positions, node_count);
    for _ in 0..passes.max(1) {
        if best_crossings == 0 {
            break;
        }
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len().saturating_sub(1)).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        let crossings = count_crossings(rank_nodes, edges, &positions, node_count);
        if crossings < best_crossings {
            best_crossings = crossings;
            best = rank_nodes.to_vec();
        }
    }
    rank_nodes.clone_from_slice(&best);
}

pub(super) fn median_position(
    node: usize,
    neighbors: &[Vec<usize>],
    positions: &[usize],
    current: usize,
) -> f32 {
    let mut values: Vec<f32> = neighbors[node]
        .iter()
        .map(|neighbor| positions[*neighbor] as f32)
        .collect();
    if values.is_empty() {
        return current as f32;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Crossings between adjacent ranks; `edges` must only join consecutive ranks.
pub(super) fn count_crossings(
    rank_nodes: &[Vec<usize>],
    edges: &[(usize, usize)],
    positions: &[usize],
    node_count: usize,
) -> usize {
    let mut node_rank = vec![0usize; node_count];
    for (rank, bucket) in rank_nodes.iter().enumerate() {
        for node in bucket {
            node_rank[*node] = rank;
        }
    }
    let mut per_gap: Vec<Vec<(usize, usize)>> = vec![Vec::new(); rank_nodes.len()];
    for &(from, to) in edges {
        per_gap[node_rank[from]].push((positions[from], positions[to]));
    }
    let mut crossings = 0;
    for pairs in &mut per_gap {
        pairs.sort_unstable();
        for (i, a) in pairs.iter().enumerate() {
            for b in &pairs[i + 1..] {
                if a.0 < b.0 && a.1 > b.1 {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_longest_path() {
        // 0 -> 1 -> 2, 0 -> 2
        let ranks = compute_ranks(3, &[(0, 1), (1, 2), (0, 2)]);
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn cycles_break_at_earliest_declared_node() {
        // 0 -> 1 -> 2 -> 1 loops back; 2 -> 0 closes the outer cycle.
        let ranks = compute_ranks(3, &[(0, 1), (1, 2), (2, 1), (2, 0)]);
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn ordering_removes_a_simple_crossing() {
        // rank0: [0, 1]; rank1: [2, 3]; edges cross as declared.
        let mut ranks = vec![vec![0, 1], vec![2, 3]];
        let edges = [(0, 3), (1, 2)];
        order_rank_nodes(&mut ranks, &edges, 4, 4);
        let mut positions = vec![0; 4];
        for bucket in &ranks {
            for (idx, node) in bucket.iter().enumerate() {
                positions[*node] = idx;
            }
        }
        assert_eq!(count_crossings(&ranks, &edges, &positions, 4), 0);
    }

    #[test]
    fn median_of_even_neighbors_is_the_midpoint() {
        let neighbors = vec![vec![1, 2], vec![], vec![]];
        let positions = vec![0, 1, 4];
        assert_eq!(median_position(0, &neighbors, &positions, 0), 2.5);
        assert_eq!(median_position(1, &neighbors, &positions, 3), 3.0);
    }
}
