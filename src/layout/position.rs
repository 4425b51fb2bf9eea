use std::cmp::Ordering;

use crate::config::LayoutConfig;

/// Centres for every node (real and dummy) after ordering.
///
/// Ranks stack along y, each as tall as its tallest node. Within a rank, x follows the
/// median of already placed neighbours with a minimum `node_spacing` gap, swept
/// alternately top-down and bottom-up.
pub(super) fn assign_positions(
    rank_nodes: &[Vec<usize>],
    edges: &[(usize, usize)],
    sizes: &[(f32, f32)],
    config: &LayoutConfig,
) -> Vec<(f32, f32)> {
    let node_count = sizes.len();
    let mut centers = vec![(0.0f32, 0.0f32); node_count];

    let mut main_cursor = 0.0f32;
    for bucket in rank_nodes {
        let rank_height = bucket
            .iter()
            .map(|node| sizes[*node].1)
            .fold(0.0f32, f32::max);
        for node in bucket {
            centers[*node].1 = main_cursor + rank_height / 2.0;
        }
        main_cursor += rank_height + config.rank_spacing;
    }

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in edges {
        incoming[to].push(from);
        outgoing[from].push(to);
    }

    for bucket in rank_nodes {
        let mut cursor = 0.0f32;
        for (idx, node) in bucket.iter().enumerate() {
            let width = sizes[*node].0;
            centers[*node].0 = cursor + width / 2.0 + idx as f32 * 0.01;
            cursor += width + config.node_spacing;
        }
    }

    let mut place_rank = |bucket: &[usize], neighbors: &[Vec<usize>]| {
        if bucket.is_empty() {
            return;
        }
        let mut entries: Vec<(usize, f32, f32, usize)> = Vec::with_capacity(bucket.len());
        for (idx, node) in bucket.iter().enumerate() {
            let current = centers[*node].0;
            let mut neighbor_centers: Vec<f32> = neighbors[*node]
                .iter()
                .map(|neighbor| centers[*neighbor].0)
                .collect();
            let desired = if neighbor_centers.is_empty() {
                current
            } else {
                neighbor_centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let mid = neighbor_centers.len() / 2;
                let median = if neighbor_centers.len() % 2 == 1 {
                    neighbor_centers[mid]
                } else {
                    (neighbor_centers[mid - 1] + neighbor_centers[mid]) * 0.5
                };
                median * 0.85 + current * 0.15
            };
            entries.push((*node, desired, sizes[*node].0 / 2.0, idx));
        }
        // Rank order is fixed by crossing reduction; placement only moves nodes along x.
        entries.sort_by_key(|entry| entry.3);

        let desired_mean = entries.iter().map(|entry| entry.1).sum::<f32>() / entries.len() as f32;
        let mut assigned: Vec<(usize, f32)> = Vec::with_capacity(entries.len());
        let mut prev: Option<(f32, f32)> = None;
        for (node, desired, half, _) in entries {
            let center = match prev {
                Some((prev_center, prev_half)) => {
                    desired.max(prev_center + prev_half + half + config.node_spacing)
                }
                None => desired,
            };
            assigned.push((node, center));
            prev = Some((center, half));
        }
        let actual_mean =
            assigned.iter().map(|(_, center)| *center).sum::<f32>() / assigned.len() as f32;
        let delta = desired_mean - actual_mean;
        for (node, center) in assigned {
            centers[node].0 = center + delta;
        }
    };

    for _ in 0..config.order_passes.max(1) {
        for bucket in rank_nodes {
            place_rank(bucket, &incoming);
        }
        for bucket in rank_nodes.iter().rev() {
            place_rank(bucket, &outgoing);
        }
    }

    centers
}
