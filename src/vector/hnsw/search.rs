use std::cmp::Reverse;
use std::collections::BinaryHeap;
use ordered_float::OrderedFloat;
use crate::vector::hnsw::graph::HnswGraph;
use crate::vector::hnsw::visited::VisitedSet;

type Scored = (OrderedFloat<f32>, u32);

/// Beam search within one layer. Returns up to `ef` live nodes sorted by
/// ascending distance; deleted nodes still route the search.
pub(crate) fn search_layer(
    graph: &HnswGraph,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<(f32, u32)> {
    visited.clear();
    visited.ensure_capacity(graph.nodes.len());

    // min-heap of frontier, max-heap of results
    let mut candidates: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();
    let mut results: BinaryHeap<Scored> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entry_points {
        if !visited.insert(ep) {
            continue;
        }
        let dist = OrderedFloat(graph.params.metric.distance(query, graph.vector(ep)));
        candidates.push(Reverse((dist, ep)));
        if !graph.is_deleted(ep) {
            results.push((dist, ep));
            if results.len() > ef {
                results.pop();
            }
        }
    }

    while let Some(Reverse((dist, current))) = candidates.pop() {
        if results.len() >= ef {
            if let Some((worst, _)) = results.peek() {
                if dist > *worst {
                    break;
                }
            }
        }

        let node = graph.node(current);
        let Some(neighbors) = node.neighbors.get(layer) else {
            continue;
        };
        for &neighbor in neighbors {
            if !visited.insert(neighbor) {
                continue;
            }
            let d = OrderedFloat(graph.params.metric.distance(query, graph.vector(neighbor)));
            let worst = results.peek().map(|(w, _)| *w);
            if results.len() < ef || worst.is_none_or(|w| d < w) {
                candidates.push(Reverse((d, neighbor)));
                if !graph.is_deleted(neighbor) {
                    results.push((d, neighbor));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|(d, id)| (d.0, id))
        .collect()
}

impl HnswGraph {
    /// Greedy descent to layer 0 followed by a beam of width `ef`.
    /// Returns up to `ef` candidates, closest first.
    pub fn search(&self, query: &[f32], ef: usize) -> Vec<(f32, u32)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };
        let mut visited = VisitedSet::new(self.nodes.len());
        let mut current = entry;
        for layer in (1..=self.max_layer).rev() {
            let nearest = search_layer(self, query, &[current], 1, layer, &mut visited);
            if let Some(&(_, idx)) = nearest.first() {
                current = idx;
            }
        }
        search_layer(self, query, &[current], ef.max(1), 0, &mut visited)
    }

    /// Top `k` after the beam, keeping only candidates accepted by `filter`.
    /// Filtering happens after traversal, so fewer than `k` may come back.
    pub fn search_filtered<F>(&self, query: &[f32], k: usize, ef: usize, filter: F) -> Vec<(f32, u32)>
    where
        F: Fn(u32) -> bool,
    {
        self.search(query, ef.max(k))
            .into_iter()
            .filter(|(_, idx)| filter(*idx))
            .take(k)
            .collect()
    }
}
