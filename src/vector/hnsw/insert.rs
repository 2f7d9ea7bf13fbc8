use std::collections::HashSet;
use crate::vector::hnsw::graph::HnswGraph;
use crate::vector::hnsw::search::search_layer;
use crate::vector::hnsw::visited::VisitedSet;

impl HnswGraph {
    /// Adds a vector as a new node and links it into every layer up to its
    /// level. Returns the node's arena index.
    pub fn insert(&mut self, vector_id: u64, vector: Vec<f32>) -> u32 {
        let level = self.random_level();

        let Some(entry) = self.entry_point else {
            let idx = self.push_node(vector_id, level, vector);
            self.entry_point = Some(idx);
            self.max_layer = level;
            return idx;
        };

        let mut visited = VisitedSet::new(self.nodes.len() + 1);

        // Greedy descent through the layers above the node's level
        let mut current = entry;
        for layer in (level + 1..=self.max_layer).rev() {
            let nearest = search_layer(self, &vector, &[current], 1, layer, &mut visited);
            if let Some(&(_, closest)) = nearest.first() {
                current = closest;
            }
        }

        let top = level.min(self.max_layer);
        let mut neighbors = vec![Vec::new(); level + 1];
        let mut entry_points = vec![current];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                &vector,
                &entry_points,
                self.params.ef_construction,
                layer,
                &mut visited,
            );
            let selected = self.select_neighbors(&candidates, self.m_max(layer));
            neighbors[layer] = selected.iter().map(|&(_, id)| id).collect();

            entry_points = candidates.iter().map(|&(_, id)| id).collect();
            if entry_points.is_empty() {
                entry_points.push(entry);
            }
        }

        let idx = self.push_node(vector_id, level, vector);

        // Back-links, pruning neighbors that overflow
        for (layer, linked) in neighbors.into_iter().enumerate() {
            let m_max = self.m_max(layer);
            self.set_neighbors(idx, layer, linked.clone());
            for neighbor in linked {
                self.link(neighbor, layer, idx);
                if self.nodes[neighbor as usize].neighbors[layer].len() > m_max {
                    self.prune(neighbor, layer);
                }
            }
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(idx);
        }
        idx
    }

    /// Re-selects `node`'s neighbors on `layer` down to the layer's limit
    pub(crate) fn prune(&mut self, node: u32, layer: usize) {
        let base = self.vectors[node as usize].clone();
        let candidates: Vec<(f32, u32)> = self.nodes[node as usize].neighbors[layer]
            .iter()
            .map(|&n| (self.params.metric.distance(&base, self.vector(n)), n))
            .collect();
        let kept = self.select_neighbors(&candidates, self.m_max(layer));
        self.set_neighbors(node, layer, kept.into_iter().map(|(_, id)| id).collect());
    }

    /// Diversity heuristic: a candidate is kept only if it is closer to the
    /// base than to every neighbor kept so far. Remaining slots are filled
    /// with the closest leftovers.
    pub(crate) fn select_neighbors(&self, candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        sorted.dedup_by_key(|c| c.1);

        let mut selected: Vec<(f32, u32)> = Vec::with_capacity(m);
        for &(dist_to_base, candidate) in &sorted {
            if selected.len() >= m {
                break;
            }
            let diverse = selected
                .iter()
                .all(|&(_, kept)| dist_to_base <= self.distance_between(candidate, kept));
            if diverse {
                selected.push((dist_to_base, candidate));
            }
        }

        if selected.len() < m {
            let chosen: HashSet<u32> = selected.iter().map(|&(_, id)| id).collect();
            for &(dist, candidate) in &sorted {
                if selected.len() >= m {
                    break;
                }
                if !chosen.contains(&candidate) {
                    selected.push((dist, candidate));
                }
            }
        }
        selected
    }
}
