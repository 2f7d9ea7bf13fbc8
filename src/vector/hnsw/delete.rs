use std::collections::BTreeSet;
use crate::vector::hnsw::graph::HnswGraph;

impl HnswGraph {
    /// Detaches a node from every layer. Nodes that lost an edge to it, found
    /// through the in-link lists, are relinked among its former neighborhood.
    /// The entry point moves to the highest remaining node when it was the
    /// one removed.
    pub fn remove(&mut self, idx: u32) -> bool {
        if idx as usize >= self.nodes.len() || self.deleted.contains(idx) {
            return false;
        }
        self.deleted.insert(idx);

        let level = self.nodes[idx as usize].level as usize;
        for layer in 0..=level {
            let outbound = std::mem::take(&mut self.nodes[idx as usize].neighbors[layer]);
            for &n in &outbound {
                self.forget_inbound(n, layer, idx);
            }

            // Edges may be one-directional after pruning, so in-links count too
            let mut affected: BTreeSet<u32> = outbound.iter().copied().collect();
            for other in self.take_inbound(idx, layer) {
                self.nodes[other as usize].neighbors[layer].retain(|n| *n != idx);
                affected.insert(other);
            }
            affected.remove(&idx);

            for node in affected {
                if self.deleted.contains(node) {
                    continue;
                }
                self.repair(node, layer, &outbound);
            }
        }

        if self.entry_point == Some(idx) {
            self.entry_point = self
                .live_nodes()
                .max_by(|a, b| {
                    self.nodes[*a as usize]
                        .level
                        .cmp(&self.nodes[*b as usize].level)
                        .then(b.cmp(a))
                });
            self.max_layer = self
                .entry_point
                .map(|ep| self.nodes[ep as usize].level as usize)
                .unwrap_or(0);
        }
        true
    }

    /// Refills `node`'s adjacency on `layer` from its current neighbors plus
    /// the removed node's neighborhood.
    fn repair(&mut self, node: u32, layer: usize, neighborhood: &[u32]) {
        let mut pool: BTreeSet<u32> = self.nodes[node as usize].neighbors[layer].iter().copied().collect();
        for &candidate in neighborhood {
            let reaches_layer = self.nodes[candidate as usize].level as usize >= layer;
            if candidate != node && reaches_layer && !self.deleted.contains(candidate) {
                pool.insert(candidate);
            }
        }

        let candidates: Vec<(f32, u32)> = pool
            .into_iter()
            .map(|c| (self.distance_between(node, c), c))
            .collect();
        let kept = self.select_neighbors(&candidates, self.m_max(layer));
        self.set_neighbors(node, layer, kept.into_iter().map(|(_, id)| id).collect());
    }
}
