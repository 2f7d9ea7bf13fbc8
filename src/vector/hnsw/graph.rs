use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::vector::config::{DistanceMetric, VectorConfig};

/// Hard cap on node levels
pub const MAX_LEVEL: usize = 16;

/// Arena node: external vector id plus one adjacency list per layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub vector_id: u64,
    pub level: u8,
    pub neighbors: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub m: usize,
    pub m_max0: usize,
    pub ef_construction: usize,
    pub metric: DistanceMetric,
}

impl From<&VectorConfig> for HnswParams {
    fn from(config: &VectorConfig) -> Self {
        HnswParams {
            m: config.m,
            m_max0: config.m_max0(),
            ef_construction: config.ef_construction,
            metric: config.metric,
        }
    }
}

/// Hierarchical navigable small world graph over an arena of nodes
/// addressed by dense `u32` indexes. Vectors live beside the nodes.
pub struct HnswGraph {
    pub(crate) params: HnswParams,
    pub(crate) nodes: Vec<Node>,
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) deleted: RoaringBitmap,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_layer: usize,
    // inbound[n][layer]: nodes whose adjacency on `layer` contains n
    inbound: Vec<Vec<Vec<u32>>>,
    rng: StdRng,
}

/// Persisted adjacency; vectors are restored from their own records
#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Node>,
    deleted: Vec<u32>,
    entry_point: Option<u32>,
    max_layer: usize,
}

impl HnswGraph {
    pub fn new(params: HnswParams) -> Self {
        HnswGraph {
            params,
            nodes: Vec::new(),
            vectors: Vec::new(),
            deleted: RoaringBitmap::new(),
            entry_point: None,
            max_layer: 0,
            inbound: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic level assignment, for reproducible graphs
    pub fn with_seed(params: HnswParams, seed: u64) -> Self {
        let mut graph = Self::new(params);
        graph.rng = StdRng::seed_from_u64(seed);
        graph
    }

    /// Live node count
    pub fn len(&self) -> usize {
        self.nodes.len() - self.deleted.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Number of layers in use
    pub fn layers(&self) -> usize {
        if self.entry_point.is_some() { self.max_layer + 1 } else { 0 }
    }

    pub fn is_deleted(&self, idx: u32) -> bool {
        self.deleted.contains(idx)
    }

    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[idx as usize]
    }

    pub fn vector(&self, idx: u32) -> &[f32] {
        &self.vectors[idx as usize]
    }

    /// Nodes linking to `idx` on `layer`
    pub fn inbound(&self, idx: u32, layer: usize) -> &[u32] {
        self.inbound
            .get(idx as usize)
            .and_then(|layers| layers.get(layer))
            .map_or(&[], Vec::as_slice)
    }

    /// Appends a node with empty adjacency on each of its layers
    pub(crate) fn push_node(&mut self, vector_id: u64, level: usize, vector: Vec<f32>) -> u32 {
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node { vector_id, level: level as u8, neighbors: vec![Vec::new(); level + 1] });
        self.inbound.push(vec![Vec::new(); level + 1]);
        self.vectors.push(vector);
        idx
    }

    /// Replaces `node`'s adjacency on `layer`, keeping in-links in step
    pub(crate) fn set_neighbors(&mut self, node: u32, layer: usize, list: Vec<u32>) {
        let old = std::mem::replace(&mut self.nodes[node as usize].neighbors[layer], list);
        for &n in &old {
            if !self.nodes[node as usize].neighbors[layer].contains(&n) {
                self.forget_inbound(n, layer, node);
            }
        }
        let added: Vec<u32> = self.nodes[node as usize].neighbors[layer]
            .iter()
            .copied()
            .filter(|n| !old.contains(n))
            .collect();
        for n in added {
            self.note_inbound(n, layer, node);
        }
    }

    /// Adds the edge `node -> target` on `layer`
    pub(crate) fn link(&mut self, node: u32, layer: usize, target: u32) {
        self.nodes[node as usize].neighbors[layer].push(target);
        self.note_inbound(target, layer, node);
    }

    pub(crate) fn note_inbound(&mut self, target: u32, layer: usize, source: u32) {
        if let Some(list) = self.inbound.get_mut(target as usize).and_then(|l| l.get_mut(layer)) {
            list.push(source);
        }
    }

    pub(crate) fn forget_inbound(&mut self, target: u32, layer: usize, source: u32) {
        if let Some(list) = self.inbound.get_mut(target as usize).and_then(|l| l.get_mut(layer)) {
            if let Some(pos) = list.iter().position(|s| *s == source) {
                list.swap_remove(pos);
            }
        }
    }

    pub(crate) fn take_inbound(&mut self, target: u32, layer: usize) -> Vec<u32> {
        self.inbound
            .get_mut(target as usize)
            .and_then(|l| l.get_mut(layer))
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn rebuild_inbound(&mut self) {
        self.inbound = self.nodes.iter().map(|n| vec![Vec::new(); n.neighbors.len()]).collect();
        for idx in 0..self.nodes.len() {
            for layer in 0..self.nodes[idx].neighbors.len() {
                for i in 0..self.nodes[idx].neighbors[layer].len() {
                    let target = self.nodes[idx].neighbors[layer][i];
                    self.note_inbound(target, layer, idx as u32);
                }
            }
        }
    }

    pub(crate) fn distance_between(&self, a: u32, b: u32) -> f32 {
        self.params.metric.distance(&self.vectors[a as usize], &self.vectors[b as usize])
    }

    pub(crate) fn m_max(&self, layer: usize) -> usize {
        if layer == 0 { self.params.m_max0 } else { self.params.m }
    }

    /// floor(-ln(U) / ln(M)), U uniform in (0, 1]
    pub(crate) fn random_level(&mut self) -> usize {
        let ml = 1.0 / (self.params.m as f64).ln();
        let u: f64 = 1.0 - self.rng.gen_range(0.0..1.0);
        let level = (-u.ln() * ml).floor() as usize;
        level.min(MAX_LEVEL)
    }

    /// Live arena indexes in arena order
    pub fn live_nodes(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.nodes.len() as u32).filter(move |idx| !self.deleted.contains(*idx))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.clone(),
            deleted: self.deleted.iter().collect(),
            entry_point: self.entry_point,
            max_layer: self.max_layer,
        };
        let raw = bincode::serialize(&snapshot)?;
        Ok(lz4_flex::compress_prepend_size(&raw))
    }

    /// Rebuilds the graph from a snapshot. `vector_of` supplies the vector of
    /// each live node by external id; deleted slots keep an empty vector.
    pub fn from_bytes<F>(params: HnswParams, bytes: &[u8], mut vector_of: F) -> Result<Self>
    where
        F: FnMut(u64) -> Option<Vec<f32>>,
    {
        let raw = lz4_flex::decompress_size_prepended(bytes)?;
        let snapshot: GraphSnapshot = bincode::deserialize(&raw)?;
        let deleted: RoaringBitmap = snapshot.deleted.into_iter().collect();

        let mut vectors = Vec::with_capacity(snapshot.nodes.len());
        for (idx, node) in snapshot.nodes.iter().enumerate() {
            if node.neighbors.len() != node.level as usize + 1 {
                return Err(Error::corrupt(format!("graph node {} has a malformed layer list", idx)));
            }
            let bad_edge = node.neighbors.iter().enumerate().any(|(layer, list)| {
                list.iter().any(|n| {
                    snapshot
                        .nodes
                        .get(*n as usize)
                        .is_none_or(|target| (target.level as usize) < layer)
                })
            });
            if bad_edge {
                return Err(Error::corrupt(format!("graph node {} links outside the arena or its layer", idx)));
            }
            if deleted.contains(idx as u32) {
                vectors.push(Vec::new());
            } else {
                let vector = vector_of(node.vector_id).ok_or_else(|| {
                    Error::corrupt(format!("graph references missing vector {}", node.vector_id))
                })?;
                vectors.push(vector);
            }
        }
        if let Some(ep) = snapshot.entry_point {
            if ep as usize >= snapshot.nodes.len() || deleted.contains(ep) {
                return Err(Error::corrupt("graph entry point is not a live node"));
            }
        }

        let mut graph = HnswGraph::new(params);
        graph.nodes = snapshot.nodes;
        graph.vectors = vectors;
        graph.deleted = deleted;
        graph.entry_point = snapshot.entry_point;
        graph.max_layer = snapshot.max_layer;
        graph.rebuild_inbound();
        Ok(graph)
    }

    /// Rebuilds the arena without deleted slots. Returns the new graph and a
    /// map from old index to new index.
    pub fn compacted(&self) -> (HnswGraph, Vec<Option<u32>>) {
        let mut remap = vec![None; self.nodes.len()];
        let mut next = 0u32;
        for idx in self.live_nodes() {
            remap[idx as usize] = Some(next);
            next += 1;
        }

        let mut graph = HnswGraph::new(self.params);
        graph.rng = self.rng.clone();
        for idx in self.live_nodes() {
            let node = &self.nodes[idx as usize];
            let neighbors = node
                .neighbors
                .iter()
                .map(|layer| layer.iter().filter_map(|n| remap[*n as usize]).collect())
                .collect();
            graph.nodes.push(Node { vector_id: node.vector_id, level: node.level, neighbors });
            graph.vectors.push(self.vectors[idx as usize].clone());
        }
        graph.entry_point = self.entry_point.and_then(|ep| remap[ep as usize]);
        graph.max_layer = if graph.entry_point.is_some() { self.max_layer } else { 0 };
        graph.rebuild_inbound();
        (graph, remap)
    }
}
