use std::collections::HashMap;

use log::debug;

use crate::core::{
    aabb::Aabb,
    types::{BodyId, BroadPhaseLayer},
};

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { proxy: usize },
    Internal { left: usize, right: usize },
}

/// Bounding volume hierarchy node.
#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: Aabb,
    parent: Option<usize>,
    kind: NodeKind,
}

#[derive(Debug, Clone, Copy)]
struct Proxy {
    body: BodyId,
    fat_bounds: Aabb,
    leaf: Option<usize>,
    alive: bool,
}

/// One tree per broad-phase layer.
///
/// Bodies inserted since the last rebuild live in an unsorted list that queries
/// scan linearly; removals leave tombstones in the tree until the next rebuild.
#[derive(Debug, Default)]
struct LayerTree {
    proxies: Vec<Proxy>,
    free_proxies: Vec<usize>,
    nodes: Vec<BvhNode>,
    root: Option<usize>,
    unsorted: Vec<usize>,
    tombstones: usize,
}

impl LayerTree {
    fn insert(&mut self, body: BodyId, fat_bounds: Aabb) -> usize {
        let proxy = Proxy {
            body,
            fat_bounds,
            leaf: None,
            alive: true,
        };
        let index = match self.free_proxies.pop() {
            Some(index) => {
                self.proxies[index] = proxy;
                index
            }
            None => {
                self.proxies.push(proxy);
                self.proxies.len() - 1
            }
        };
        self.unsorted.push(index);
        index
    }

    fn remove(&mut self, proxy_index: usize) {
        let proxy = &mut self.proxies[proxy_index];
        proxy.alive = false;
        match proxy.leaf {
            // The leaf still points at this slot; keep it reserved until a rebuild.
            Some(_) => self.tombstones += 1,
            None => {
                self.unsorted.retain(|&p| p != proxy_index);
                self.free_proxies.push(proxy_index);
            }
        }
    }

    fn update(&mut self, proxy_index: usize, fat_bounds: Aabb) {
        self.proxies[proxy_index].fat_bounds = fat_bounds;
        let Some(leaf) = self.proxies[proxy_index].leaf else {
            return;
        };
        self.nodes[leaf].bounds = fat_bounds;
        let mut current = self.nodes[leaf].parent;
        while let Some(index) = current {
            if let NodeKind::Internal { left, right } = self.nodes[index].kind {
                self.nodes[index].bounds = self.nodes[left].bounds.union(&self.nodes[right].bounds);
            }
            current = self.nodes[index].parent;
        }
    }

    fn leaf_count(&self) -> usize {
        self.proxies.iter().filter(|p| p.leaf.is_some()).count()
    }

    /// Rebuilds the tree from live proxies, compacting the proxy array.
    ///
    /// Returns the new proxy index for every surviving body.
    fn rebuild(&mut self) -> Vec<(BodyId, usize)> {
        let mut live: Vec<Proxy> = self
            .proxies
            .iter()
            .filter(|p| p.alive)
            .map(|p| Proxy { leaf: None, ..*p })
            .collect();
        live.sort_by_key(|p| p.body);

        self.proxies = live;
        self.free_proxies.clear();
        self.unsorted.clear();
        self.nodes.clear();
        self.tombstones = 0;
        self.root = None;

        if !self.proxies.is_empty() {
            let mut items: Vec<usize> = (0..self.proxies.len()).collect();
            self.root = Some(self.build(&mut items, None));
        }

        self.proxies
            .iter()
            .enumerate()
            .map(|(index, proxy)| (proxy.body, index))
            .collect()
    }

    fn build(&mut self, items: &mut [usize], parent: Option<usize>) -> usize {
        let node_index = self.nodes.len();
        self.nodes.push(BvhNode {
            bounds: Aabb::empty(),
            parent,
            kind: NodeKind::Leaf { proxy: usize::MAX },
        });

        if items.len() == 1 {
            let proxy = items[0];
            self.nodes[node_index].bounds = self.proxies[proxy].fat_bounds;
            self.nodes[node_index].kind = NodeKind::Leaf { proxy };
            self.proxies[proxy].leaf = Some(node_index);
            return node_index;
        }

        let mut centroid_bounds = Aabb::empty();
        for &proxy in items.iter() {
            centroid_bounds.extend(self.proxies[proxy].fat_bounds.center());
        }
        let spread = centroid_bounds.max - centroid_bounds.min;
        let axis = if spread.x >= spread.y && spread.x >= spread.z {
            0
        } else if spread.y >= spread.z {
            1
        } else {
            2
        };

        let proxies = &self.proxies;
        items.sort_by(|&a, &b| {
            let ca = proxies[a].fat_bounds.center()[axis];
            let cb = proxies[b].fat_bounds.center()[axis];
            ca.total_cmp(&cb).then(proxies[a].body.cmp(&proxies[b].body))
        });

        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build(left_items, Some(node_index));
        let right = self.build(right_items, Some(node_index));
        self.nodes[node_index].bounds = self.nodes[left].bounds.union(&self.nodes[right].bounds);
        self.nodes[node_index].kind = NodeKind::Internal { left, right };
        node_index
    }

    fn query(&self, bounds: &Aabb, out: &mut Vec<BodyId>) {
        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(index) = stack.pop() {
                let node = &self.nodes[index];
                if !node.bounds.overlaps(bounds) {
                    continue;
                }
                match node.kind {
                    NodeKind::Leaf { proxy } => {
                        let proxy = &self.proxies[proxy];
                        if proxy.alive && proxy.fat_bounds.overlaps(bounds) {
                            out.push(proxy.body);
                        }
                    }
                    NodeKind::Internal { left, right } => {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }

        for &index in &self.unsorted {
            let proxy = &self.proxies[index];
            if proxy.alive && proxy.fat_bounds.overlaps(bounds) {
                out.push(proxy.body);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProxyLocation {
    layer: BroadPhaseLayer,
    proxy: usize,
}

/// Spatial index over the bounds of every body added to the simulation.
///
/// Incremental inserts, removals and moves never require a rebuild;
/// [`BroadPhase::optimize`] only restores query performance after bulk edits.
#[derive(Debug)]
pub struct BroadPhase {
    layers: Vec<LayerTree>,
    locations: HashMap<BodyId, ProxyLocation>,
    margin: f32,
}

impl BroadPhase {
    pub fn new(num_broad_phase_layers: u32, margin: f32) -> Self {
        Self {
            layers: (0..num_broad_phase_layers.max(1))
                .map(|_| LayerTree::default())
                .collect(),
            locations: HashMap::new(),
            margin: margin.max(0.0),
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.locations.contains_key(&body)
    }

    pub fn layer_of(&self, body: BodyId) -> Option<BroadPhaseLayer> {
        self.locations.get(&body).map(|location| location.layer)
    }

    pub fn insert(&mut self, body: BodyId, layer: BroadPhaseLayer, bounds: Aabb) {
        if self.locations.contains_key(&body) {
            self.remove(body);
        }
        let fat_bounds = bounds.expanded(self.margin);
        let Some(tree) = self.layers.get_mut(layer.0 as usize) else {
            return;
        };
        let proxy = tree.insert(body, fat_bounds);
        self.locations.insert(body, ProxyLocation { layer, proxy });
    }

    pub fn remove(&mut self, body: BodyId) -> bool {
        let Some(location) = self.locations.remove(&body) else {
            return false;
        };
        let tree = &mut self.layers[location.layer.0 as usize];
        tree.remove(location.proxy);

        if tree.tombstones > 64 && tree.tombstones * 2 > tree.leaf_count() {
            self.rebuild_layer(location.layer.0 as usize);
        }
        true
    }

    /// Refreshes a body's bounds; a no-op while they stay inside the padded box.
    pub fn update(&mut self, body: BodyId, bounds: Aabb) {
        let Some(location) = self.locations.get(&body).copied() else {
            return;
        };
        let tree = &mut self.layers[location.layer.0 as usize];
        if tree.proxies[location.proxy].fat_bounds.contains(&bounds) {
            return;
        }
        tree.update(location.proxy, bounds.expanded(self.margin));
    }

    /// Rebuilds every layer tree from scratch.
    pub fn optimize(&mut self) {
        for layer in 0..self.layers.len() {
            self.rebuild_layer(layer);
        }
        debug!("broad-phase optimized: {} proxies", self.locations.len());
    }

    fn rebuild_layer(&mut self, layer: usize) {
        let remapped = self.layers[layer].rebuild();
        for (body, proxy) in remapped {
            if let Some(location) = self.locations.get_mut(&body) {
                location.proxy = proxy;
            }
        }
    }

    /// Returns the sorted ids of bodies whose bounds overlap `bounds`, looking
    /// only in broad-phase layers accepted by `accept_layer`.
    pub fn query_overlaps<F>(&self, bounds: &Aabb, mut accept_layer: F) -> Vec<BodyId>
    where
        F: FnMut(BroadPhaseLayer) -> bool,
    {
        let mut found = Vec::new();
        for (index, tree) in self.layers.iter().enumerate() {
            if accept_layer(BroadPhaseLayer(index as u8)) {
                tree.query(bounds, &mut found);
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}
