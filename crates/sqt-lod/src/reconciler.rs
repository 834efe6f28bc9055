//! Mark-and-sweep refinement of the quadtree around a viewpoint.
//!
//! A pass marks the nodes that must exist (roots, the deep-split leaf under
//! the viewpoint, its eight surrounding cells and whatever keeps the tree
//! 2:1 balanced), merges everything else away, requests meshes for new nodes
//! and finally picks the set of ready meshes to show.

use rustc_hash::FxHashSet;
use sqt_cubesphere::{Direction, Quadrant};
use sqt_mesh::MeshSink;
use sqt_terrain::{BuildError, BuildRequest, MeshBuilder};
use tracing::{debug, trace, warn};

use crate::{BuildState, Context, Node, NodeId, QuadTree, ReconciliationData};

/// Counters from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Nodes kept by the pass.
    pub marked: usize,
    /// Nodes merged away.
    pub removed: usize,
    /// Mesh builds submitted.
    pub requested: usize,
    /// Depth of the deep-split leaf, if a split was performed.
    pub leaf_depth: Option<u8>,
}

pub struct Reconciler<'a> {
    ctx: &'a Context,
    tree: &'a mut QuadTree,
    builder: &'a dyn MeshBuilder,
    sink: &'a mut dyn MeshSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        ctx: &'a Context,
        tree: &'a mut QuadTree,
        builder: &'a dyn MeshBuilder,
        sink: &'a mut dyn MeshSink,
    ) -> Self {
        Self {
            ctx,
            tree,
            builder,
            sink,
        }
    }

    /// Collapse the tree to its six roots and request their meshes.
    pub fn initialize(&mut self) -> ReconcileStats {
        let mut marked = self.mark_roots();
        self.mark_and_sweep(&mut marked)
    }

    /// Refine the tree for `data`.
    pub fn reconcile(&mut self, data: &ReconciliationData) -> ReconcileStats {
        let mut marked = self.mark_roots();

        let leaf = self.deep_split(data);
        marked.insert(leaf);
        self.mark_eight_neighbors(&mut marked, leaf);
        self.mark_balanced(&mut marked);

        let mut stats = self.mark_and_sweep(&mut marked);
        stats.leaf_depth = self.tree.get(leaf).map(Node::depth);
        debug!(
            "Reconciled {} at {}: {} nodes, {} removed, {} builds requested",
            self.tree
                .get(leaf)
                .map_or_else(String::new, |node| node.address.to_string()),
            data.point_in_plane,
            stats.marked,
            stats.removed,
            stats.requested
        );
        stats
    }

    /// Commit finished builds to their nodes and the sink.
    ///
    /// Results for removed nodes or superseded builds are dropped. A failed
    /// build leaves its node idle so the next pass requests it again.
    pub fn commit_finished_builds(&mut self) -> usize {
        let mut committed = 0;
        for result in self.builder.drain_results() {
            let id = NodeId::from_key(result.key);
            let Some(node) = self.tree.get_mut(id) else {
                trace!("Dropping mesh {} for a removed node", result.key);
                continue;
            };
            let BuildState::Pending(token) = &node.build else {
                continue;
            };
            if token.is_cancelled() {
                continue;
            }

            match result.outcome {
                Ok(buffers) => {
                    self.sink.assign(result.key, &buffers);
                    node.mesh = Some(buffers);
                    node.build = BuildState::Ready;
                    node.triangle_mask = None;
                    committed += 1;
                    trace!(
                        "Committed mesh for {} in {}us",
                        node.address, result.build_time_us
                    );
                }
                Err(err) => {
                    warn!("Mesh build for {} failed: {err}", node.address);
                    node.build = BuildState::Idle;
                }
            }
        }
        committed
    }

    /// Recompute which ready meshes are shown and their triangulations.
    pub fn refresh_visibility(&mut self) {
        for root in *self.tree.roots() {
            self.determine_visible(root);
        }
    }

    /// Merge every face back to its root and drop the roots' meshes.
    pub fn destroy_all(&mut self) {
        for root in *self.tree.roots() {
            for (id, node) in self.tree.remove_children(root) {
                self.destroy(id, &node);
            }
            let Some(node) = self.tree.get_mut(root) else {
                continue;
            };
            let build = std::mem::take(&mut node.build);
            node.mesh = None;
            node.triangle_mask = None;
            node.visible = false;
            if let BuildState::Pending(token) = &build {
                token.cancel();
                self.builder.cancel(root.key());
            }
            if matches!(build, BuildState::Ready) {
                self.sink.release(root.key());
            }
        }
    }

    fn mark_roots(&self) -> FxHashSet<NodeId> {
        self.tree.roots().iter().copied().collect()
    }

    fn mark_and_sweep(&mut self, marked: &mut FxHashSet<NodeId>) -> ReconcileStats {
        for root in *self.tree.roots() {
            self.mark_required(marked, root);
        }

        let mut removed = 0;
        for root in *self.tree.roots() {
            removed += self.sweep(marked, root);
        }

        let mut requested = 0;
        for root in *self.tree.roots() {
            requested += self.make_mesh_requests(root);
        }

        self.refresh_visibility();

        ReconcileStats {
            marked: self.tree.len(),
            removed,
            requested,
            leaf_depth: None,
        }
    }

    /// Descend from the face root towards the viewpoint while cells are
    /// coarser than the desired length.
    fn deep_split(&mut self, data: &ReconciliationData) -> NodeId {
        let max_depth = self.ctx.max_depth();
        let mut current = self.tree.root(data.face);
        while let Some(node) = self.tree.get(current) {
            let depth = self.ctx.depth(node.depth());
            if node.depth() >= max_depth || depth.approximate_size <= data.desired_length {
                break;
            }
            let quadrant = Quadrant::containing((data.point_in_plane - node.offset) / depth.scale);
            match self.tree.ensure_child(current, quadrant) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    fn mark_eight_neighbors(&mut self, marked: &mut FxHashSet<NodeId>, leaf: NodeId) {
        let [west, east, south, north] =
            Direction::ALL.map(|direction| self.tree.ensure_neighbor(leaf, direction));
        let diagonals = [
            (west, Direction::North),
            (east, Direction::South),
            (south, Direction::West),
            (north, Direction::East),
        ];
        for (edge, direction) in diagonals {
            let Some(edge) = edge else {
                continue;
            };
            marked.insert(edge);
            if let Some(corner) = self.tree.ensure_neighbor(edge, direction) {
                marked.insert(corner);
            }
        }
    }

    /// Every marked node below depth 1 pulls in its parent's four neighbors,
    /// transitively.
    fn mark_balanced(&mut self, marked: &mut FxHashSet<NodeId>) {
        let mut remaining: Vec<NodeId> = marked.iter().copied().collect();
        while let Some(current) = remaining.pop() {
            let Some(node) = self.tree.get(current) else {
                continue;
            };
            if node.depth() <= 1 {
                continue;
            }
            let Some(parent) = node.parent else {
                continue;
            };
            for direction in Direction::ALL {
                let Some(neighbor) = self.tree.ensure_neighbor(parent, direction) else {
                    continue;
                };
                if marked.insert(neighbor) {
                    remaining.push(neighbor);
                }
            }
        }
    }

    /// A node with a marked child is marked together with all its children.
    fn mark_required(&self, marked: &mut FxHashSet<NodeId>, id: NodeId) {
        let Some(children) = self.tree.get(id).and_then(|node| node.children) else {
            return;
        };
        for child in children {
            self.mark_required(marked, child);
        }
        if children.iter().any(|child| marked.contains(child)) {
            marked.insert(id);
            marked.extend(children);
        }
    }

    fn sweep(&mut self, marked: &FxHashSet<NodeId>, id: NodeId) -> usize {
        let Some(children) = self.tree.get(id).and_then(|node| node.children) else {
            return 0;
        };
        if children.iter().any(|child| marked.contains(child)) {
            return children.iter().map(|&child| self.sweep(marked, child)).sum();
        }

        let removed = self.tree.remove_children(id);
        for (removed_id, node) in &removed {
            self.destroy(*removed_id, node);
        }
        removed.len()
    }

    fn destroy(&mut self, id: NodeId, node: &Node) {
        match &node.build {
            BuildState::Pending(token) => {
                token.cancel();
                self.builder.cancel(id.key());
            }
            BuildState::Ready => self.sink.release(id.key()),
            BuildState::Idle => {}
        }
    }

    /// Submit builds for idle nodes, coarsest first.
    fn make_mesh_requests(&mut self, root: NodeId) -> usize {
        let resolution = self.ctx.resolution();
        let mut requested = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.tree.get_mut(id) else {
                continue;
            };
            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
            }
            if !matches!(node.build, BuildState::Idle) {
                continue;
            }

            let request = BuildRequest {
                key: id.key(),
                face: node.face(),
                offset: node.offset,
                scale: self.ctx.depth(node.depth()).scale,
                resolution,
            };
            match self.builder.submit(request) {
                Ok(token) => {
                    node.build = BuildState::Pending(token);
                    requested += 1;
                }
                Err(BuildError::QueueFull { in_flight, .. }) => {
                    trace!("Build queue full ({in_flight} in flight), deferring {}", node.address);
                }
                Err(err) => warn!("Could not request mesh for {}: {err}", node.address),
            }
        }
        requested
    }

    /// Bit `d` is set when the edge in direction `d` must be stitched to a
    /// coarser neighbor.
    fn neighbor_mask(&self, id: NodeId) -> u8 {
        Direction::ALL
            .into_iter()
            .filter(|&direction| {
                let neighbor = self
                    .tree
                    .neighbor(id, direction)
                    .and_then(|neighbor| self.tree.get(neighbor));
                match neighbor {
                    None => true,
                    Some(neighbor) => {
                        !neighbor.is_ready()
                            || neighbor
                                .parent
                                .is_some_and(|parent| !self.tree.children_ready(parent))
                    }
                }
            })
            .fold(0, |mask, direction| mask | direction.mask_bit())
    }

    fn determine_visible(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.is_ready() {
            return;
        }
        let children = node.children;
        let mask = self.neighbor_mask(id);

        match children {
            Some(children) if mask == 0 && self.tree.children_ready(id) => {
                self.set_visible(id, false);
                for child in children {
                    self.determine_visible(child);
                }
            }
            _ => {
                self.show(id, mask);
                for child in children.into_iter().flatten() {
                    self.hide_subtree(child);
                }
            }
        }
    }

    fn show(&mut self, id: NodeId, mask: u8) {
        let key = id.key();
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if node.triangle_mask != Some(mask) {
            self.sink
                .set_triangles(key, mask, self.ctx.triangulations().get(mask));
            node.triangle_mask = Some(mask);
        }
        if !node.visible {
            node.visible = true;
            self.sink.set_visible(key, true);
        }
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if node.visible != visible {
            node.visible = visible;
            self.sink.set_visible(id.key(), visible);
        }
    }

    fn hide_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.set_visible(current, false);
            if let Some(children) = self.tree.get(current).and_then(|node| node.children) {
                stack.extend(children);
            }
        }
    }
}
