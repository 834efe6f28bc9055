//! Arena-backed quadtree over the six cube faces.
//!
//! Nodes are addressed by generational [`NodeId`]s. Children are always
//! created and removed as a group of four, so a partially populated node
//! cannot be observed.

use glam::DVec2;
use sqt_cubesphere::{Direction, Face, NodeAddress, Quadrant};

use crate::{Node, NodeId};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

pub struct QuadTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: [NodeId; 6],
    max_depth: u8,
    len: usize,
}

impl QuadTree {
    /// A tree holding only the six face roots.
    pub fn new(max_depth: u8) -> Self {
        let placeholder = NodeId {
            index: 0,
            generation: 0,
        };
        let mut tree = Self {
            slots: Vec::with_capacity(64),
            free: Vec::new(),
            roots: [placeholder; 6],
            max_depth,
            len: 0,
        };
        for face in Face::ALL {
            let root = Node::new(NodeAddress::root(face), DVec2::ZERO, None);
            tree.roots[face.index()] = tree.insert(root);
        }
        tree
    }

    fn insert(&mut self, node: Node) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn take(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Returns `true` while `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn root(&self, face: Face) -> NodeId {
        self.roots[face.index()]
    }

    pub fn roots(&self) -> &[NodeId; 6] {
        &self.roots
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Never true: the face roots always exist.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split `id` into its four children, or return the existing ones.
    ///
    /// Returns `None` for a dead id or a node already at the maximum depth.
    pub fn create_children(&mut self, id: NodeId) -> Option<[NodeId; 4]> {
        let node = self.get(id)?;
        if let Some(children) = node.children {
            return Some(children);
        }
        let depth = node.depth();
        if depth >= self.max_depth {
            return None;
        }
        let address = node.address.clone();
        let offset = node.offset;
        let child_scale = 0.5f64.powi(i32::from(depth) + 1);

        let children = Quadrant::ALL.map(|quadrant| {
            let child_offset = offset + quadrant.offset_sign() * child_scale;
            self.insert(Node::new(address.child(quadrant), child_offset, Some(id)))
        });
        if let Some(node) = self.get_mut(id) {
            node.children = Some(children);
        }
        Some(children)
    }

    /// Merge `id`: detach and return all of its descendants, deepest first.
    pub fn remove_children(&mut self, id: NodeId) -> Vec<(NodeId, Node)> {
        let Some(children) = self.get_mut(id).and_then(|node| node.children.take()) else {
            return Vec::new();
        };

        let mut stack = children.to_vec();
        let mut order = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(grandchildren) = self.get(current).and_then(|node| node.children) {
                stack.extend(grandchildren);
            }
            order.push(current);
        }

        order
            .into_iter()
            .rev()
            .filter_map(|current| self.take(current).map(|node| (current, node)))
            .collect()
    }

    pub fn child(&self, id: NodeId, quadrant: Quadrant) -> Option<NodeId> {
        self.get(id)?.children.map(|children| children[quadrant.index()])
    }

    pub fn ensure_child(&mut self, id: NodeId, quadrant: Quadrant) -> Option<NodeId> {
        self.create_children(id)
            .map(|children| children[quadrant.index()])
    }

    /// Look up an existing node by address.
    pub fn find(&self, address: &NodeAddress) -> Option<NodeId> {
        let mut current = self.root(address.face);
        for &quadrant in address.path.as_slice() {
            current = self.child(current, quadrant)?;
        }
        Some(current)
    }

    /// Look up a node by address, splitting along the way as needed.
    pub fn ensure(&mut self, address: &NodeAddress) -> Option<NodeId> {
        let mut current = self.root(address.face);
        for &quadrant in address.path.as_slice() {
            current = self.ensure_child(current, quadrant)?;
        }
        Some(current)
    }

    /// Existing same-depth neighbor of `id` in `direction`.
    pub fn neighbor(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let address = self.get(id)?.neighbor_address(direction);
        self.find(address)
    }

    /// Same-depth neighbor of `id` in `direction`, created if missing.
    pub fn ensure_neighbor(&mut self, id: NodeId, direction: Direction) -> Option<NodeId> {
        let address = self.get(id)?.neighbor_address(direction).clone();
        self.ensure(&address)
    }

    /// Returns `true` if `id` has children and every one of them is ready.
    pub fn children_ready(&self, id: NodeId) -> bool {
        self.get(id)
            .and_then(|node| node.children)
            .is_some_and(|children| {
                children
                    .iter()
                    .all(|&child| self.get(child).is_some_and(Node::is_ready))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.iter().filter(|(_, node)| node.is_leaf())
    }

    /// Node count per depth, index = depth.
    pub fn depth_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; usize::from(self.max_depth) + 1];
        for (_, node) in self.iter() {
            if let Some(count) = histogram.get_mut(usize::from(node.depth())) {
                *count += 1;
            }
        }
        histogram
    }
}

impl std::fmt::Debug for QuadTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadTree")
            .field("len", &self.len)
            .field("max_depth", &self.max_depth)
            .field("histogram", &self.depth_histogram())
            .finish()
    }
}
