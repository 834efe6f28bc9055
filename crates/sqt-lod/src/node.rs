//! Quadtree nodes and their arena handles.

use glam::DVec2;
use sqt_cubesphere::{Direction, Face, NodeAddress};
use sqt_mesh::{GridBuffers, MeshKey};
use sqt_terrain::CancelToken;

/// Generational handle into a [`QuadTree`](crate::QuadTree).
///
/// A handle to a destroyed node never resolves again, even after its slot is
/// reused, so late build results for it are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Key under which the node's mesh is known to builders and sinks.
    pub fn key(self) -> MeshKey {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_key(key: MeshKey) -> Self {
        Self {
            index: key as u32,
            generation: (key >> 32) as u32,
        }
    }
}

/// Mesh build progress of a node.
#[derive(Debug, Clone, Default)]
pub enum BuildState {
    /// No build requested, or the last one failed.
    #[default]
    Idle,
    /// A build is queued or running.
    Pending(CancelToken),
    /// A mesh has been committed.
    Ready,
}

#[derive(Debug)]
pub struct Node {
    pub address: NodeAddress,
    /// Cell centre in face-plane coordinates.
    pub offset: DVec2,
    pub parent: Option<NodeId>,
    /// Either all four children or none.
    pub children: Option<[NodeId; 4]>,
    /// Same-depth edge neighbors in `Direction::ALL` order.
    pub neighbors: [NodeAddress; 4],
    pub build: BuildState,
    /// Committed geometry.
    pub mesh: Option<GridBuffers>,
    /// Triangulation mask last handed to the sink.
    pub triangle_mask: Option<u8>,
    pub visible: bool,
}

impl Node {
    pub(crate) fn new(address: NodeAddress, offset: DVec2, parent: Option<NodeId>) -> Self {
        let neighbors = address.neighbors();
        Self {
            address,
            offset,
            parent,
            children: None,
            neighbors,
            build: BuildState::Idle,
            mesh: None,
            triangle_mask: None,
            visible: false,
        }
    }

    pub fn face(&self) -> Face {
        self.address.face
    }

    pub fn depth(&self) -> u8 {
        self.address.depth() as u8
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.build, BuildState::Ready)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.build, BuildState::Pending(_))
    }

    pub fn neighbor_address(&self, direction: Direction) -> &NodeAddress {
        &self.neighbors[direction.index()]
    }
}
