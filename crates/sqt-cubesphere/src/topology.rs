//! Neighbor lookup tables for quadtree cells on the cube-sphere.
//!
//! Neighbors are resolved purely from the address: walk up the path until the
//! step in the requested direction stays inside a common ancestor, then mirror
//! the trailing ordinals. When no such ancestor exists the neighbor lives on
//! another face and every ordinal is rotated into that face's local frame.

use crate::{Direction, Face, NodeAddress, NodePath, Quadrant};

/// `[ordinal][direction]`: whether the neighbor in that direction shares the parent.
pub const NEIGHBOR_SAME_PARENT: [[bool; 4]; 4] = [
    [false, true, false, true],
    [true, false, false, true],
    [false, true, true, false],
    [true, false, true, false],
];

/// `[ordinal][direction]`: ordinal of the mirrored cell one step in that direction.
pub const NEIGHBOR_ORDINAL: [[u8; 4]; 4] = [
    [1, 1, 2, 2],
    [0, 0, 3, 3],
    [3, 3, 0, 0],
    [2, 2, 1, 1],
];

/// `[face][direction]`: index of the face across that edge of the face root.
pub const ROOT_ORDINAL_ROTATION: [[u8; 4]; 6] = [
    [2, 3, 4, 5],
    [3, 2, 4, 5],
    [4, 5, 0, 1],
    [5, 4, 0, 1],
    [1, 0, 3, 2],
    [0, 1, 3, 2],
];

const ID: [u8; 4] = [0, 1, 2, 3];
const SWAP_12: [u8; 4] = [0, 2, 1, 3];
const SWAP_03: [u8; 4] = [3, 1, 2, 0];

/// `[from face][to face][ordinal]`: ordinal remap when a path crosses a seam.
///
/// Entries for a face and its opposite are never used by neighbor lookup.
pub const NEIGHBOR_ORDINAL_ROTATION: [[[u8; 4]; 6]; 6] = [
    [ID, ID, SWAP_12, SWAP_03, SWAP_03, SWAP_03],
    [ID, ID, SWAP_12, SWAP_03, SWAP_12, SWAP_12],
    [SWAP_12, SWAP_12, ID, ID, SWAP_03, SWAP_12],
    [SWAP_03, SWAP_03, ID, ID, SWAP_03, SWAP_12],
    [SWAP_03, SWAP_12, SWAP_03, SWAP_03, ID, ID],
    [SWAP_03, SWAP_12, SWAP_12, SWAP_12, ID, ID],
];

/// Face across the edge of `face` in `direction`.
#[must_use]
pub fn seam_face(face: Face, direction: Direction) -> Face {
    Face::from_index(ROOT_ORDINAL_ROTATION[face.index()][direction.index()] as usize)
}

/// Same-depth cell adjacent to `(face, path)` across the edge in `direction`.
#[must_use]
pub fn neighbor_address(face: Face, path: &NodePath, direction: Direction) -> NodeAddress {
    let steps = path.as_slice();
    let dir = direction.index();

    let mut common_ancestor_distance = 1;
    for q in steps.iter().rev() {
        if NEIGHBOR_SAME_PARENT[q.index()][dir] {
            break;
        }
        common_ancestor_distance += 1;
    }

    if common_ancestor_distance <= steps.len() {
        let split = steps.len() - common_ancestor_distance;
        let remapped = steps
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                if i >= split {
                    remap(q, NEIGHBOR_ORDINAL[q.index()][dir])
                } else {
                    q
                }
            })
            .collect::<Vec<_>>();
        NodeAddress::new(face, NodePath::from(remapped))
    } else {
        let to = seam_face(face, direction);
        let rotation = &NEIGHBOR_ORDINAL_ROTATION[face.index()][to.index()];
        let remapped = steps
            .iter()
            .map(|&q| remap(q, rotation[q.index()]))
            .collect::<Vec<_>>();
        NodeAddress::new(to, NodePath::from(remapped))
    }
}

// Table entries are all in 0..4.
fn remap(original: Quadrant, ordinal: u8) -> Quadrant {
    Quadrant::from_ordinal(ordinal).unwrap_or(original)
}

impl Direction {
    /// Direction that leads back across the edge just crossed from `from` to `to`.
    ///
    /// Within a face this is the opposite direction. Across a seam the two
    /// faces' local axes are rotated relative to each other, so the way back is
    /// whichever edge of `to` borders `from`.
    #[must_use]
    pub fn returning_from(self, from: Face, to: Face) -> Direction {
        if from == to {
            return self.opposite();
        }
        Direction::ALL
            .into_iter()
            .find(|&d| seam_face(to, d) == from)
            .unwrap_or(self.opposite())
    }
}
