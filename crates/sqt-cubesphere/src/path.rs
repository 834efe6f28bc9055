//! Quadtree node addresses: a face plus the child ordinals from its root.

use std::fmt;

use glam::DVec2;

use crate::{Direction, Face, Quadrant, topology};

/// Errors when building a path from raw ordinals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("child ordinal {ordinal} at position {position} is outside 0..4")]
    InvalidOrdinal { position: usize, ordinal: u8 },
}

/// Child ordinals from a face root down to a node. Its length is the node depth.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<Quadrant>);

impl NodePath {
    /// The empty path of a face root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from raw ordinals.
    pub fn from_ordinals(ordinals: &[u8]) -> Result<Self, PathError> {
        ordinals
            .iter()
            .enumerate()
            .map(|(position, &ordinal)| {
                Quadrant::from_ordinal(ordinal)
                    .ok_or(PathError::InvalidOrdinal { position, ordinal })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Quadrant] {
        &self.0
    }

    pub fn ordinals(&self) -> Vec<u8> {
        self.0.iter().map(|q| q.ordinal()).collect()
    }

    /// Last step of the path, `None` for a root.
    pub fn last(&self) -> Option<Quadrant> {
        self.0.last().copied()
    }

    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        let mut steps = Vec::with_capacity(self.0.len() + 1);
        steps.extend_from_slice(&self.0);
        steps.push(quadrant);
        Self(steps)
    }

    /// Path of the parent cell, `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .split_last()
            .map(|(_, rest)| Self(rest.to_vec()))
    }

    /// Centre of the cell in face-plane coordinates (`[-1, 1]²`).
    pub fn offset(&self) -> DVec2 {
        let mut offset = DVec2::ZERO;
        let mut scale = 1.0;
        for q in &self.0 {
            scale *= 0.5;
            offset += q.offset_sign() * scale;
        }
        offset
    }

    /// Half-extent of the cell in face-plane coordinates: `2^-depth`.
    pub fn scale(&self) -> f64 {
        0.5f64.powi(self.0.len() as i32)
    }
}

impl From<Vec<Quadrant>> for NodePath {
    fn from(steps: Vec<Quadrant>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", q.ordinal())?;
        }
        f.write_str("]")
    }
}

/// Full address of a quadtree cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress {
    pub face: Face,
    pub path: NodePath,
}

impl NodeAddress {
    pub fn new(face: Face, path: NodePath) -> Self {
        Self { face, path }
    }

    pub fn root(face: Face) -> Self {
        Self::new(face, NodePath::root())
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.path.depth()
    }

    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        Self::new(self.face, self.path.child(quadrant))
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.path.parent().map(|path| Self::new(self.face, path))
    }

    /// Same-depth cell sharing the edge in `direction`, possibly on another face.
    #[must_use]
    pub fn neighbor(&self, direction: Direction) -> Self {
        topology::neighbor_address(self.face, &self.path, direction)
    }

    /// Neighbors in `Direction::ALL` order.
    #[must_use]
    pub fn neighbors(&self) -> [Self; 4] {
        Direction::ALL.map(|d| self.neighbor(d))
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.face, self.path)
    }
}
