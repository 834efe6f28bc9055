//! The six faces of the cube-sphere and their basis vectors.

use glam::DVec3;

/// One of the six cube faces, each the root of its own quadtree.
///
/// A face's local plane uses `forward` as its x axis and `right` as its y
/// axis; `up` is the outward normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Face {
    /// +Y face
    Up = 0,
    /// −Y face
    Down = 1,
    /// −X face
    Left = 2,
    /// +X face
    Right = 3,
    /// +Z face
    Forward = 4,
    /// −Z face
    Back = 5,
}

impl Face {
    /// All six faces in index order.
    pub const ALL: [Face; 6] = [
        Face::Up,
        Face::Down,
        Face::Left,
        Face::Right,
        Face::Forward,
        Face::Back,
    ];

    /// Index in `0..6`.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face for a table index. Indices wrap modulo 6.
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Face {
        Face::ALL[index % 6]
    }

    /// The face on the other side of the sphere.
    #[must_use]
    pub fn opposite(self) -> Face {
        match self {
            Face::Up => Face::Down,
            Face::Down => Face::Up,
            Face::Left => Face::Right,
            Face::Right => Face::Left,
            Face::Forward => Face::Back,
            Face::Back => Face::Forward,
        }
    }

    /// Outward unit normal.
    #[must_use]
    pub fn up(self) -> DVec3 {
        match self {
            Face::Up => DVec3::Y,
            Face::Down => DVec3::NEG_Y,
            Face::Left => DVec3::NEG_X,
            Face::Right => DVec3::X,
            Face::Forward => DVec3::Z,
            Face::Back => DVec3::NEG_Z,
        }
    }

    /// Local x axis: `up` with its components rotated, `(up.y, up.z, up.x)`.
    #[must_use]
    pub fn forward(self) -> DVec3 {
        let up = self.up();
        DVec3::new(up.y, up.z, up.x)
    }

    /// Local y axis: `up × forward`.
    #[must_use]
    pub fn right(self) -> DVec3 {
        self.up().cross(self.forward())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, face) in Face::ALL.iter().enumerate() {
            assert_eq!(face.index(), i);
            assert_eq!(Face::from_index(i), *face);
        }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for face in Face::ALL {
            let (u, f, r) = (face.up(), face.forward(), face.right());
            for (name, v) in [("up", u), ("forward", f), ("right", r)] {
                assert!(
                    (v.length() - 1.0).abs() < 1e-12,
                    "{name} of {face:?} is not unit length"
                );
            }
            assert!(u.dot(f).abs() < 1e-12, "{face:?}: up·forward != 0");
            assert!(u.dot(r).abs() < 1e-12, "{face:?}: up·right != 0");
            assert!(f.dot(r).abs() < 1e-12, "{face:?}: forward·right != 0");
        }
    }

    #[test]
    fn test_known_bases() {
        assert_eq!(Face::Up.forward(), DVec3::X);
        assert_eq!(Face::Up.right(), DVec3::NEG_Z);
        assert_eq!(Face::Forward.forward(), DVec3::Y);
        assert_eq!(Face::Forward.right(), DVec3::NEG_X);
        assert_eq!(Face::Left.forward(), DVec3::NEG_Z);
        assert_eq!(Face::Left.right(), DVec3::NEG_Y);
    }

    #[test]
    fn test_opposite_normals_are_antiparallel() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_eq!(face.up() + face.opposite().up(), DVec3::ZERO);
        }
    }
}
