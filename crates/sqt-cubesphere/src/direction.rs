//! Edge directions and child quadrants within a face plane.

use glam::DVec2;

/// Edge direction in a face's local plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Direction {
    /// −x (against `forward`)
    West = 0,
    /// +x (along `forward`)
    East = 1,
    /// −y (against `right`)
    South = 2,
    /// +y (along `right`)
    North = 3,
}

impl Direction {
    /// All four directions in index order.
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for a table index. Indices wrap modulo 4.
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 4]
    }

    /// The reverse direction within the same face plane.
    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    /// Bit used in triangulation masks: west=1, east=2, south=4, north=8.
    #[inline]
    #[must_use]
    pub fn mask_bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Unit step in the face plane.
    #[must_use]
    pub fn step(self) -> DVec2 {
        match self {
            Direction::West => DVec2::NEG_X,
            Direction::East => DVec2::X,
            Direction::South => DVec2::NEG_Y,
            Direction::North => DVec2::Y,
        }
    }
}

/// One of the four children of a quadtree cell. The discriminant is the
/// child ordinal stored in node paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Quadrant {
    /// (−x, −y)
    SouthWest = 0,
    /// (+x, −y)
    SouthEast = 1,
    /// (−x, +y)
    NorthWest = 2,
    /// (+x, +y)
    NorthEast = 3,
}

impl Quadrant {
    /// All four quadrants in ordinal order.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::SouthWest,
        Quadrant::SouthEast,
        Quadrant::NorthWest,
        Quadrant::NorthEast,
    ];

    #[inline]
    #[must_use]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Quadrant for an ordinal, or `None` outside `0..4`.
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Quadrant> {
        Quadrant::ALL.get(ordinal as usize).copied()
    }

    /// Sign of the child's centre relative to its parent's centre.
    #[must_use]
    pub fn offset_sign(self) -> DVec2 {
        match self {
            Quadrant::SouthWest => DVec2::new(-1.0, -1.0),
            Quadrant::SouthEast => DVec2::new(1.0, -1.0),
            Quadrant::NorthWest => DVec2::new(-1.0, 1.0),
            Quadrant::NorthEast => DVec2::new(1.0, 1.0),
        }
    }

    /// Quadrant containing a point given relative to the parent's centre.
    /// Points on an axis belong to the positive side.
    #[must_use]
    pub fn containing(relative: DVec2) -> Quadrant {
        let ordinal = u8::from(relative.x >= 0.0) + if relative.y >= 0.0 { 2 } else { 0 };
        Quadrant::ALL[ordinal as usize]
    }
}
