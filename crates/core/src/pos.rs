//! Block coordinates and the six axis-aligned faces.

use serde::{Deserialize, Serialize};

/// One of the six axis-aligned directions a block can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Face {
    /// Negative Y.
    Down,
    /// Positive Y.
    Up,
    /// Negative Z.
    North,
    /// Positive Z.
    South,
    /// Negative X.
    West,
    /// Positive X.
    East,
}

impl Face {
    /// All faces in index order.
    pub const ALL: [Face; 6] = [
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
        Face::West,
        Face::East,
    ];

    /// The face pointing the other way.
    pub fn opposite(self) -> Self {
        match self {
            Face::Down => Face::Up,
            Face::Up => Face::Down,
            Face::North => Face::South,
            Face::South => Face::North,
            Face::West => Face::East,
            Face::East => Face::West,
        }
    }

    /// Unit offset `(dx, dy, dz)` for this face.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Face::Down => (0, -1, 0),
            Face::Up => (0, 1, 0),
            Face::North => (0, 0, -1),
            Face::South => (0, 0, 1),
            Face::West => (-1, 0, 0),
            Face::East => (1, 0, 0),
        }
    }

    /// Numeric index (0..6) used in encoded block properties.
    pub fn index(self) -> u8 {
        match self {
            Face::Down => 0,
            Face::Up => 1,
            Face::North => 2,
            Face::South => 3,
            Face::West => 4,
            Face::East => 5,
        }
    }

    /// Inverse of [`Face::index`].
    pub fn from_index(index: u8) -> Option<Self> {
        Face::ALL.get(index as usize).copied()
    }

    /// True for `Up` and `Down`.
    pub fn is_vertical(self) -> bool {
        matches!(self, Face::Up | Face::Down)
    }
}

/// Integer block position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position across `face`.
    pub fn side(self, face: Face) -> Self {
        let (dx, dy, dz) = face.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// All six neighbours in [`Face::ALL`] order.
    pub fn neighbors(self) -> [BlockPos; 6] {
        Face::ALL.map(|face| self.side(face))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_involution() {
        for face in Face::ALL {
            assert_eq!(face.opposite().opposite(), face);
            assert_ne!(face.opposite(), face);
        }
    }

    #[test]
    fn side_then_opposite_returns_home() {
        let pos = BlockPos::new(3, 64, -7);
        for face in Face::ALL {
            assert_eq!(pos.side(face).side(face.opposite()), pos);
        }
        assert_eq!(pos.side(Face::Up), BlockPos::new(3, 65, -7));
        assert_eq!(pos.side(Face::West), BlockPos::new(2, 64, -7));
    }

    #[test]
    fn face_index_roundtrip() {
        for face in Face::ALL {
            assert_eq!(Face::from_index(face.index()), Some(face));
        }
        assert_eq!(Face::from_index(6), None);
    }
}
