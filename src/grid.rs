use std::fmt::Display;
use std::ops::{Add, AddAssign, Sub};

/// A point on the canvas grid, in whole grid units (not pixels).
#[derive(
    serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

pub const fn pos(x: i32, y: i32) -> GridPos {
    GridPos { x, y }
}

impl Display for GridPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An offset between grid points, e.g. a port's offset from its component origin.
#[derive(
    serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd,
)]
pub struct GridVec {
    pub x: i32,
    pub y: i32,
}

pub const fn vec2(x: i32, y: i32) -> GridVec {
    GridVec { x, y }
}

impl Add<GridVec> for GridPos {
    type Output = Self;

    fn add(self, rhs: GridVec) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign<GridVec> for GridPos {
    fn add_assign(&mut self, rhs: GridVec) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for GridPos {
    type Output = GridVec;

    fn sub(self, rhs: Self) -> GridVec {
        GridVec {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_offset_to_position() {
        assert_eq!(pos(3, 1) + vec2(0, 2), pos(3, 3));
        assert_eq!(pos(3, 1) + vec2(3, 1), pos(6, 2));
    }

    #[test]
    fn difference_is_an_offset() {
        assert_eq!(pos(6, 2) - pos(3, 1), vec2(3, 1));
    }
}
