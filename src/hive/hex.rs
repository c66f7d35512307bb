use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Axial hex coordinate.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos(pub i8, pub i8);

impl Add for Pos {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Pos(self.0 + other.0, self.1 + other.1)
    }
}

impl Sub for Pos {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Pos(self.0 - other.0, self.1 - other.1)
    }
}

impl Mul<i8> for Pos {
    type Output = Self;

    fn mul(self, other: i8) -> Self {
        Pos(self.0 * other, self.1 * other)
    }
}

// rows first: every sorted position list in the engine is ordered by (y, x)
impl Ord for Pos {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.1, self.0).cmp(&(other.1, other.0))
    }
}

impl PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Neighbour directions, clockwise starting from "up".
pub const HEXDIR: [Pos; 6] = [
    Pos(0, -1),
    Pos(1, -1),
    Pos(1, 0),
    Pos(0, 1),
    Pos(-1, 1),
    Pos(-1, 0),
];

impl Pos {
    pub fn origin() -> Self {
        Pos(0, 0)
    }

    pub fn x(&self) -> i8 {
        self.0
    }

    pub fn y(&self) -> i8 {
        self.1
    }

    pub fn neighbours(&self) -> impl Iterator<Item = Self> {
        let origin = *self;
        HEXDIR.iter().map(move |&d| d + origin)
    }

    pub fn neighbour_array(&self) -> [Self; 6] {
        HEXDIR.map(|d| d + *self)
    }

    pub fn is_neighbour(&self, other: &Self) -> bool {
        HEXDIR.contains(&(*other - *self))
    }

    pub fn distance(&self, other: &Self) -> i32 {
        let v = *self - *other;
        (v.0 as i32).abs() + (v.1 as i32).abs()
    }

    // display coordinates shear odd columns down, so the grid prints as
    // offset rows
    pub fn to_display(&self) -> Self {
        Pos(self.0, self.1 + (self.0 >> 1))
    }

    pub fn from_display(&self) -> Self {
        Pos(self.0, self.1 - (self.0 >> 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pos() {
        let from = [
            Pos(0, 0),
            Pos(1, 0),
            Pos(-1, 0),
            Pos(2, 0),
            Pos(0, 5),
            Pos(1, -5),
            Pos(-1, 7),
            Pos(3, -7),
        ];
        let want = [
            Pos(0, 0),
            Pos(1, 0),
            Pos(-1, -1),
            Pos(2, 1),
            Pos(0, 5),
            Pos(1, -5),
            Pos(-1, 6),
            Pos(3, -6),
        ];
        for (p, w) in from.iter().zip(want.iter()) {
            assert_eq!(p.to_display(), *w, "to_display({})", p);
            assert_eq!(w.from_display(), *p, "from_display({})", w);
        }
    }

    #[test]
    fn test_neighbours_are_mutual() {
        let p = Pos(2, -3);
        for n in p.neighbours() {
            assert!(n.is_neighbour(&p));
            assert!(n.neighbours().any(|x| x == p));
        }
        assert!(!p.is_neighbour(&p));
        assert!(!p.is_neighbour(&(p + Pos(1, 1))));
    }

    #[test]
    fn test_ordering() {
        let mut positions = vec![Pos(1, 1), Pos(3, -1), Pos(-2, 1), Pos(0, 0)];
        positions.sort_unstable();
        assert_eq!(positions, vec![Pos(3, -1), Pos(0, 0), Pos(-2, 1), Pos(1, 1)]);
    }

    #[test]
    fn test_distance() {
        assert_eq!(Pos(0, 0).distance(&Pos(2, -1)), 3);
        assert_eq!(Pos(-1, 2).distance(&Pos(-1, 2)), 0);
    }
}
