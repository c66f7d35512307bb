use std::fmt;

use serde::{Deserialize, Serialize};

use super::{PieceType, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Placement {
        piece: PieceType,
        target: Pos,
    },
    Move {
        piece: PieceType,
        source: Pos,
        target: Pos,
    },
    Skip,
}

impl Action {
    pub fn piece(&self) -> Option<PieceType> {
        match *self {
            Action::Placement { piece, .. } => Some(piece),
            Action::Move { piece, .. } => Some(piece),
            Action::Skip => None,
        }
    }

    pub fn source(&self) -> Option<Pos> {
        match *self {
            Action::Move { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn target(&self) -> Option<Pos> {
        match *self {
            Action::Placement { target, .. } => Some(target),
            Action::Move { target, .. } => Some(target),
            Action::Skip => None,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Action::Move { .. })
    }

    pub fn is_placement(&self) -> bool {
        matches!(self, Action::Placement { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Action::Skip)
    }

    /// Value equality for actions rebuilt independently of the board that
    /// produced them, e.g. when replaying a saved match. `==` compares the
    /// exact representation instead.
    pub fn equal(&self, other: &Action) -> bool {
        if self.piece() != other.piece() {
            return false;
        }
        match (self, other) {
            (Action::Skip, Action::Skip) => true,
            (Action::Placement { target: a, .. }, Action::Placement { target: b, .. }) => a == b,
            (
                Action::Move {
                    source: sa,
                    target: ta,
                    ..
                },
                Action::Move {
                    source: sb,
                    target: tb,
                    ..
                },
            ) => sa == sb && ta == tb,
            _ => false,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Skip => write!(f, "Pass (no action)"),
            Action::Move {
                piece,
                source,
                target,
            } => write!(f, "Move {}: {}->{}", piece, source, target),
            Action::Placement { piece, target } => write!(f, "Place {} in {}", piece, target),
        }
    }
}
