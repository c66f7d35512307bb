//! Features for a single action: the cells around where a piece leaves and
//! where it lands.
//!
//! Each neighbourhood is the center cell plus the 18 cells within distance
//! two, grouped into six sections of three, one per direction. Rotating the
//! board by 60 degrees rotates the sections, so a model can pool over them.

use crate::hive::{Action, Board, Pos, HEXDIR};

use super::position::{position_features_dim, stack_features};

pub const POSITIONS_PER_SECTION: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct Neighbourhood {
    pub center: Vec<f32>,
    pub sections: [Vec<f32>; 6],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionFeatures {
    /// 1 for a move, 0 for a placement or a skip.
    pub is_move: f32,
    pub source: Neighbourhood,
    pub target: Neighbourhood,
}

/// Cells of section `i` around `center`: one step in direction `i`, two
/// steps, and the cell between those and the next direction clockwise.
pub fn section_positions(center: Pos, section: usize) -> [Pos; POSITIONS_PER_SECTION] {
    let dir = HEXDIR[section];
    let next = HEXDIR[(section + 1) % 6];
    [center + dir, center + dir * 2, center + dir + next]
}

impl Neighbourhood {
    fn zeros(dim: usize) -> Self {
        Neighbourhood {
            center: vec![0.0; dim],
            sections: std::array::from_fn(|_| vec![0.0; POSITIONS_PER_SECTION * dim]),
        }
    }

    fn around(board: &Board, action: &Action, center: Pos, apply: bool, version: usize) -> Self {
        let cell = |pos: Pos| action_cell_features(board, action, pos, apply, version);
        Neighbourhood {
            center: cell(center),
            sections: std::array::from_fn(|section| {
                section_positions(center, section)
                    .into_iter()
                    .flat_map(cell)
                    .collect()
            }),
        }
    }

    /// Features of one cell: `None` for the center, otherwise the section and
    /// the index within it.
    pub fn cell(&self, at: Option<(usize, usize)>) -> &[f32] {
        match at {
            None => &self.center,
            Some((section, idx)) => {
                let dim = self.center.len();
                &self.sections[section][idx * dim..(idx + 1) * dim]
            }
        }
    }
}

/// Position features around the source and the target of `action`, taken by
/// the player to move. The target side shows the board with the action
/// applied.
pub fn action_features_for(board: &Board, action: &Action, policy_version: usize) -> ActionFeatures {
    let dim = position_features_dim(policy_version);
    let source = match action.source() {
        Some(source) => Neighbourhood::around(board, action, source, false, policy_version),
        None => Neighbourhood::zeros(dim),
    };
    let target = match action.target() {
        Some(target) => Neighbourhood::around(board, action, target, true, policy_version),
        None => Neighbourhood::zeros(dim),
    };
    ActionFeatures {
        is_move: if action.is_move() { 1.0 } else { 0.0 },
        source,
        target,
    }
}

fn action_cell_features(
    board: &Board,
    action: &Action,
    pos: Pos,
    apply: bool,
    version: usize,
) -> Vec<f32> {
    let mut stack = board.stack_at(pos);
    if apply {
        if action.source() == Some(pos) {
            if let Some((rest, _, _)) = stack.pop_piece() {
                stack = rest;
            }
        } else if action.target() == Some(pos) {
            if let Some(piece) = action.piece() {
                stack = stack.stack_piece(board.next_player(), piece);
            }
        }
    }
    stack_features(board, pos, stack, version)
}
