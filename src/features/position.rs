//! Per-cell features, the building block of the action neighbourhoods.

use std::sync::LazyLock;

use crate::hive::{Board, EncodedStack, Player, Pos, NUM_PIECE_TYPES};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PositionId {
    /// +1 if the top piece belongs to the player to move, -1 for the
    /// opponent, 0 for an empty cell.
    Owner,
    PieceOneHot,
    Removable,

    /// Owners of the pieces between the top and the bottom of the stack,
    /// top first. Only beetles can be there.
    MiddleOwners,
    BottomOwner,
    BottomPieceOneHot,
}

#[derive(Clone, Copy, Debug)]
pub struct PositionSpec {
    pub id: PositionId,
    pub dim: usize,
    pub offset: usize,
    pub version: usize,
}

// four beetles at most, one of them on top
const MIDDLE_SLOTS: usize = 3;

pub static POSITION_SPECS: LazyLock<Vec<PositionSpec>> = LazyLock::new(|| {
    use PositionId::*;

    let mut offset = 0;
    [
        (Owner, 1, 0),
        (PieceOneHot, NUM_PIECE_TYPES, 0),
        (Removable, 1, 0),
        (MiddleOwners, MIDDLE_SLOTS, 0),
        (BottomOwner, 1, 16),
        (BottomPieceOneHot, NUM_PIECE_TYPES, 16),
    ]
    .into_iter()
    .map(|(id, dim, version)| {
        let spec = PositionSpec {
            id,
            dim,
            offset,
            version,
        };
        offset += dim;
        spec
    })
    .collect()
});

/// Number of values per cell at `version`.
pub fn position_features_dim(version: usize) -> usize {
    POSITION_SPECS
        .iter()
        .filter(|spec| spec.version <= version)
        .map(|spec| spec.dim)
        .sum()
}

/// Features of the cell at `pos`, restricted to those known at `version`.
pub fn position_features(board: &Board, pos: Pos, version: usize) -> Vec<f32> {
    stack_features(board, pos, board.stack_at(pos), version)
}

fn owner_value(board: &Board, owner: Player) -> f32 {
    if owner == board.next_player() {
        1.0
    } else {
        -1.0
    }
}

/// Features for `stack` as if it sat at `pos`, which lets callers describe
/// positions after a hypothetical action.
pub(crate) fn stack_features(
    board: &Board,
    pos: Pos,
    stack: EncodedStack,
    version: usize,
) -> Vec<f32> {
    let full_dim = position_features_dim(usize::MAX);
    let mut f = vec![0.0; full_dim];
    let pieces: Vec<_> = stack.pieces().collect();

    if let (Some(&(top_owner, top)), Some(&(bottom_owner, bottom))) =
        (pieces.first(), pieces.last())
    {
        for spec in POSITION_SPECS.iter() {
            let block = &mut f[spec.offset..spec.offset + spec.dim];
            match spec.id {
                PositionId::Owner => block[0] = owner_value(board, top_owner),
                PositionId::PieceOneHot => block[top.index()] = 1.0,
                PositionId::Removable => {
                    if board.derived().removable.contains(&pos) {
                        block[0] = 1.0;
                    }
                }
                PositionId::MiddleOwners => {
                    let middle = pieces.len().saturating_sub(2);
                    let below_top = pieces[1..1 + middle].iter().take(MIDDLE_SLOTS);
                    for (slot, &(owner, _)) in below_top.enumerate() {
                        block[slot] = owner_value(board, owner);
                    }
                }
                PositionId::BottomOwner => block[0] = owner_value(board, bottom_owner),
                PositionId::BottomPieceOneHot => block[bottom.index()] = 1.0,
            }
        }
    }

    if full_dim == position_features_dim(version) {
        return f;
    }
    POSITION_SPECS
        .iter()
        .filter(|spec| spec.version <= version)
        .flat_map(|spec| f[spec.offset..spec.offset + spec.dim].iter().copied())
        .collect()
}
