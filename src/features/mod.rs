//! Fixed-length numeric summaries of a board, as consumed by scoring models.
//!
//! Board features are listed in `BOARD_SPECS`. Each entry records the size
//! of the whole vector at the time it was added, so models trained on an
//! older, shorter vector can still ask for exactly what they know.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use crate::hive::{
    Action, Board, PieceType, Player, Pos, INITIAL_AVAILABILITY, NUM_PIECE_TYPES,
    TOTAL_PIECES_PER_PLAYER,
};

pub mod policy;
pub mod position;

pub use policy::{action_features_for, ActionFeatures, Neighbourhood, POSITIONS_PER_SECTION};
pub use position::{position_features, position_features_dim, PositionId, PositionSpec, POSITION_SPECS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoardId {
    /// Pieces still in hand, per piece type.
    NumOffboard,
    OpponentNumOffboard,

    /// Occupied cells around the queen, 0 while it is in hand.
    NumSurroundingQueen,
    OpponentNumSurroundingQueen,

    /// Two counts per piece type: pieces that can move, and those of them
    /// not touching the opponent's queen.
    NumCanMove,
    OpponentNumCanMove,

    /// Pieces that can reach a cell around the opponent's queen, and the
    /// number of such cells reachable.
    NumThreateningMoves,
    OpponentNumThreateningMoves,

    /// Moves left before the move limit, capped at 10.
    MovesToDraw,

    /// Pieces with a single neighbour, for each player.
    NumSingle,

    /// Whether each queen has an opponent piece on top.
    QueenCovered,

    /// Mean distance from each piece type to the opponent's queen.
    AverageDistanceToQueen,
    OpponentAverageDistanceToQueen,

    /// Cells where each player may drop a piece.
    NumPlacementPositions,

    /// ln(1 + move number).
    MoveNumber,
}

pub type FeatureSetter = fn(&Board, &BoardSpec, &mut [f32]);

#[derive(Clone, Copy)]
pub struct BoardSpec {
    pub id: BoardId,
    pub dim: usize,

    /// Start of this feature in the full vector.
    pub offset: usize,
    pub setter: FeatureSetter,

    /// Length of the full vector when this feature was introduced.
    pub version: usize,
}

impl std::fmt::Debug for BoardSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSpec")
            .field("id", &self.id)
            .field("dim", &self.dim)
            .field("offset", &self.offset)
            .field("version", &self.version)
            .finish()
    }
}

pub static BOARD_SPECS: LazyLock<Vec<BoardSpec>> = LazyLock::new(|| {
    use BoardId::*;

    let table: [(BoardId, usize, FeatureSetter, usize); 15] = [
        (NumOffboard, NUM_PIECE_TYPES, num_offboard, 0),
        (OpponentNumOffboard, NUM_PIECE_TYPES, num_offboard, 0),
        (NumSurroundingQueen, 1, num_surrounding_queen, 0),
        (OpponentNumSurroundingQueen, 1, num_surrounding_queen, 0),
        (NumCanMove, 2 * NUM_PIECE_TYPES, num_can_move, 0),
        (OpponentNumCanMove, 2 * NUM_PIECE_TYPES, num_can_move, 0),
        (NumThreateningMoves, 2, num_threatening_moves, 0),
        (OpponentNumThreateningMoves, 2, num_threatening_moves, 39),
        (MovesToDraw, 1, moves_to_draw, 0),
        (NumSingle, 2, num_single, 0),
        (QueenCovered, 2, queen_covered, 41),
        (AverageDistanceToQueen, NUM_PIECE_TYPES, average_distance_to_queen, 51),
        (OpponentAverageDistanceToQueen, NUM_PIECE_TYPES, average_distance_to_queen, 51),
        (NumPlacementPositions, 2, num_placement_positions, 53),
        (MoveNumber, 1, move_number, 54),
    ];

    let mut offset = 0;
    table
        .into_iter()
        .map(|(id, dim, setter, version)| {
            let spec = BoardSpec {
                id,
                dim,
                offset,
                setter,
                version,
            };
            offset += dim;
            spec
        })
        .collect()
});

/// Length of the full board feature vector.
pub fn board_features_dim() -> usize {
    BOARD_SPECS.iter().map(|spec| spec.dim).sum()
}

/// Board features known at `version`, packed contiguously in table order.
///
/// Panics if `version` is newer than the full vector.
pub fn for_board(board: &Board, version: usize) -> Vec<f32> {
    let full_dim = board_features_dim();
    if version > full_dim {
        panic!(
            "requested {} board features, but only {} are known",
            version, full_dim
        );
    }

    let mut f = vec![0.0; full_dim];
    for spec in BOARD_SPECS.iter().filter(|spec| spec.version <= version) {
        (spec.setter)(board, spec, &mut f[spec.offset..spec.offset + spec.dim]);
    }
    if version == full_dim {
        return f;
    }

    BOARD_SPECS
        .iter()
        .filter(|spec| spec.version <= version)
        .flat_map(|spec| f[spec.offset..spec.offset + spec.dim].iter().copied())
        .collect()
}

// (player, opponent) as seen by a feature and its "Opponent" twin
fn sides(board: &Board, mirrored: bool) -> (Player, Player) {
    let player = board.next_player();
    if mirrored {
        (player.opponent(), player)
    } else {
        (player, player.opponent())
    }
}

fn num_offboard(board: &Board, spec: &BoardSpec, f: &mut [f32]) {
    let (player, _) = sides(board, spec.id == BoardId::OpponentNumOffboard);
    for piece in PieceType::ALL {
        f[piece.index()] = board.available(player, piece) as f32;
    }
}

fn num_surrounding_queen(board: &Board, spec: &BoardSpec, f: &mut [f32]) {
    let (player, _) = sides(board, spec.id == BoardId::OpponentNumSurroundingQueen);
    f[0] = board.derived().num_surrounding_queen[player.index()] as f32;
}

fn num_can_move(board: &Board, spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, spec.id == BoardId::OpponentNumCanMove);
    let d = board.derived();
    let queen_neighbours: FxHashSet<Pos> = match d.queen_pos[opponent.index()] {
        Some(queen) => board.occupied_neighbours(queen).collect(),
        None => FxHashSet::default(),
    };

    let mut seen = FxHashSet::default();
    for action in d.player_actions(player) {
        let Action::Move { piece, source, .. } = *action else {
            continue;
        };
        if !seen.insert(source) {
            continue;
        }
        f[2 * piece.index()] += 1.0;
        if !queen_neighbours.contains(&source) {
            f[2 * piece.index() + 1] += 1.0;
        }
    }
}

fn num_threatening_moves(board: &Board, spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, spec.id == BoardId::OpponentNumThreateningMoves);
    let d = board.derived();
    let Some(queen) = d.queen_pos[opponent.index()] else {
        return;
    };
    let around_queen = queen.neighbour_array();

    let mut pieces = FxHashSet::default();
    let mut targets = FxHashSet::default();
    let mut can_place_around_queen = false;
    for action in d.player_actions(player) {
        match *action {
            Action::Move { source, target, .. } => {
                if !around_queen.contains(&target) || around_queen.contains(&source) {
                    continue;
                }
                pieces.insert(source);
                targets.insert(target);
            }
            // only possible with a beetle sitting on the queen
            Action::Placement { target, .. } if around_queen.contains(&target) => {
                can_place_around_queen = true;
            }
            _ => {}
        }
    }

    f[0] = pieces.len() as f32;
    f[1] = targets.len() as f32;
    if can_place_around_queen {
        let in_hand = TOTAL_PIECES_PER_PLAYER.saturating_sub(d.num_pieces_on_board[player.index()]);
        f[0] += in_hand as f32;
    }
}

fn moves_to_draw(board: &Board, _spec: &BoardSpec, f: &mut [f32]) {
    let left = board.max_moves() as f32 - board.move_number() as f32 + 1.0;
    f[0] = left.min(10.0);
}

fn num_single(board: &Board, _spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, false);
    let singles = board.derived().singles;
    f[0] = singles[player.index()] as f32;
    f[1] = singles[opponent.index()] as f32;
}

fn queen_covered(board: &Board, _spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, false);
    let d = board.derived();
    for (slot, owner) in [player, opponent].into_iter().enumerate() {
        let Some(queen) = d.queen_pos[owner.index()] else {
            continue;
        };
        if matches!(board.piece_at(queen), Some((top, _)) if top != owner) {
            f[slot] = 1.0;
        }
    }
}

/// Pieces still in hand count as one step further than the furthest piece
/// on the board. Each total is divided by the initial count of that type.
fn average_distance_to_queen(board: &Board, spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, spec.id == BoardId::OpponentAverageDistanceToQueen);
    let Some(queen) = board.derived().queen_pos[opponent.index()] else {
        return;
    };

    let mut totals = [0i32; NUM_PIECE_TYPES];
    let mut max_dist = 0;
    for (pos, stack) in board.stacks() {
        for (owner, piece) in stack.pieces() {
            if owner != player {
                continue;
            }
            let dist = queen.distance(&pos);
            max_dist = max_dist.max(dist);
            totals[piece.index()] += dist;
        }
    }
    max_dist += 1;
    for piece in PieceType::ALL {
        totals[piece.index()] += max_dist * board.available(player, piece) as i32;
    }
    for piece in PieceType::ALL {
        f[piece.index()] = totals[piece.index()] as f32 / INITIAL_AVAILABILITY.get(piece) as f32;
    }
}

/// Zero for a player with nothing left to place.
fn num_placement_positions(board: &Board, _spec: &BoardSpec, f: &mut [f32]) {
    let (player, opponent) = sides(board, false);
    let d = board.derived();
    for (slot, owner) in [player, opponent].into_iter().enumerate() {
        if board.availability(owner).total() > 0 {
            f[slot] = d.placement_positions[owner.index()].len() as f32;
        }
    }
}

fn move_number(board: &Board, _spec: &BoardSpec, f: &mut [f32]) {
    f[0] = (board.move_number() as f32 + 1.0).ln();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::{PieceType::*, Player::*};

    fn spec(id: BoardId) -> &'static BoardSpec {
        BOARD_SPECS.iter().find(|s| s.id == id).unwrap()
    }

    fn block(f: &[f32], id: BoardId) -> &[f32] {
        let s = spec(id);
        &f[s.offset..s.offset + s.dim]
    }

    fn play(actions: &[Action]) -> Board {
        actions.iter().fold(Board::new(), |board, &a| board.act(a))
    }

    fn place(piece: PieceType, x: i8, y: i8) -> Action {
        Action::Placement {
            piece,
            target: Pos(x, y),
        }
    }

    #[test]
    fn test_dims_per_version() {
        assert_eq!(board_features_dim(), 54);
        let board = Board::new();
        for (version, dim) in [(0, 37), (37, 37), (38, 37), (39, 39), (41, 41), (51, 51), (53, 53), (54, 54)] {
            assert_eq!(for_board(&board, version).len(), dim, "version {}", version);
        }
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let mut offset = 0;
        for s in BOARD_SPECS.iter() {
            assert_eq!(s.offset, offset, "{:?}", s.id);
            offset += s.dim;
        }
    }

    #[test]
    #[should_panic(expected = "only 54 are known")]
    fn test_version_too_new() {
        for_board(&Board::new(), 55);
    }

    #[test]
    fn test_subset_keeps_order() {
        let board = play(&[place(Queen, 0, 0), place(Ant, 0, 1), place(Ant, 0, -1)]);
        let full = for_board(&board, 54);
        let old = for_board(&board, 37);

        // the version-0 blocks come first in the table up to OpponentNumThreateningMoves
        assert_eq!(old[..34], full[..34]);
        let draw = spec(BoardId::MovesToDraw);
        assert_eq!(old[34], full[draw.offset]);
        let single = spec(BoardId::NumSingle);
        assert_eq!(old[35..37], full[single.offset..single.offset + 2]);
    }

    #[test]
    fn test_new_board() {
        let f = for_board(&Board::new(), 54);
        assert_eq!(block(&f, BoardId::NumOffboard), &[3.0, 2.0, 3.0, 1.0, 2.0]);
        assert_eq!(block(&f, BoardId::OpponentNumOffboard), &[3.0, 2.0, 3.0, 1.0, 2.0]);
        assert_eq!(block(&f, BoardId::MovesToDraw), &[10.0]);
        assert_eq!(block(&f, BoardId::NumPlacementPositions), &[1.0, 1.0]);
        assert_eq!(block(&f, BoardId::MoveNumber), &[(2.0f32).ln()]);
        assert_eq!(block(&f, BoardId::AverageDistanceToQueen), &[0.0; 5]);
        assert_eq!(block(&f, BoardId::QueenCovered), &[0.0, 0.0]);
    }

    #[test]
    fn test_opening_features() {
        // First: queen at origin, ant below. Second: queen above, ant above it.
        let board = play(&[
            place(Queen, 0, 0),
            place(Queen, 0, -1),
            place(Ant, 0, 1),
            place(Ant, 0, -2),
        ]);
        assert_eq!(board.next_player(), First);
        let f = for_board(&board, 54);

        assert_eq!(block(&f, BoardId::NumOffboard), &[2.0, 2.0, 3.0, 0.0, 2.0]);
        assert_eq!(block(&f, BoardId::NumSurroundingQueen), &[2.0]);
        assert_eq!(block(&f, BoardId::OpponentNumSurroundingQueen), &[2.0]);
        assert_eq!(block(&f, BoardId::NumSingle), &[1.0, 1.0]);
        assert_eq!(block(&f, BoardId::MoveNumber), &[(6.0f32).ln()]);

        // only the ant at the tip can move; it never touches the opponent queen
        let can_move = block(&f, BoardId::NumCanMove);
        assert_eq!(can_move[2 * Ant.index()], 1.0);
        assert_eq!(can_move[2 * Ant.index() + 1], 1.0);
        assert_eq!(can_move[2 * Queen.index()], 0.0);

        // ant can reach any of the free cells around the opponent queen
        let threats = block(&f, BoardId::NumThreateningMoves);
        assert_eq!(threats[0], 1.0);
        assert_eq!(threats[1], 4.0);

        // ant at distance 2 from the opposing queen, two more in hand at 3
        let dist = block(&f, BoardId::AverageDistanceToQueen);
        assert_eq!(dist[Ant.index()], (2.0 + 3.0 + 3.0) / 3.0);
        assert_eq!(dist[Queen.index()], 1.0);
        assert_eq!(dist[Beetle.index()], 3.0);
    }

    #[test]
    fn test_queen_covered() {
        let mut board = Board::from_layout(
            &[
                (Pos(0, 0), First, Queen),
                (Pos(0, 1), Second, Queen),
                (Pos(0, 0), Second, Beetle),
            ],
            false,
        );
        board.set_next_player(Second);
        board.build_derived();
        let f = for_board(&board, 54);
        assert_eq!(block(&f, BoardId::QueenCovered), &[0.0, 1.0]);
    }

    #[test]
    fn test_moves_to_draw_near_limit() {
        let mut board = Board::with_max_moves(6);
        board.set_move_number(4);
        board.build_derived();
        let f = for_board(&board, 54);
        assert_eq!(block(&f, BoardId::MovesToDraw), &[3.0]);
    }
}
