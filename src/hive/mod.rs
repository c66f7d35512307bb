use std::sync::{Arc, OnceLock};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

mod action;
mod cache;
mod hex;
pub mod matches;
mod moves;
mod removable;
mod repeats;
mod stack;

pub use action::Action;
pub use cache::TranspositionCache;
pub use hex::{Pos, HEXDIR};
pub use repeats::{Limits, PosStack};
pub use stack::{
    Availability, EncodedStack, PieceType, Player, INITIAL_AVAILABILITY, NUM_PIECE_TYPES,
    TOTAL_PIECES_PER_PLAYER,
};

use repeats::{Fingerprint, HistoryNode};

pub const DEFAULT_MAX_MOVES: usize = 100;

/// Number of times a position may be seen before the match is a draw.
pub const MAX_BOARD_REPEATS: u8 = 3;

/// Game state. Boards handed out by `act` are never mutated again, so they
/// can be shared between threads.
#[derive(Clone, Debug)]
pub struct Board {
    available: [Availability; 2],
    board: FxHashMap<Pos, EncodedStack>,
    move_number: usize,
    max_moves: usize,
    next_player: Player,

    // earlier boards of the match, for repetition checks
    history: Option<Arc<HistoryNode>>,
    derived: Option<Arc<Derived>>,
}

/// Everything computed from a board position. Built in one go by
/// `Board::build_derived` and never changed afterwards.
#[derive(Debug)]
pub struct Derived {
    pub next_player: Player,
    pub limits: Limits,

    /// Stacks shifted to a canonical origin and sorted.
    pub normalized: Arc<[PosStack]>,
    pub hash: u64,

    /// Times this same position was seen earlier in the match.
    pub repeats: u8,

    pub num_pieces_on_board: [u8; 2],
    pub placement_positions: [FxHashSet<Pos>; 2],
    pub removable: FxHashSet<Pos>,
    pub players_actions: [Vec<Action>; 2],

    // both set means a draw
    pub wins: [bool; 2],
    pub num_surrounding_queen: [u8; 2],
    pub queen_pos: [Option<Pos>; 2],

    /// Pieces with exactly one neighbour, by owner of the top piece.
    pub singles: [u8; 2],

    next_boards: OnceLock<Vec<Board>>,
}

impl Derived {
    /// Actions of the player to move.
    pub fn actions(&self) -> &[Action] {
        &self.players_actions[self.next_player.index()]
    }

    pub fn player_actions(&self, player: Player) -> &[Action] {
        &self.players_actions[player.index()]
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(
            self.hash,
            self.next_player,
            &self.limits,
            self.normalized.clone(),
            self.repeats,
        )
    }
}

// the successor cache is not part of a board's identity
impl PartialEq for Derived {
    fn eq(&self, other: &Self) -> bool {
        self.next_player == other.next_player
            && self.limits == other.limits
            && self.normalized == other.normalized
            && self.hash == other.hash
            && self.repeats == other.repeats
            && self.num_pieces_on_board == other.num_pieces_on_board
            && self.placement_positions == other.placement_positions
            && self.removable == other.removable
            && self.players_actions == other.players_actions
            && self.wins == other.wins
            && self.num_surrounding_queen == other.num_surrounding_queen
            && self.queen_pos == other.queen_pos
            && self.singles == other.singles
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self::with_max_moves(DEFAULT_MAX_MOVES)
    }

    pub fn with_max_moves(max_moves: usize) -> Self {
        let mut board = Board {
            available: [INITIAL_AVAILABILITY; 2],
            board: FxHashMap::default(),
            move_number: 1,
            max_moves,
            next_player: Player::First,
            history: None,
            derived: None,
        };
        board.build_derived();
        board
    }

    /// Builds a board by stacking the given pieces in order, taking each one
    /// out of its owner's hand. Positions may be given in display coordinates.
    pub fn from_layout(layout: &[(Pos, Player, PieceType)], display_coords: bool) -> Self {
        let mut board = Board::new();
        for &(pos, player, piece) in layout {
            let pos = if display_coords {
                pos.from_display()
            } else {
                pos
            };
            board.stack_piece(pos, player, piece);
            // layouts for hypothetical positions may use more pieces than a hand holds
            let left = board.available(player, piece).saturating_sub(1);
            board.set_available(player, piece, left);
        }
        board.build_derived();
        board
    }

    pub fn available(&self, player: Player, piece: PieceType) -> u8 {
        self.available[player.index()].get(piece)
    }

    pub fn availability(&self, player: Player) -> &Availability {
        &self.available[player.index()]
    }

    pub fn set_available(&mut self, player: Player, piece: PieceType, count: u8) {
        self.derived = None;
        self.available[player.index()].set(piece, count);
    }

    pub fn move_number(&self) -> usize {
        self.move_number
    }

    pub fn set_move_number(&mut self, move_number: usize) {
        self.derived = None;
        self.move_number = move_number;
    }

    pub fn max_moves(&self) -> usize {
        self.max_moves
    }

    pub fn set_max_moves(&mut self, max_moves: usize) {
        self.derived = None;
        self.max_moves = max_moves;
    }

    pub fn next_player(&self) -> Player {
        self.next_player
    }

    pub fn opponent_player(&self) -> Player {
        self.next_player.opponent()
    }

    pub fn set_next_player(&mut self, player: Player) {
        self.derived = None;
        self.next_player = player;
    }

    pub fn stack_at(&self, pos: Pos) -> EncodedStack {
        self.board.get(&pos).copied().unwrap_or_default()
    }

    pub fn stacks(&self) -> impl Iterator<Item = (Pos, EncodedStack)> + '_ {
        self.board.iter().map(|(&pos, &stack)| (pos, stack))
    }

    pub fn has_piece(&self, pos: Pos) -> bool {
        self.stack_at(pos).has_piece()
    }

    /// Top piece at `pos`.
    pub fn piece_at(&self, pos: Pos) -> Option<(Player, PieceType)> {
        self.stack_at(pos).top()
    }

    pub fn count_at(&self, pos: Pos) -> u8 {
        self.stack_at(pos).count_pieces()
    }

    /// Occupied positions, sorted.
    pub fn occupied_positions(&self) -> Vec<Pos> {
        let mut res: Vec<Pos> = self.board.keys().copied().collect();
        res.sort_unstable();
        res
    }

    pub fn num_occupied(&self) -> usize {
        self.board.len()
    }

    pub fn occupied_neighbours(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        pos.neighbours().filter(move |&n| self.has_piece(n))
    }

    pub fn empty_neighbours(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        pos.neighbours().filter(move |&n| !self.has_piece(n))
    }

    /// Puts a piece on top of `pos`. Availability is left alone, and derived
    /// state has to be rebuilt afterwards.
    pub fn stack_piece(&mut self, pos: Pos, player: Player, piece: PieceType) {
        self.derived = None;
        let stack = self.stack_at(pos).stack_piece(player, piece);
        self.board.insert(pos, stack);
    }

    /// Takes the top piece off `pos`, if any.
    pub fn pop_piece(&mut self, pos: Pos) -> Option<(Player, PieceType)> {
        let (stack, player, piece) = self.stack_at(pos).pop_piece()?;
        self.derived = None;
        if stack.has_piece() {
            self.board.insert(pos, stack);
        } else {
            self.board.remove(&pos);
        }
        Some((player, piece))
    }

    pub fn has_derived(&self) -> bool {
        self.derived.is_some()
    }

    /// Derived state of the board.
    ///
    /// Panics if the board was edited after its last `build_derived`.
    pub fn derived(&self) -> &Derived {
        match &self.derived {
            Some(d) => &**d,
            None => panic!("derived state requested on a board edited since its last rebuild"),
        }
    }

    pub fn build_derived(&mut self) {
        self.derived = None;

        let limits = self.used_limits();
        let normalized: Arc<[PosStack]> = self.normalized_stacks(&limits).into();
        let hash = self.normalized_hash(&normalized);
        let fingerprint = Fingerprint::new(hash, self.next_player, &limits, normalized.clone(), 0);
        let repeats = self.find_repeats(&fingerprint);

        let num_pieces_on_board = Player::ALL
            .map(|p| TOTAL_PIECES_PER_PLAYER.saturating_sub(self.availability(p).total()));
        let placement_positions = Player::ALL.map(|p| self.placement_positions(p));
        let removable = self.removable_positions();
        let players_actions = Player::ALL.map(|p| {
            self.valid_actions(
                p,
                &placement_positions[p.index()],
                num_pieces_on_board[p.index()],
                &removable,
            )
        });
        let (wins, num_surrounding_queen, queen_pos) = self.end_game();
        let singles = self.singles();

        debug!(
            move_number = self.move_number,
            hash, repeats, "built derived state with {} actions",
            players_actions[self.next_player.index()].len()
        );

        self.derived = Some(Arc::new(Derived {
            next_player: self.next_player,
            limits,
            normalized,
            hash,
            repeats,
            num_pieces_on_board,
            placement_positions,
            removable,
            players_actions,
            wins,
            num_surrounding_queen,
            queen_pos,
            singles,
            next_boards: OnceLock::new(),
        }));
    }

    /// Where `player` may drop a new piece.
    pub fn placement_positions(&self, player: Player) -> FxHashSet<Pos> {
        let origin = Pos::origin();
        if self.board.is_empty() {
            return [origin].into_iter().collect();
        }
        if self.board.len() == 1 && self.count_at(origin) == 1 {
            return origin.neighbours().collect();
        }

        let candidates: FxHashSet<Pos> = self
            .board
            .iter()
            .filter(|(_, stack)| matches!(stack.top(), Some((owner, _)) if owner == player))
            .flat_map(|(&pos, _)| self.empty_neighbours(pos))
            .collect();

        candidates
            .into_iter()
            .filter(|&pos| {
                self.occupied_neighbours(pos)
                    .all(|n| matches!(self.piece_at(n), Some((owner, _)) if owner == player))
            })
            .collect()
    }

    /// Legal actions for `player`, or a lone `Skip` if there are none.
    fn valid_actions(
        &self,
        player: Player,
        placements: &FxHashSet<Pos>,
        num_on_board: u8,
        removable: &FxHashSet<Pos>,
    ) -> Vec<Action> {
        let mut actions = Vec::with_capacity(32);

        // the queen has to be out by the fourth piece
        let hand = self.availability(player);
        let must_place_queen = hand.get(PieceType::Queen) > 0 && num_on_board >= 3;
        let mut targets: Vec<Pos> = placements.iter().copied().collect();
        targets.sort_unstable();
        for target in targets {
            if must_place_queen {
                actions.push(Action::Placement {
                    piece: PieceType::Queen,
                    target,
                });
            } else {
                actions.extend(hand.available().map(|piece| Action::Placement { piece, target }));
            }
        }

        // nothing moves until the queen is down
        if hand.get(PieceType::Queen) == 0 {
            for source in self.occupied_positions() {
                let Some((owner, piece)) = self.piece_at(source) else {
                    continue;
                };
                if owner != player || !removable.contains(&source) {
                    continue;
                }
                actions.extend(self.piece_moves(piece, source).into_iter().map(|target| {
                    Action::Move {
                        piece,
                        source,
                        target,
                    }
                }));
            }
        }

        if actions.is_empty() {
            actions.push(Action::Skip);
        }
        actions
    }

    fn end_game(&self) -> ([bool; 2], [u8; 2], [Option<Pos>; 2]) {
        let mut wins = [false; 2];
        let mut surrounding = [0u8; 2];
        let mut queen_pos = [None; 2];
        for (pos, stack) in self.stacks() {
            let Some(owner) = stack.has_queen() else {
                continue;
            };
            let idx = owner.index();
            queen_pos[idx] = Some(pos);
            surrounding[idx] = self.occupied_neighbours(pos).count() as u8;
            if surrounding[idx] == 6 {
                wins[owner.opponent().index()] = true;
            }
        }

        // past the move limit it is a draw no matter what
        if self.move_number > self.max_moves {
            wins = [true, true];
        }
        (wins, surrounding, queen_pos)
    }

    fn singles(&self) -> [u8; 2] {
        let mut singles = [0u8; 2];
        for (pos, stack) in self.stacks() {
            if self.occupied_neighbours(pos).count() != 1 {
                continue;
            }
            if let Some((owner, _)) = stack.top() {
                singles[owner.index()] += 1;
            }
        }
        singles
    }

    /// Board after the player to move takes `action`. The action is trusted to
    /// be one of `actions()`, see `is_valid`.
    pub fn act(&self, action: Action) -> Board {
        let mut next = Board {
            available: self.available,
            board: self.board.clone(),
            move_number: self.move_number,
            max_moves: self.max_moves,
            next_player: self.next_player,
            history: Some(Arc::new(HistoryNode {
                fingerprint: self.derived().fingerprint(),
                previous: self.history.clone(),
            })),
            derived: None,
        };

        match action {
            Action::Placement { piece, target } => {
                next.stack_piece(target, next.next_player, piece);
                next.available[next.next_player.index()].take(piece);
            }
            Action::Move { source, target, .. } => {
                if let Some((player, piece)) = next.pop_piece(source) {
                    next.stack_piece(target, player, piece);
                }
            }
            Action::Skip => {}
        }

        next.next_player = next.next_player.opponent();
        next.move_number += 1;
        next.build_derived();
        next
    }

    /// Successor boards, one per action of `actions()`, built on first use.
    pub fn take_all_actions(&self) -> &[Board] {
        let derived = self.derived();
        derived
            .next_boards
            .get_or_init(|| derived.actions().iter().map(|&a| self.act(a)).collect())
    }

    pub fn actions(&self) -> &[Action] {
        self.derived().actions()
    }

    pub fn num_actions(&self) -> usize {
        self.actions().len()
    }

    pub fn is_valid(&self, action: &Action) -> bool {
        self.actions().contains(action)
    }

    /// Index of an action taken from this board's own list.
    pub fn find_action(&self, action: &Action) -> usize {
        match self.actions().iter().position(|a| a == action) {
            Some(idx) => idx,
            None => panic!("action {} not found, available: {:?}", action, self.actions()),
        }
    }

    /// Like `find_action`, for actions built elsewhere, e.g. read from a match
    /// file.
    pub fn find_action_deep(&self, action: &Action) -> usize {
        match self.actions().iter().position(|a| a.equal(action)) {
            Some(idx) => idx,
            None => panic!("action {} not found, available: {:?}", action, self.actions()),
        }
    }

    pub fn is_finished(&self) -> bool {
        let d = self.derived();
        d.repeats >= MAX_BOARD_REPEATS || d.wins[0] || d.wins[1] || self.move_number >= self.max_moves
    }

    pub fn draw(&self) -> bool {
        let d = self.derived();
        self.is_finished() && d.wins[0] == d.wins[1]
    }

    /// Winner of a finished, decisive match.
    pub fn winner(&self) -> Option<Player> {
        if !self.is_finished() || self.draw() {
            return None;
        }
        if self.derived().wins[0] {
            Some(Player::First)
        } else {
            Some(Player::Second)
        }
    }

    pub fn finish_reason(&self) -> String {
        if !self.is_finished() {
            return "game not finished yet".to_string();
        }
        if let Some(winner) = self.winner() {
            return format!("{} won", winner);
        }
        let d = self.derived();
        if d.repeats >= MAX_BOARD_REPEATS {
            return format!(
                "current board position was repeated {} time",
                MAX_BOARD_REPEATS
            );
        }
        if self.move_number >= self.max_moves {
            return format!(
                "max number of moves {} (one per player) was reached",
                self.max_moves
            );
        }
        "the Queens from both players were surrounded at the same time".to_string()
    }
}
