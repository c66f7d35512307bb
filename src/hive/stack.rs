use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    First,
    Second,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::First, Player::Second];

    pub fn index(self) -> usize {
        match self {
            Player::First => 0,
            Player::Second => 1,
        }
    }

    pub fn from_index(idx: usize) -> Self {
        if idx & 1 == 0 {
            Player::First
        } else {
            Player::Second
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Player::First => Player::Second,
            Player::Second => Player::First,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::First => write!(f, "Player 0"),
            Player::Second => write!(f, "Player 1"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceType {
    Ant = 1,
    Beetle = 2,
    Grasshopper = 3,
    Queen = 4,
    Spider = 5,
}

pub const NUM_PIECE_TYPES: usize = 5;

impl PieceType {
    pub const ALL: [PieceType; NUM_PIECE_TYPES] = [
        PieceType::Ant,
        PieceType::Beetle,
        PieceType::Grasshopper,
        PieceType::Queen,
        PieceType::Spider,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        use PieceType::*;

        match code {
            1 => Some(Ant),
            2 => Some(Beetle),
            3 => Some(Grasshopper),
            4 => Some(Queen),
            5 => Some(Spider),
            _ => None,
        }
    }

    // index into availability and one-hot vectors
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn letter(self) -> char {
        use PieceType::*;

        match self {
            Ant => 'A',
            Beetle => 'B',
            Grasshopper => 'G',
            Queen => 'Q',
            Spider => 'S',
        }
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Off-board piece counts for one player, indexed by `PieceType::index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Availability(pub [u8; NUM_PIECE_TYPES]);

pub const INITIAL_AVAILABILITY: Availability = Availability([3, 2, 3, 1, 2]);

/// Number of pieces each player starts with.
pub const TOTAL_PIECES_PER_PLAYER: u8 = 11;

impl Default for Availability {
    fn default() -> Self {
        INITIAL_AVAILABILITY
    }
}

impl Availability {
    pub fn get(&self, piece: PieceType) -> u8 {
        self.0[piece.index()]
    }

    pub fn set(&mut self, piece: PieceType, count: u8) {
        self.0[piece.index()] = count;
    }

    pub fn take(&mut self, piece: PieceType) {
        let slot = &mut self.0[piece.index()];
        assert!(*slot > 0, "no {} left to place", piece);
        *slot -= 1;
    }

    pub fn total(&self) -> u8 {
        self.0.iter().sum()
    }

    pub fn available(&self) -> impl Iterator<Item = PieceType> + '_ {
        PieceType::ALL.into_iter().filter(|&p| self.get(p) > 0)
    }
}

const PIECE_MASK: u64 = 0x7F;
const PLAYER_BIT: u64 = 0x80;
const SLOT_BITS: u32 = 8;
pub const MAX_STACK: usize = 8;

/// A stack of pieces packed in one word: 8 bits per slot, slot 0 on top.
/// Each slot keeps the owner in bit 7 and the piece code in bits 0-6.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedStack(pub u64);

impl EncodedStack {
    pub const EMPTY: EncodedStack = EncodedStack(0);

    pub fn stack_piece(self, player: Player, piece: PieceType) -> Self {
        debug_assert!(
            (self.count_pieces() as usize) < MAX_STACK,
            "stack overflow pushing {}",
            piece
        );
        let slot = (piece.code() as u64 & PIECE_MASK) | ((player.index() as u64 & 1) << 7);
        EncodedStack((self.0 << SLOT_BITS) | slot)
    }

    pub fn pop_piece(self) -> Option<(Self, Player, PieceType)> {
        let (player, piece) = self.top()?;
        Some((EncodedStack(self.0 >> SLOT_BITS), player, piece))
    }

    pub fn has_piece(self) -> bool {
        self.0 & PIECE_MASK != 0
    }

    pub fn is_stacked(self) -> bool {
        self.0 & (PIECE_MASK << SLOT_BITS) != 0
    }

    pub fn top(self) -> Option<(Player, PieceType)> {
        self.slot(0)
    }

    pub fn slot(self, idx: usize) -> Option<(Player, PieceType)> {
        if idx >= MAX_STACK {
            return None;
        }
        let byte = (self.0 >> (idx as u32 * SLOT_BITS)) & 0xFF;
        let piece = PieceType::from_code((byte & PIECE_MASK) as u8)?;
        let player = Player::from_index(((byte & PLAYER_BIT) >> 7) as usize);
        Some((player, piece))
    }

    /// Top to bottom.
    pub fn pieces(self) -> impl Iterator<Item = (Player, PieceType)> {
        (0..MAX_STACK).map_while(move |i| self.slot(i))
    }

    /// Owner of a queen anywhere in the stack.
    pub fn has_queen(self) -> Option<Player> {
        self.pieces()
            .find(|&(_, piece)| piece == PieceType::Queen)
            .map(|(player, _)| player)
    }

    pub fn count_pieces(self) -> u8 {
        self.pieces().count() as u8
    }
}

impl fmt::Debug for EncodedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pieces().map(|(player, piece)| (player.index(), piece.letter())))
            .finish()
    }
}
