//! Translation-independent board identity, used to detect positions that
//! repeat within a match.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use super::{Board, EncodedStack, Player, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PosStack {
    pub pos: Pos,
    pub stack: EncodedStack,
}

/// Min/max of the occupied coordinates. All zero for an empty board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    pub min_x: i8,
    pub max_x: i8,
    pub min_y: i8,
    pub max_y: i8,
}

impl Limits {
    pub fn width(&self) -> i8 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i8 {
        self.max_y - self.min_y
    }
}

/// What a later board needs to know about an earlier one to tell whether
/// they are the same position.
#[derive(Clone, Debug)]
pub(crate) struct Fingerprint {
    pub hash: u64,
    pub next_player: Player,
    pub num_pieces: u8,
    pub width: i8,
    pub height: i8,
    pub normalized: Arc<[PosStack]>,
    pub repeats: u8,
}

impl Fingerprint {
    pub fn new(
        hash: u64,
        next_player: Player,
        limits: &Limits,
        normalized: Arc<[PosStack]>,
        repeats: u8,
    ) -> Self {
        Fingerprint {
            hash,
            next_player,
            num_pieces: normalized.iter().map(|ps| ps.stack.count_pieces()).sum(),
            width: limits.width(),
            height: limits.height(),
            normalized,
            repeats,
        }
    }

    fn equivalent(&self, other: &Fingerprint) -> bool {
        self.hash == other.hash
            && self.next_player == other.next_player
            && self.num_pieces == other.num_pieces
            && self.width == other.width
            && self.height == other.height
            && self.normalized == other.normalized
    }
}

/// Earlier boards of the match, most recent first. Search branches that
/// share a prefix share the nodes.
#[derive(Debug)]
pub(crate) struct HistoryNode {
    pub fingerprint: Fingerprint,
    pub previous: Option<Arc<HistoryNode>>,
}

impl Drop for HistoryNode {
    // long matches would otherwise drop the chain recursively
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.previous.take(),
                Err(_) => break,
            }
        }
    }
}

impl Board {
    pub fn used_limits(&self) -> Limits {
        let mut positions = self.board.keys();
        let Some(first) = positions.next() else {
            return Limits::default();
        };
        let mut limits = Limits {
            min_x: first.x(),
            max_x: first.x(),
            min_y: first.y(),
            max_y: first.y(),
        };
        for pos in positions {
            limits.min_x = limits.min_x.min(pos.x());
            limits.max_x = limits.max_x.max(pos.x());
            limits.min_y = limits.min_y.min(pos.y());
            limits.max_y = limits.max_y.max(pos.y());
        }
        limits
    }

    /// Stacks shifted so the top-left corner sits at the origin, sorted by
    /// (y, x). The x shift is kept even, so odd columns stay odd.
    pub(crate) fn normalized_stacks(&self, limits: &Limits) -> Vec<PosStack> {
        let mut min_x = limits.min_x;
        if min_x & 1 != 0 {
            min_x -= 1;
        }
        let shift = Pos(min_x, limits.min_y);
        let mut res: Vec<PosStack> = self
            .board
            .iter()
            .map(|(&pos, &stack)| PosStack {
                pos: pos - shift,
                stack,
            })
            .collect();
        res.sort_unstable_by_key(|ps| ps.pos);
        res
    }

    pub(crate) fn normalized_hash(&self, normalized: &[PosStack]) -> u64 {
        if normalized.is_empty() {
            return 0;
        }
        let mut hasher = FxHasher::default();
        (self.next_player.index() as u8).hash(&mut hasher);
        for ps in normalized {
            ps.pos.hash(&mut hasher);
            ps.stack.0.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Number of times this position showed up earlier in the match. Only
    /// boards with the same number of pieces are looked at, since a placement
    /// can never be undone.
    pub(crate) fn find_repeats(&self, fingerprint: &Fingerprint) -> u8 {
        let mut node = self.history.as_deref();
        while let Some(prev) = node {
            if prev.fingerprint.num_pieces != fingerprint.num_pieces {
                break;
            }
            if prev.fingerprint.equivalent(fingerprint) {
                return prev.fingerprint.repeats + 1;
            }
            node = prev.previous.as_deref();
        }
        0
    }

    /// Whether both boards hold the same position up to translation, with the
    /// same player to move.
    pub fn compare(&self, other: &Board) -> bool {
        self.derived().fingerprint().equivalent(&other.derived().fingerprint())
    }
}
