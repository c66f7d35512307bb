use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::Board;

/// Bounded store of boards keyed by position hash, owned by whoever runs the
/// search. The oldest entry goes first once full.
#[derive(Debug)]
pub struct TranspositionCache {
    capacity: usize,
    entries: FxHashMap<u64, Vec<Board>>,
    fifo: VecDeque<u64>,
}

impl TranspositionCache {
    pub fn new(capacity: usize) -> Self {
        TranspositionCache {
            capacity,
            entries: FxHashMap::default(),
            fifo: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// A cached board holding the same position as `board`.
    pub fn get(&self, board: &Board) -> Option<&Board> {
        self.entries
            .get(&board.derived().hash)?
            .iter()
            .find(|cached| cached.compare(board))
    }

    pub fn insert(&mut self, board: Board) {
        if self.capacity == 0 || self.get(&board).is_some() {
            return;
        }
        if self.fifo.len() >= self.capacity {
            self.evict();
        }
        let hash = board.derived().hash;
        self.entries.entry(hash).or_default().push(board);
        self.fifo.push_back(hash);
    }

    fn evict(&mut self) {
        let Some(hash) = self.fifo.pop_front() else {
            return;
        };
        if let Some(bucket) = self.entries.get_mut(&hash) {
            // buckets fill in insertion order, so the oldest is first
            bucket.remove(0);
            if bucket.is_empty() {
                self.entries.remove(&hash);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, OnceLock};

    use super::*;
    use crate::hive::{Action, Derived, PieceType::*, Pos};

    fn opening() -> Board {
        Board::new().act(Action::Placement {
            piece: Queen,
            target: Pos(0, 0),
        })
    }

    #[test]
    fn test_get_equivalent() {
        let mut cache = TranspositionCache::new(4);
        let board = opening();
        assert!(cache.get(&board).is_none());
        cache.insert(board.clone());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&board).unwrap().compare(&board));

        // same position again is not stored twice
        cache.insert(board.clone());
        assert_eq!(cache.len(), 1);
    }

    // same position, but filed under another hash
    fn with_hash(board: &Board, hash: u64) -> Board {
        let d = board.derived();
        let mut forged = board.clone();
        forged.derived = Some(Arc::new(Derived {
            next_player: d.next_player,
            limits: d.limits,
            normalized: d.normalized.clone(),
            hash,
            repeats: d.repeats,
            num_pieces_on_board: d.num_pieces_on_board,
            placement_positions: d.placement_positions.clone(),
            removable: d.removable.clone(),
            players_actions: d.players_actions.clone(),
            wins: d.wins,
            num_surrounding_queen: d.num_surrounding_queen,
            queen_pos: d.queen_pos,
            singles: d.singles,
            next_boards: OnceLock::new(),
        }));
        forged
    }

    #[test]
    fn test_shared_bucket() {
        let next: Vec<Board> = opening().take_all_actions().iter().take(3).cloned().collect();
        let (a, other) = (&next[0], &next[2]);
        assert!(!a.compare(other));
        let b = with_hash(other, a.derived().hash);

        let mut cache = TranspositionCache::new(2);
        cache.insert(a.clone());
        assert!(cache.get(&b).is_none());

        cache.insert(b.clone());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.get(a).unwrap().compare(a));
        assert!(cache.get(&b).unwrap().compare(&b));

        // the oldest board of the bucket goes first
        cache.insert(next[1].clone());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(a).is_none());
        assert!(cache.get(&b).unwrap().compare(&b));
        assert!(cache.get(&next[1]).is_some());
    }

    #[test]
    fn test_eviction() {
        let mut cache = TranspositionCache::new(2);
        let boards: Vec<Board> = opening().take_all_actions().iter().take(3).cloned().collect();
        for b in &boards {
            cache.insert(b.clone());
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&boards[0]).is_none());
        assert!(cache.get(&boards[2]).is_some());
    }
}
