use rustc_hash::FxHashSet;

use super::{Board, PieceType, Pos, HEXDIR};

const SPIDER_STEPS: usize = 3;

impl Board {
    /// Empty neighbours of `src` that a piece can slide into, treating
    /// `original` as already vacated and skipping anything in `invalid`.
    ///
    /// A slide needs exactly one of the two cells flanking the step to be
    /// occupied: with both occupied the piece can't squeeze through, with
    /// neither it would leave the hive.
    pub fn empty_and_connected_neighbours(
        &self,
        src: Pos,
        original: Pos,
        invalid: &FxHashSet<Pos>,
    ) -> Vec<Pos> {
        let neighbours = src.neighbour_array();
        let occupied = neighbours.map(|n| n != original && self.has_piece(n));

        let mut res = Vec::with_capacity(6);
        for (i, &target) in neighbours.iter().enumerate() {
            if occupied[i] || invalid.contains(&target) {
                continue;
            }
            let left = occupied[(i + 1) % 6];
            let right = occupied[(i + 5) % 6];
            if left != right {
                res.push(target);
            }
        }
        res
    }

    /// Destinations for `piece` sitting on top of `src`, sorted. Does not check
    /// whether the piece is pinned by hive connectivity, the caller does.
    pub fn piece_moves(&self, piece: PieceType, src: Pos) -> Vec<Pos> {
        use PieceType::*;

        let mut res = match piece {
            Queen => self.empty_and_connected_neighbours(src, src, &FxHashSet::default()),
            Spider => self.spider_moves(src),
            Grasshopper => self.grasshopper_moves(src),
            Ant => self.ant_moves(src),
            Beetle => self.beetle_moves(src),
        };
        res.sort_unstable();
        res
    }

    fn spider_moves(&self, src: Pos) -> Vec<Pos> {
        let mut path = FxHashSet::default();
        path.insert(src);
        let mut ends = FxHashSet::default();
        self.spider_walk(src, src, 0, &mut path, &mut ends);
        ends.into_iter().collect()
    }

    fn spider_walk(
        &self,
        src: Pos,
        cur: Pos,
        depth: usize,
        path: &mut FxHashSet<Pos>,
        ends: &mut FxHashSet<Pos>,
    ) {
        if depth == SPIDER_STEPS {
            ends.insert(cur);
            return;
        }
        for next in self.empty_and_connected_neighbours(cur, src, path) {
            path.insert(next);
            self.spider_walk(src, next, depth + 1, path, ends);
            path.remove(&next);
        }
    }

    fn grasshopper_moves(&self, src: Pos) -> Vec<Pos> {
        let mut res = Vec::new();
        for dir in HEXDIR {
            let mut cur = src;
            let mut steps = 0;
            while self.has_piece(cur) {
                cur = cur + dir;
                steps += 1;
            }
            // has to jump over at least one piece
            if steps > 1 {
                res.push(cur);
            }
        }
        res
    }

    fn ant_moves(&self, src: Pos) -> Vec<Pos> {
        let mut visited = FxHashSet::default();
        visited.insert(src);
        let mut to_explore = vec![src];

        while let Some(cur) = to_explore.pop() {
            for next in self.empty_and_connected_neighbours(cur, src, &visited) {
                visited.insert(next);
                to_explore.push(next);
            }
        }

        visited.remove(&src);
        visited.into_iter().collect()
    }

    fn beetle_moves(&self, src: Pos) -> Vec<Pos> {
        // on top of the hive it can go anywhere around
        if self.count_at(src) > 1 {
            return src.neighbours().collect();
        }

        let mut res: Vec<Pos> = src.neighbours().filter(|&n| self.has_piece(n)).collect();
        res.extend(self.empty_and_connected_neighbours(src, src, &FxHashSet::default()));
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::{Player, PieceType::*, Player::*};

    fn moves_of(board: &Board, player: Player, piece: PieceType, src: Pos) -> Vec<Pos> {
        let mut res: Vec<Pos> = board
            .derived()
            .player_actions(player)
            .iter()
            .filter(|a| a.is_move() && a.piece() == Some(piece) && a.source() == Some(src))
            .filter_map(|a| a.target())
            .collect();
        res.sort_unstable();
        res
    }

    fn sorted(mut positions: Vec<Pos>) -> Vec<Pos> {
        positions.sort_unstable();
        positions
    }

    #[test]
    fn test_queen_moves() {
        let mut layout = vec![
            (Pos(0, 0), First, Ant),
            (Pos(-1, 0), Second, Beetle),
            (Pos(1, 0), First, Spider),
            (Pos(-1, 1), Second, Grasshopper),
            (Pos(2, 0), First, Queen),
            (Pos(-1, 2), Second, Grasshopper),
        ];
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Queen, Pos(2, 0)),
            vec![Pos(2, -1), Pos(1, 1)]
        );

        // the queen is all that keeps the grasshopper attached
        layout.push((Pos(3, 0), First, Grasshopper));
        let board = Board::from_layout(&layout, false);
        assert!(moves_of(&board, First, Queen, Pos(2, 0)).is_empty());

        layout.push((Pos(1, 1), First, Beetle));
        layout.push((Pos(2, 1), First, Beetle));
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Queen, Pos(2, 0)),
            vec![Pos(2, -1), Pos(3, -1)]
        );

        // the last free neighbour is too narrow to squeeze through
        layout.push((Pos(2, -1), First, Ant));
        let board = Board::from_layout(&layout, false);
        let queen = Pos(2, 1).from_display();
        assert_eq!(queen, Pos(2, 0));
        assert!(moves_of(&board, First, Queen, queen).is_empty());
    }

    #[test]
    fn test_spider_moves() {
        let layout = [
            (Pos(0, 0), First, Ant),
            (Pos(-1, 0), Second, Beetle),
            (Pos(1, 0), First, Spider),
            (Pos(-1, 1), Second, Queen),
            (Pos(2, 0), First, Queen),
            (Pos(-1, 2), Second, Grasshopper),
            (Pos(1, 1), First, Spider),
            (Pos(-1, 3), First, Spider),
        ];
        let board = Board::from_layout(&layout, false);
        assert!(moves_of(&board, First, Spider, Pos(1, 0)).is_empty());
        assert_eq!(
            moves_of(&board, First, Spider, Pos(1, 1)),
            vec![Pos(3, -1), Pos(0, 3)]
        );
        assert_eq!(
            moves_of(&board, First, Spider, Pos(-1, 3)),
            vec![Pos(-2, 1), Pos(2, 1)]
        );
    }

    #[test]
    fn test_grasshopper_moves() {
        let layout = [
            (Pos(0, 0), First, Ant),
            (Pos(-1, 0), Second, Beetle),
            (Pos(1, 0), First, Queen),
            (Pos(-1, 1), Second, Queen),
            (Pos(2, 0), First, Grasshopper),
            (Pos(-1, 2), Second, Grasshopper),
            (Pos(1, 1), First, Grasshopper),
            (Pos(-1, 3), Second, Grasshopper),
        ];
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Grasshopper, Pos(1, 1)),
            vec![Pos(1, -1), Pos(3, -1)]
        );
        assert_eq!(
            moves_of(&board, First, Grasshopper, Pos(2, 0)),
            vec![Pos(-2, 0), Pos(0, 2)]
        );
        assert!(moves_of(&board, Second, Grasshopper, Pos(-1, 2)).is_empty());
        assert_eq!(
            moves_of(&board, Second, Grasshopper, Pos(-1, 3)),
            vec![Pos(-1, -1)]
        );
    }

    #[test]
    fn test_ant_moves() {
        let layout = [
            (Pos(0, 0), First, Ant),
            (Pos(-1, 1), Second, Beetle),
            (Pos(1, 0), First, Queen),
            (Pos(-1, 2), Second, Queen),
            (Pos(2, 0), First, Ant),
            (Pos(-1, 3), Second, Ant),
            (Pos(1, 1), First, Ant),
            (Pos(-2, 4), Second, Ant),
            (Pos(0, 1), First, Ant),
        ];
        let board = Board::from_layout(&layout, false);

        let want = sorted(vec![
            Pos(0, -1),
            Pos(1, -1),
            Pos(2, -1),
            Pos(3, -1),
            Pos(-1, 0),
            Pos(3, 0),
            Pos(-2, 1),
            Pos(2, 1),
            Pos(-2, 2),
            Pos(0, 2),
            Pos(-2, 3),
            Pos(0, 3),
            Pos(-3, 4),
            Pos(-1, 4),
            Pos(-3, 5),
            Pos(-2, 5),
        ]);
        assert_eq!(moves_of(&board, First, Ant, Pos(1, 1)), want);

        let want = sorted(vec![
            Pos(0, -1),
            Pos(1, -1),
            Pos(2, -1),
            Pos(-1, 0),
            Pos(-2, 1),
            Pos(2, 1),
            Pos(-2, 2),
            Pos(0, 2),
            Pos(1, 2),
            Pos(-2, 3),
            Pos(0, 3),
            Pos(-3, 4),
            Pos(-1, 4),
            Pos(-3, 5),
            Pos(-2, 5),
        ]);
        assert_eq!(moves_of(&board, First, Ant, Pos(2, 0)), want);

        assert!(moves_of(&board, Second, Ant, Pos(-1, 3)).is_empty());

        let want = sorted(vec![
            Pos(0, -1),
            Pos(1, -1),
            Pos(2, -1),
            Pos(3, -1),
            Pos(-1, 0),
            Pos(3, 0),
            Pos(-2, 1),
            Pos(2, 1),
            Pos(-2, 2),
            Pos(0, 2),
            Pos(1, 2),
            Pos(-2, 3),
            Pos(0, 3),
            Pos(-1, 4),
        ]);
        assert_eq!(moves_of(&board, Second, Ant, Pos(-2, 4)), want);
    }

    #[test]
    fn test_beetle_moves() {
        let layout = [
            (Pos(0, 0), First, Beetle),
            (Pos(0, -1), Second, Ant),
            (Pos(0, 1), First, Spider),
            (Pos(1, -2), Second, Beetle),
            (Pos(1, 0), First, Beetle),
            (Pos(1, -3), Second, Queen),
            (Pos(0, 2), First, Queen),
            (Pos(2, -2), Second, Spider),
            (Pos(2, -1), First, Ant),
        ];
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Beetle, Pos(0, 0)),
            sorted(vec![Pos(0, -1), Pos(-1, 0), Pos(1, 0), Pos(-1, 1), Pos(0, 1)])
        );
        assert_eq!(
            moves_of(&board, First, Beetle, Pos(1, 0)),
            sorted(vec![Pos(2, -1), Pos(0, 0), Pos(2, 0), Pos(0, 1), Pos(1, 1)])
        );
        assert!(moves_of(&board, Second, Beetle, Pos(1, -2)).is_empty());
    }

    #[test]
    fn test_beetle_climbing_down() {
        let layout = [
            (Pos(0, 0), First, Ant),
            (Pos(1, 0), First, Queen),
            (Pos(-3, 0), First, Spider),
            (Pos(-1, 1), First, Beetle),
            (Pos(0, -1), Second, Ant),
            (Pos(-1, -1), Second, Ant),
            (Pos(0, -2), Second, Ant),
            (Pos(-2, 0), Second, Queen),
        ];
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Beetle, Pos(-1, 1)),
            vec![Pos(-1, 0), Pos(0, 0), Pos(0, 1)]
        );
    }

    #[test]
    fn test_stacked_beetle_moves() {
        let layout = [
            (Pos(0, 0), First, Queen),
            (Pos(0, 1), Second, Grasshopper),
            (Pos(0, 1), First, Beetle),
            (Pos(0, 2), Second, Queen),
        ];
        let board = Board::from_layout(&layout, false);
        assert_eq!(
            moves_of(&board, First, Beetle, Pos(0, 1)),
            vec![Pos(0, 0), Pos(1, 0), Pos(-1, 1), Pos(1, 1), Pos(-1, 2), Pos(0, 2)]
        );
    }

    #[test]
    fn test_piece_moves_ignores_pinning() {
        // (0, 1) holds the hive together, but the generator itself doesn't care
        let layout = [
            (Pos(0, 0), First, Queen),
            (Pos(0, 1), First, Ant),
            (Pos(0, 2), Second, Queen),
        ];
        let board = Board::from_layout(&layout, false);
        assert!(!board.derived().removable.contains(&Pos(0, 1)));
        assert!(moves_of(&board, First, Ant, Pos(0, 1)).is_empty());
        assert!(!board.piece_moves(Ant, Pos(0, 1)).is_empty());
    }
}
