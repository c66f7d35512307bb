//! Hive connectivity: which occupied positions can give up their top piece
//! without splitting the hive in two.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::{Board, Pos};

const UNVISITED: usize = usize::MAX;

// low-link articulation point search over a graph of small node ids
struct Articulation {
    adjacency: Vec<Vec<usize>>,
    t_in: Vec<usize>,
    t_low: Vec<usize>,
    timer: usize,
    points: Vec<bool>,
}

impl Articulation {
    fn new(adjacency: Vec<Vec<usize>>) -> Self {
        let n = adjacency.len();
        Articulation {
            adjacency,
            t_in: vec![UNVISITED; n],
            t_low: vec![UNVISITED; n],
            timer: 0,
            points: vec![false; n],
        }
    }

    fn run(mut self, root: usize) -> Vec<bool> {
        if self.adjacency.len() > 1 {
            self.dfs(root, None);
        }
        self.points
    }

    fn dfs(&mut self, node: usize, parent: Option<usize>) {
        self.t_in[node] = self.timer;
        self.t_low[node] = self.timer;
        self.timer += 1;

        let mut children = 0;
        for i in 0..self.adjacency[node].len() {
            let next = self.adjacency[node][i];
            if Some(next) == parent {
                continue;
            }
            if self.t_in[next] != UNVISITED {
                // back edge
                self.t_low[node] = self.t_low[node].min(self.t_in[next]);
                continue;
            }

            self.dfs(next, Some(node));
            self.t_low[node] = self.t_low[node].min(self.t_low[next]);
            if parent.is_some() && self.t_low[next] >= self.t_in[node] {
                self.points[node] = true;
            }
            children += 1;
        }

        if parent.is_none() && children > 1 {
            self.points[node] = true;
        }
    }
}

impl Board {
    /// Positions whose top piece can be lifted without disconnecting the hive.
    pub fn removable_positions(&self) -> FxHashSet<Pos> {
        self.removable_positions_from(None)
    }

    /// Same as `removable_positions`, starting the search at `root` when it is
    /// occupied.
    pub fn removable_positions_from(&self, root: Option<Pos>) -> FxHashSet<Pos> {
        let positions = self.occupied_positions();
        if positions.len() <= 1 {
            return FxHashSet::default();
        }

        let ids: FxHashMap<Pos, usize> = positions
            .iter()
            .enumerate()
            .map(|(id, &pos)| (pos, id))
            .collect();
        let adjacency: Vec<Vec<usize>> = positions
            .iter()
            .map(|pos| pos.neighbours().filter_map(|n| ids.get(&n).copied()).collect())
            .collect();

        let root = root.and_then(|p| ids.get(&p).copied()).unwrap_or(0);
        let points = Articulation::new(adjacency).run(root);
        trace!(
            "articulation points: {:?}",
            positions
                .iter()
                .zip(points.iter())
                .filter(|(_, is_point)| **is_point)
                .map(|(pos, _)| *pos)
                .collect::<Vec<_>>()
        );

        positions
            .iter()
            .zip(points)
            .filter(|&(&pos, is_point)| !is_point || self.count_at(pos) > 1)
            .map(|(&pos, _)| pos)
            .collect()
    }
}
