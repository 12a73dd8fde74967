//! # Pathfinding Algorithms
//!
//! Grid A* used for player moves and NPC approach paths.
//!
//! The search moves in the 4 cardinal directions with a uniform step cost of 1.
//! The open set is a plain vector scanned left to right, so among nodes with the
//! same f-score the one inserted first wins. That makes every returned path
//! reproducible for a given grid and occupancy.

use crate::Position;
use serde::{Deserialize, Serialize};

/// Distance estimate used to guide the search.
///
/// Both variants never overestimate the true 4-directional distance, so the
/// returned path is always a shortest one; they only differ in which of several
/// equally short paths is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// Tight estimate for 4-directional movement.
    #[default]
    Manhattan,
    /// Looser estimate; favours diagonal-looking staircase paths.
    Chebyshev,
}

impl Heuristic {
    /// Estimated remaining cost from `from` to `to`.
    pub fn estimate(self, from: Position, to: Position) -> i32 {
        match self {
            Heuristic::Manhattan => from.manhattan_distance(to),
            Heuristic::Chebyshev => from.chebyshev_distance(to),
        }
    }
}

/// A* search over a bounded grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pathfinder {
    pub heuristic: Heuristic,
}

impl Pathfinder {
    /// Creates a pathfinder with the given heuristic.
    pub fn new(heuristic: Heuristic) -> Self {
        Self { heuristic }
    }

    /// Finds a path from `from` to `to` on a `width` × `height` grid.
    ///
    /// `blocked` is asked about every cell the search wants to enter; the origin is
    /// never asked about, so a mover standing on it does not block itself. The goal
    /// is asked about like any other cell, so an occupied goal is unreachable.
    ///
    /// Returns the full cell sequence from start to goal inclusive, or `None` when
    /// the open set runs dry first.
    ///
    /// # Examples
    ///
    /// ```
    /// use tactica::{Heuristic, Pathfinder, Position};
    ///
    /// let finder = Pathfinder::new(Heuristic::Manhattan);
    /// let path = finder
    ///     .find_path(10, 10, Position::new(1, 1), Position::new(4, 1), |_| false)
    ///     .unwrap();
    /// assert_eq!(path.len(), 4);
    /// assert_eq!(path[3], Position::new(4, 1));
    /// ```
    pub fn find_path<F>(
        &self,
        width: i32,
        height: i32,
        from: Position,
        to: Position,
        blocked: F,
    ) -> Option<Vec<Position>>
    where
        F: Fn(Position) -> bool,
    {
        let index = |pos: Position| -> Option<usize> {
            if pos.x < 0 || pos.y < 0 || pos.x >= width || pos.y >= height {
                None
            } else {
                usize::try_from(pos.y * width + pos.x).ok()
            }
        };

        let start = index(from)?;
        let cell_count = usize::try_from(width.checked_mul(height)?).ok()?;

        let mut g_score = vec![i32::MAX; cell_count];
        let mut f_score = vec![i32::MAX; cell_count];
        let mut came_from: Vec<Option<Position>> = vec![None; cell_count];
        let mut closed = vec![false; cell_count];

        g_score[start] = 0;
        f_score[start] = self.heuristic.estimate(from, to);

        let mut open_set = vec![from];

        while !open_set.is_empty() {
            // Strict comparison keeps the earliest inserted node among equal scores
            let mut current_index = 0;
            let mut current_f = i32::MAX;
            for (i, node) in open_set.iter().enumerate() {
                let score = index(*node).map_or(i32::MAX, |idx| f_score[idx]);
                if i == 0 || score < current_f {
                    current_index = i;
                    current_f = score;
                }
            }
            let current = open_set[current_index];

            if current == to {
                return Some(reconstruct_path(&came_from, current, index));
            }

            open_set.remove(current_index);
            let Some(current_idx) = index(current) else {
                continue;
            };
            closed[current_idx] = true;

            for neighbor in current.cardinal_adjacent_positions() {
                let Some(neighbor_idx) = index(neighbor) else {
                    continue;
                };
                if blocked(neighbor) || closed[neighbor_idx] {
                    continue;
                }

                let tentative_g = g_score[current_idx] + 1;
                if tentative_g < g_score[neighbor_idx] {
                    came_from[neighbor_idx] = Some(current);
                    g_score[neighbor_idx] = tentative_g;
                    f_score[neighbor_idx] = tentative_g + self.heuristic.estimate(neighbor, to);
                    if !open_set.contains(&neighbor) {
                        open_set.push(neighbor);
                    }
                }
            }
        }

        log::debug!(
            "No path found from ({}, {}) to ({}, {})",
            from.x,
            from.y,
            to.x,
            to.y
        );
        None
    }
}

fn reconstruct_path<I>(came_from: &[Option<Position>], goal: Position, index: I) -> Vec<Position>
where
    I: Fn(Position) -> Option<usize>,
{
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = index(current).and_then(|idx| came_from[idx]) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
