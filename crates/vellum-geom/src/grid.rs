// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::{Aabb, Vec2};
use std::collections::BTreeMap;

/// Broad-phase interface for inserting proxies and querying a world rect.
///
/// Implementations must return candidates deterministically: the id list is
/// sorted ascending and deduplicated. The broad phase is not authoritative —
/// callers refine candidates against exact geometry, and [`LinearPhase`]
/// must give the same answer for any sequence of operations.
pub trait BroadPhase {
    /// Inserts or updates the proxy with the given `id` and `aabb`.
    fn upsert(&mut self, id: u32, aabb: Aabb);
    /// Removes a proxy if present.
    fn remove(&mut self, id: u32);
    /// Drops all proxies.
    fn clear(&mut self);
    /// Returns a canonical, ascending-sorted list of ids whose AABB overlaps
    /// `rect` (inclusive on edges).
    fn query_rect(&self, rect: &Aabb) -> Vec<u32>;
}

/// Reference broad phase: a `BTreeMap` scanned linearly.
///
/// Serves as the correctness baseline the grid is tested against, and as the
/// fallback when the proxy count is too small for bucketing to pay off.
#[derive(Debug, Default)]
pub struct LinearPhase {
    items: BTreeMap<u32, Aabb>,
}

impl LinearPhase {
    /// Creates an empty phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for LinearPhase {
    fn upsert(&mut self, id: u32, aabb: Aabb) {
        self.items.insert(id, aabb);
    }

    fn remove(&mut self, id: u32) {
        self.items.remove(&id);
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn query_rect(&self, rect: &Aabb) -> Vec<u32> {
        // BTreeMap iteration is already ascending by id.
        self.items
            .iter()
            .filter(|(_, bb)| bb.overlaps(rect))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Loose uniform grid over entity AABBs.
///
/// Each proxy is registered in every cell its (slightly inflated) AABB
/// touches; oversized proxies that span more than [`MAX_CELL_SPAN`] cells on
/// either axis go to an overflow list scanned on every query. Cell
/// membership is rebuilt wholesale via [`LooseGrid::rebuild`], which is how
/// the engine uses it: the grid is a lazily refreshed cache, not an
/// incrementally maintained structure.
#[derive(Debug)]
pub struct LooseGrid {
    cell_size: f32,
    cells: BTreeMap<(i32, i32), Vec<u32>>,
    oversized: Vec<(u32, Aabb)>,
    items: BTreeMap<u32, Aabb>,
}

/// Upper bound on cells a proxy may occupy per axis before it is treated as
/// oversized.
const MAX_CELL_SPAN: i32 = 64;

/// Default cell size in world units.
const DEFAULT_CELL_SIZE: f32 = 64.0;

impl Default for LooseGrid {
    fn default() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE)
    }
}

impl LooseGrid {
    /// Creates an empty grid with the given cell size.
    ///
    /// Non-finite or non-positive sizes fall back to the default.
    #[must_use]
    pub fn with_cell_size(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: BTreeMap::new(),
            oversized: Vec::new(),
            items: BTreeMap::new(),
        }
    }

    fn cell_range(&self, bb: &Aabb) -> (i32, i32, i32, i32) {
        let inv = 1.0 / self.cell_size;
        let x0 = libm::floorf(bb.min().x * inv) as i32;
        let y0 = libm::floorf(bb.min().y * inv) as i32;
        let x1 = libm::floorf(bb.max().x * inv) as i32;
        let y1 = libm::floorf(bb.max().y * inv) as i32;
        (x0, y0, x1, y1)
    }

    /// Rebuilds cell membership from scratch for the current proxy set.
    pub fn rebuild(&mut self) {
        self.cells.clear();
        self.oversized.clear();
        let entries: Vec<(u32, Aabb)> = self.items.iter().map(|(id, bb)| (*id, *bb)).collect();
        for (id, bb) in entries {
            let (x0, y0, x1, y1) = self.cell_range(&bb);
            if x1 - x0 >= MAX_CELL_SPAN || y1 - y0 >= MAX_CELL_SPAN {
                self.oversized.push((id, bb));
                continue;
            }
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    self.cells.entry((cx, cy)).or_default().push(id);
                }
            }
        }
    }
}

impl BroadPhase for LooseGrid {
    fn upsert(&mut self, id: u32, aabb: Aabb) {
        self.items.insert(id, aabb);
    }

    fn remove(&mut self, id: u32) {
        self.items.remove(&id);
    }

    fn clear(&mut self) {
        self.items.clear();
        self.cells.clear();
        self.oversized.clear();
    }

    fn query_rect(&self, rect: &Aabb) -> Vec<u32> {
        let mut out: Vec<u32> = Vec::new();
        let (x0, y0, x1, y1) = self.cell_range(rect);
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(ids) = self.cells.get(&(cx, cy)) {
                    out.extend_from_slice(ids);
                }
            }
        }
        for (id, _) in &self.oversized {
            out.push(*id);
        }
        out.sort_unstable();
        out.dedup();
        // Cell membership is conservative; confirm against the stored AABB.
        out.retain(|id| self.items.get(id).is_some_and(|bb| bb.overlaps(rect)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(x0: f32, y0: f32, x1: f32, y1: f32) -> Aabb {
        Aabb::from_corners(Vec2::new(x0, y0), Vec2::new(x1, y1))
    }

    #[test]
    fn grid_matches_linear_after_rebuild() {
        let mut grid = LooseGrid::default();
        let mut linear = LinearPhase::new();
        let boxes = [
            (1, bb(0.0, 0.0, 10.0, 10.0)),
            (2, bb(100.0, 100.0, 110.0, 120.0)),
            (3, bb(-50.0, -50.0, 50.0, 50.0)),
            (4, bb(63.0, 63.0, 65.0, 65.0)),
        ];
        for (id, b) in boxes {
            grid.upsert(id, b);
            linear.upsert(id, b);
        }
        grid.rebuild();
        for query in [bb(0.0, 0.0, 1.0, 1.0), bb(-100.0, -100.0, 200.0, 200.0), bb(64.0, 64.0, 64.0, 64.0)] {
            assert_eq!(grid.query_rect(&query), linear.query_rect(&query));
        }
    }

    #[test]
    fn oversized_proxy_still_found() {
        let mut grid = LooseGrid::with_cell_size(1.0);
        grid.upsert(7, bb(-1000.0, -1000.0, 1000.0, 1000.0));
        grid.rebuild();
        assert_eq!(grid.query_rect(&bb(0.0, 0.0, 0.5, 0.5)), vec![7]);
    }

    #[test]
    fn remove_before_rebuild_excludes_proxy() {
        let mut grid = LooseGrid::default();
        grid.upsert(1, bb(0.0, 0.0, 1.0, 1.0));
        grid.remove(1);
        grid.rebuild();
        assert!(grid.query_rect(&bb(0.0, 0.0, 2.0, 2.0)).is_empty());
    }
}
