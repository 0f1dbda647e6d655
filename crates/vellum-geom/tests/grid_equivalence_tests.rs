// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! The broad phase is not authoritative: for any proxy set and any query,
//! the grid must return exactly what the linear scan returns.

use proptest::prelude::*;
use vellum_geom::{Aabb, BroadPhase, LinearPhase, LooseGrid, Vec2};

fn arb_aabb() -> impl Strategy<Value = Aabb> {
    (
        -1000.0f32..1000.0,
        -1000.0f32..1000.0,
        0.0f32..300.0,
        0.0f32..300.0,
    )
        .prop_map(|(x, y, w, h)| Aabb::from_corners(Vec2::new(x, y), Vec2::new(x + w, y + h)))
}

#[derive(Debug, Clone)]
enum Op {
    Upsert(u32, Aabb),
    Remove(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u32..64, arb_aabb()).prop_map(|(id, bb)| Op::Upsert(id, bb)),
        (1u32..64).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn grid_matches_linear_for_any_history(
        ops in proptest::collection::vec(arb_op(), 0..64),
        queries in proptest::collection::vec(arb_aabb(), 1..8),
        cell in 1.0f32..200.0,
    ) {
        let mut grid = LooseGrid::with_cell_size(cell);
        let mut linear = LinearPhase::new();
        for op in ops {
            match op {
                Op::Upsert(id, bb) => {
                    grid.upsert(id, bb);
                    linear.upsert(id, bb);
                }
                Op::Remove(id) => {
                    grid.remove(id);
                    linear.remove(id);
                }
            }
        }
        grid.rebuild();
        for query in &queries {
            prop_assert_eq!(grid.query_rect(query), linear.query_rect(query));
        }
    }
}
