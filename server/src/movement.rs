//! Movement integrator
//!
//! Applies each avatar's most recent direction flags once per simulation
//! tick. Inputs are a latest-known snapshot per session, not a queue: an
//! avatar moves exactly one step per tick no matter how many updates its
//! client sent in between.

use crate::world::World;
use shared::DirectionInput;
use std::collections::HashMap;

/// Moves every avatar with a pending direction and clamps it into the world.
/// Returns how many avatars were moved.
pub fn integrate(world: &mut World, inputs: &HashMap<u32, DirectionInput>, speed: f32) -> usize {
    let bounds = world.size();
    let mut moved = 0;

    for avatar in world.avatars_mut() {
        let Some(input) = inputs.get(&avatar.id) else {
            continue;
        };
        if input.is_idle() {
            continue;
        }

        let (dx, dy) = input.delta(speed);
        let (x, y) = bounds.clamp(avatar.x + dx, avatar.y + dy);
        avatar.x = x;
        avatar.y = y;
        moved += 1;
    }

    moved
}
