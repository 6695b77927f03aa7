//! Collision resolver
//!
//! Detects avatar-vs-entity and avatar-vs-avatar overlap and applies the
//! consumption and absorption rules. Overlap is `distance < max(r1, r2)`:
//! the smaller circle's centre has to be inside the larger circle.
//!
//! Everything here runs inside the tick that owns the [`World`], so the
//! first avatar processed for a given entity wins it and later claims find
//! it gone. Stale references (entity already eaten, avatar no longer
//! present) are skipped without producing an event.

use crate::config::GameConfig;
use crate::world::World;
use log::debug;
use rand::Rng;
use shared::{combine_radii, investment_payoff, Avatar, ConsumeOutcome, Entity, EntityKind};
use std::collections::HashSet;

/// Thresholds and factors the resolver applies, lifted out of [`GameConfig`].
#[derive(Debug, Clone, Copy)]
pub struct CollisionRules {
    pub absorption_ratio: f32,
    pub harmful_shrink_factor: f32,
    pub claim_bite_ratio: f32,
    pub min_radius: f32,
    pub min_wealth: f32,
}

impl From<&GameConfig> for CollisionRules {
    fn from(config: &GameConfig) -> Self {
        Self {
            absorption_ratio: config.absorption_ratio,
            harmful_shrink_factor: config.harmful_shrink_factor,
            claim_bite_ratio: config.claim_bite_ratio,
            min_radius: config.min_radius,
            min_wealth: config.min_wealth,
        }
    }
}

impl CollisionRules {
    /// An avatar stays in the match while both radius and wealth are above their floors.
    pub fn is_viable(&self, avatar: &Avatar) -> bool {
        avatar.radius > self.min_radius && avatar.wealth.map_or(true, |w| w > self.min_wealth)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    EntityConsumed {
        player_id: u32,
        entity_id: u64,
        new_radius: f32,
        outcome: ConsumeOutcome,
    },
    PlayerEaten {
        eater_id: u32,
        eaten_id: u32,
        new_radius: f32,
    },
    /// The avatar dropped to or below a viability floor and was removed.
    Eliminated { player_id: u32 },
}

/// A client's request to consume an entity, honoured only after re-validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeClaim {
    pub player_id: u32,
    pub entity_id: u64,
}

pub fn can_consume(avatar: &Avatar, entity: &Entity) -> bool {
    avatar.radius > entity.radius && avatar.overlaps(entity.x, entity.y, entity.radius)
}

pub fn can_absorb(attacker: &Avatar, defender: &Avatar, ratio: f32) -> bool {
    attacker.radius > defender.radius * ratio
        && attacker.overlaps(defender.x, defender.y, defender.radius)
}

/// Server-driven detection: every avatar, in id order, eats everything it overlaps.
pub fn resolve_entities(world: &mut World, rules: &CollisionRules) -> Vec<CollisionEvent> {
    let mut events = Vec::new();

    for player_id in world.avatar_ids() {
        let candidates: Vec<u64> = match world.avatar(player_id) {
            Some(avatar) => world
                .entities()
                .filter(|entity| can_consume(avatar, entity))
                .map(|entity| entity.id)
                .collect(),
            None => continue,
        };

        for entity_id in candidates {
            consume(world, player_id, entity_id, rules, 1.0, &mut events);
        }
    }

    events
}

/// Re-validates client claims in arrival order against the current world.
pub fn resolve_claims(
    world: &mut World,
    claims: &[ConsumeClaim],
    rules: &CollisionRules,
) -> Vec<CollisionEvent> {
    let mut events = Vec::new();
    for claim in claims {
        consume(
            world,
            claim.player_id,
            claim.entity_id,
            rules,
            rules.claim_bite_ratio,
            &mut events,
        );
    }
    events
}

/// Pairwise absorption. Pairs are visited in ascending id order and an
/// avatar absorbed earlier in the pass takes no further part in it.
pub fn resolve_avatars(world: &mut World, rules: &CollisionRules) -> Vec<CollisionEvent> {
    let ids = world.avatar_ids();
    let mut absorbed: HashSet<u32> = HashSet::new();
    let mut events = Vec::new();

    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if absorbed.contains(&ids[i]) || absorbed.contains(&ids[j]) {
                continue;
            }

            let (eater_id, eaten_id) = match (world.avatar(ids[i]), world.avatar(ids[j])) {
                (Some(a), Some(b)) => {
                    let (larger, smaller) = if a.radius >= b.radius { (a, b) } else { (b, a) };
                    if !can_absorb(larger, smaller, rules.absorption_ratio) {
                        continue;
                    }
                    (larger.id, smaller.id)
                }
                _ => continue,
            };

            let Some(eaten) = world.remove_avatar(eaten_id) else {
                continue;
            };
            absorbed.insert(eaten_id);

            if let Some(eater) = world.avatar_mut(eater_id) {
                eater.radius = combine_radii(eater.radius, eaten.radius);
                if let (Some(wealth), Some(gained)) = (eater.wealth.as_mut(), eaten.wealth) {
                    *wealth += gained.max(0.0);
                }
                debug!(
                    "Avatar {} absorbed avatar {} (new radius {:.2})",
                    eater_id, eaten_id, eater.radius
                );
                events.push(CollisionEvent::PlayerEaten {
                    eater_id,
                    eaten_id,
                    new_radius: eater.radius,
                });
            }
        }
    }

    events
}

fn consume(
    world: &mut World,
    player_id: u32,
    entity_id: u64,
    rules: &CollisionRules,
    bite_ratio: f32,
    events: &mut Vec<CollisionEvent>,
) {
    let valid = match (world.avatar(player_id), world.entity(entity_id)) {
        (Some(avatar), Some(entity)) => {
            can_consume(avatar, entity) && avatar.radius * bite_ratio > entity.radius
        }
        _ => false,
    };
    if !valid {
        debug!(
            "Ignoring consumption of entity {} by avatar {}",
            entity_id, player_id
        );
        return;
    }

    let Some(entity) = world.take_entity(entity_id) else {
        return;
    };
    let roll = match entity.kind {
        EntityKind::Investment { .. } => world.rng_mut().gen_range(0.0..100.0),
        EntityKind::Food { .. } => 0.0,
    };

    let Some(avatar) = world.avatar_mut(player_id) else {
        return;
    };
    let outcome = apply_effect(avatar, &entity, rules, roll);
    let new_radius = avatar.radius;
    let viable = rules.is_viable(avatar);

    events.push(CollisionEvent::EntityConsumed {
        player_id,
        entity_id,
        new_radius,
        outcome,
    });

    if !viable {
        world.remove_avatar(player_id);
        events.push(CollisionEvent::Eliminated { player_id });
    }
}

/// Applies the payoff of `entity` to `avatar`. `roll` is only read for investments.
pub fn apply_effect(
    avatar: &mut Avatar,
    entity: &Entity,
    rules: &CollisionRules,
    roll: f32,
) -> ConsumeOutcome {
    match &entity.kind {
        EntityKind::Food { poisonous: false } => {
            avatar.radius = combine_radii(avatar.radius, entity.radius);
            ConsumeOutcome::Grew
        }
        EntityKind::Food { poisonous: true } => {
            avatar.radius *= rules.harmful_shrink_factor;
            ConsumeOutcome::Shrank
        }
        EntityKind::Investment {
            interest,
            risk,
            amount,
            ..
        } => {
            let payoff = investment_payoff(*amount, *interest, *risk, roll);
            let delta = payoff - amount;
            avatar.radius += delta;
            if let Some(wealth) = avatar.wealth.as_mut() {
                *wealth += delta;
            }
            ConsumeOutcome::Invested {
                roll,
                payoff,
                delta,
            }
        }
    }
}
