//! Spawner
//!
//! Tops the consumable population back up to the current level's target.
//! It only ever adds entities; if a level lowers the target the surplus is
//! simply eaten down over time.

use crate::config::{GameConfig, GameMode, LevelConfig};
use crate::world::World;
use rand::Rng;
use shared::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvestmentOption {
    pub name: &'static str,
    pub interest: f32,
    pub risk: f32,
    pub amount: f32,
}

impl InvestmentOption {
    pub fn kind(&self) -> EntityKind {
        EntityKind::Investment {
            name: self.name.to_string(),
            interest: self.interest,
            risk: self.risk,
            amount: self.amount,
        }
    }
}

/// Options offered in the investment mode, picked uniformly.
pub const INVESTMENT_CATALOG: [InvestmentOption; 5] = [
    InvestmentOption {
        name: "Savings",
        interest: 2.0,
        risk: 1.0,
        amount: 10.0,
    },
    InvestmentOption {
        name: "Bonds",
        interest: 5.0,
        risk: 5.0,
        amount: 10.0,
    },
    InvestmentOption {
        name: "Real Estate",
        interest: 15.0,
        risk: 15.0,
        amount: 10.0,
    },
    InvestmentOption {
        name: "Stocks",
        interest: 30.0,
        risk: 30.0,
        amount: 10.0,
    },
    InvestmentOption {
        name: "Startup",
        interest: 100.0,
        risk: 70.0,
        amount: 10.0,
    },
];

pub struct Spawner {
    mode: GameMode,
    min_radius: f32,
    max_radius: f32,
}

impl Spawner {
    pub fn new(mode: GameMode, min_radius: f32, max_radius: f32) -> Self {
        Self {
            mode,
            min_radius,
            max_radius,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.mode,
            config.entity_min_radius,
            config.entity_max_radius,
        )
    }

    /// Adds entities at uniformly random in-bounds positions until the live
    /// population reaches `level.entity_count`. Returns how many were added.
    pub fn top_up(&self, world: &mut World, level: &LevelConfig) -> usize {
        let bounds = world.size();
        let mut harmful = world.harmful_count();
        let mut added = 0;

        while world.entity_count() < level.entity_count {
            let kind = match self.mode {
                GameMode::Food => {
                    let poisonous = harmful < level.harmful_count;
                    if poisonous {
                        harmful += 1;
                    }
                    EntityKind::Food { poisonous }
                }
                GameMode::Investment => {
                    let index = world.rng_mut().gen_range(0..INVESTMENT_CATALOG.len());
                    INVESTMENT_CATALOG[index].kind()
                }
            };

            let rng = world.rng_mut();
            let x = rng.gen_range(0.0..=bounds.width);
            let y = rng.gen_range(0.0..=bounds.height);
            let radius = rng.gen_range(self.min_radius..self.max_radius);

            world.insert_entity(x, y, radius, kind);
            added += 1;
        }

        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::WorldSize;

    fn level(entity_count: usize, harmful_count: usize) -> LevelConfig {
        LevelConfig {
            duration_secs: 60,
            entity_count,
            harmful_count,
        }
    }

    fn world() -> World {
        World::with_seed(WorldSize::new(3000.0, 3000.0), 3)
    }

    #[test]
    fn test_top_up_reaches_target() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Food, 5.0, 15.0);

        let added = spawner.top_up(&mut world, &level(300, 125));

        assert_eq!(added, 300);
        assert_eq!(world.entity_count(), 300);
        assert_eq!(world.harmful_count(), 125);
    }

    #[test]
    fn test_entities_within_bounds_and_radius_range() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Food, 5.0, 15.0);
        spawner.top_up(&mut world, &level(200, 0));

        for entity in world.entities() {
            assert!(world.size().contains(entity.x, entity.y));
            assert!(entity.radius >= 5.0 && entity.radius < 15.0);
        }
    }

    #[test]
    fn test_top_up_only_replaces_missing() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Food, 5.0, 15.0);
        spawner.top_up(&mut world, &level(50, 10));

        let ids: Vec<u64> = world.entities().take(5).map(|e| e.id).collect();
        for id in ids {
            world.take_entity(id);
        }

        assert_eq!(spawner.top_up(&mut world, &level(50, 10)), 5);
        assert_eq!(world.entity_count(), 50);
        assert_eq!(spawner.top_up(&mut world, &level(50, 10)), 0);
    }

    #[test]
    fn test_harmful_quota_refills_harmful_first() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Food, 5.0, 15.0);
        spawner.top_up(&mut world, &level(20, 5));

        let harmful_id = world
            .entities()
            .find(|e| e.kind.is_harmful())
            .map(|e| e.id)
            .unwrap();
        world.take_entity(harmful_id);

        spawner.top_up(&mut world, &level(20, 5));
        assert_eq!(world.harmful_count(), 5);
    }

    #[test]
    fn test_lower_target_never_removes() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Food, 5.0, 15.0);
        spawner.top_up(&mut world, &level(40, 0));

        assert_eq!(spawner.top_up(&mut world, &level(10, 0)), 0);
        assert_eq!(world.entity_count(), 40);
    }

    #[test]
    fn test_investment_mode_uses_catalog() {
        let mut world = world();
        let spawner = Spawner::new(GameMode::Investment, 5.0, 15.0);
        spawner.top_up(&mut world, &level(100, 30));

        assert_eq!(world.harmful_count(), 0);
        for entity in world.entities() {
            match &entity.kind {
                EntityKind::Investment { name, .. } => {
                    assert!(INVESTMENT_CATALOG.iter().any(|o| o.name == name.as_str()));
                }
                other => panic!("Unexpected kind {:?}", other),
            }
        }
    }
}
