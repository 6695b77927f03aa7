//! Authoritative match state
//!
//! Bundles the world store with the stages that mutate it and exposes one
//! entry point per scheduled driver: [`GameState::step`] for the simulation
//! tick, [`GameState::spawn_cycle`] for the replenishment interval and
//! [`GameState::advance_timer`] for the one-second clock.

use crate::collision::{self, CollisionEvent, CollisionRules, ConsumeClaim};
use crate::config::{ConsumptionPolicy, GameConfig, GameMode};
use crate::movement;
use crate::spawner::Spawner;
use crate::timer::{MatchTimer, TimerEvent};
use crate::world::World;
use log::info;
use shared::{Avatar, DirectionInput};
use std::collections::HashMap;

/// What one simulation tick changed, for the broadcast step.
#[derive(Debug, Default)]
pub struct TickReport {
    pub events: Vec<CollisionEvent>,
    /// Entities were consumed and replenished during the tick.
    pub entities_changed: bool,
}

pub struct GameState {
    pub tick: u32,
    config: GameConfig,
    rules: CollisionRules,
    world: World,
    spawner: Spawner,
    timer: MatchTimer,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        let world = World::new(config.world_size());
        Self::with_world(config, world)
    }

    /// Builds the match around an existing store and fills it to the first
    /// level's population.
    pub fn with_world(config: GameConfig, world: World) -> Self {
        let mut state = Self {
            tick: 0,
            rules: CollisionRules::from(&config),
            spawner: Spawner::from_config(&config),
            timer: MatchTimer::new(&config.levels),
            config,
            world,
        };
        state.spawn_cycle();
        state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn timer(&self) -> &MatchTimer {
        &self.timer
    }

    pub fn add_player(&mut self, client_id: u32) -> Avatar {
        let wealth = match self.config.mode {
            GameMode::Investment => Some(self.config.start_wealth),
            GameMode::Food => None,
        };
        self.world
            .spawn_avatar(client_id, self.config.start_radius, wealth)
    }

    pub fn remove_player(&mut self, client_id: u32) -> bool {
        let removed = self.world.remove_avatar(client_id).is_some();
        if removed {
            info!("Removed player {}", client_id);
        }
        removed
    }

    /// Starts the match once enough sessions are connected.
    pub fn try_start(&mut self, session_count: usize) -> bool {
        session_count >= self.config.min_players_to_start && self.timer.start()
    }

    /// Movement, then entity consumption, then absorption. Collision sees the
    /// positions this tick's movement produced. The simulation is frozen once
    /// the match has ended.
    pub fn step(
        &mut self,
        inputs: &HashMap<u32, DirectionInput>,
        claims: &[ConsumeClaim],
    ) -> TickReport {
        self.tick = self.tick.wrapping_add(1);
        let mut report = TickReport::default();
        if self.timer.is_ended() {
            return report;
        }

        movement::integrate(&mut self.world, inputs, self.config.avatar_speed);

        let consumed = match self.config.policy {
            ConsumptionPolicy::Server => collision::resolve_entities(&mut self.world, &self.rules),
            ConsumptionPolicy::ClientClaim => {
                collision::resolve_claims(&mut self.world, claims, &self.rules)
            }
        };
        report.entities_changed = consumed
            .iter()
            .any(|event| matches!(event, CollisionEvent::EntityConsumed { .. }));
        report.events = consumed;
        report
            .events
            .extend(collision::resolve_avatars(&mut self.world, &self.rules));

        if report.entities_changed {
            self.spawn_cycle();
        }

        report
    }

    /// Replenishes consumables for the current level. Returns how many were added.
    pub fn spawn_cycle(&mut self) -> usize {
        if self.timer.is_ended() {
            return 0;
        }
        let level = self.config.level(self.timer.level_index());
        self.spawner.top_up(&mut self.world, level)
    }

    pub fn advance_timer(&mut self) -> Vec<TimerEvent> {
        self.timer.advance_second()
    }

    /// Re-initialises the store for a new match: every connected session gets
    /// a fresh avatar, entities are respawned and the timer returns to idle.
    pub fn restart(&mut self, session_ids: &[u32]) {
        info!("Restarting match with {} sessions", session_ids.len());
        self.world.clear();
        self.timer.reset();
        for &id in session_ids {
            self.add_player(id);
        }
        self.spawn_cycle();
    }
}
