//! World state store
//!
//! Single owner of every avatar and consumable in the match. The other
//! simulation stages borrow it for the duration of one tick and never keep
//! copies of its records; anything leaving the store (broadcasts, snapshots)
//! is cloned at the tick boundary.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Avatar, Entity, EntityKind, WorldSize};
use std::collections::BTreeMap;

pub struct World {
    size: WorldSize,
    avatars: BTreeMap<u32, Avatar>,
    entities: BTreeMap<u64, Entity>,
    next_entity_id: u64,
    rng: StdRng,
}

impl World {
    pub fn new(size: WorldSize) -> Self {
        Self::with_rng(size, StdRng::from_entropy())
    }

    /// Deterministic store for tests and replays.
    pub fn with_seed(size: WorldSize, seed: u64) -> Self {
        Self::with_rng(size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(size: WorldSize, rng: StdRng) -> Self {
        Self {
            size,
            avatars: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_entity_id: 1,
            rng,
        }
    }

    pub fn size(&self) -> WorldSize {
        self.size
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Creates the avatar for a new session at a random position with a random colour.
    pub fn spawn_avatar(&mut self, id: u32, radius: f32, wealth: Option<f32>) -> Avatar {
        let x = self.rng.gen_range(0.0..=self.size.width);
        let y = self.rng.gen_range(0.0..=self.size.height);
        let color = format!("hsl({}, 100%, 50%)", self.rng.gen_range(0..360));

        let mut avatar = Avatar::new(id, x, y, radius, color);
        avatar.wealth = wealth;

        info!("Spawned avatar {} at ({:.1}, {:.1})", id, x, y);
        self.avatars.insert(id, avatar.clone());
        avatar
    }

    /// Places an avatar as-is, replacing any avatar with the same id.
    pub fn insert_avatar(&mut self, avatar: Avatar) {
        self.avatars.insert(avatar.id, avatar);
    }

    pub fn remove_avatar(&mut self, id: u32) -> Option<Avatar> {
        self.avatars.remove(&id)
    }

    pub fn avatar(&self, id: u32) -> Option<&Avatar> {
        self.avatars.get(&id)
    }

    pub fn avatar_mut(&mut self, id: u32) -> Option<&mut Avatar> {
        self.avatars.get_mut(&id)
    }

    /// Avatars in ascending id order.
    pub fn avatars(&self) -> impl Iterator<Item = &Avatar> {
        self.avatars.values()
    }

    pub fn avatars_mut(&mut self) -> impl Iterator<Item = &mut Avatar> {
        self.avatars.values_mut()
    }

    pub fn avatar_ids(&self) -> Vec<u32> {
        self.avatars.keys().copied().collect()
    }

    pub fn avatar_count(&self) -> usize {
        self.avatars.len()
    }

    /// Adds a consumable and returns its id. Ids come from a store-scoped
    /// counter and are never reused, not even across resets.
    pub fn insert_entity(&mut self, x: f32, y: f32, radius: f32, kind: EntityKind) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let (x, y) = self.size.clamp(x, y);
        self.entities.insert(
            id,
            Entity {
                id,
                x,
                y,
                radius,
                kind,
            },
        );
        id
    }

    /// Removes and returns an entity. Only the first caller for a given id
    /// gets `Some`, which is what makes consumption single-winner.
    pub fn take_entity(&mut self, id: u64) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: u64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn harmful_count(&self) -> usize {
        self.entities
            .values()
            .filter(|entity| entity.kind.is_harmful())
            .count()
    }

    pub fn players_snapshot(&self) -> Vec<Avatar> {
        self.avatars.values().cloned().collect()
    }

    pub fn entities_snapshot(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    /// Drops every avatar and entity. Bounds and the id counter survive.
    pub fn clear(&mut self) {
        self.avatars.clear();
        self.entities.clear();
    }
}
