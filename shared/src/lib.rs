use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
/// Largest payload that fits in a single UDP datagram.
pub const MAX_PACKET_SIZE: usize = 65_507;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    UpdatePosition {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    },
    ConsumeEntity {
        entity_id: u64,
    },
    /// Sent by a client to request a reset, and broadcast by the server once the reset happened.
    RestartGame,
    Disconnect,

    Connected {
        client_id: u32,
    },
    Disconnected {
        reason: String,
    },
    InitGame {
        player_id: u32,
        players: Vec<Avatar>,
        entities: Vec<Entity>,
        world_size: WorldSize,
        level_index: u32,
        seconds_remaining: u32,
    },
    NewPlayer {
        avatar: Avatar,
    },
    UpdatePlayers {
        players: Vec<Avatar>,
    },
    UpdateEntities {
        entities: Vec<Entity>,
    },
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
    GameOver,
    PlayerDisconnected {
        player_id: u32,
    },
    UpdateTimer {
        seconds_remaining: u32,
    },
    LevelUp {
        new_level_index: u32,
    },
}

/// Legal position range for everything in the world: `[0, width] x [0, height]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WorldSize {
    pub width: f32,
    pub height: f32,
}

impl WorldSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}

/// Latest direction flags reported by a client.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionInput {
    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }

    /// Per-axis displacement for one tick. Flags are summed without
    /// normalisation, so a diagonal covers `speed` on both axes.
    pub fn delta(&self, speed: f32) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.up {
            dy -= speed;
        }
        if self.down {
            dy += speed;
        }
        if self.left {
            dx -= speed;
        }
        if self.right {
            dx += speed;
        }
        (dx, dy)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Avatar {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
    /// Only present in the investment game mode.
    pub wealth: Option<f32>,
}

impl Avatar {
    pub fn new(id: u32, x: f32, y: f32, radius: f32, color: String) -> Self {
        Self {
            id,
            x,
            y,
            radius,
            color,
            wealth: None,
        }
    }

    pub fn with_wealth(mut self, wealth: f32) -> Self {
        self.wealth = Some(wealth);
        self
    }

    pub fn overlaps(&self, x: f32, y: f32, radius: f32) -> bool {
        overlaps(self.x, self.y, self.radius, x, y, radius)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum EntityKind {
    Food {
        poisonous: bool,
    },
    Investment {
        name: String,
        /// Percentage gained on success.
        interest: f32,
        /// Percentage lost on failure, also the failure probability in percent.
        risk: f32,
        amount: f32,
    },
}

impl EntityKind {
    pub fn is_harmful(&self) -> bool {
        matches!(self, EntityKind::Food { poisonous: true })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Entity {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub kind: EntityKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum ConsumeOutcome {
    Grew,
    Shrank,
    Invested { roll: f32, payoff: f32, delta: f32 },
}

pub fn distance(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

/// Circles overlap when the distance between centres is below the LARGER
/// radius: the smaller centre has to be inside the bigger circle, touching
/// edges is not enough.
pub fn overlaps(x1: f32, y1: f32, r1: f32, x2: f32, y2: f32, r2: f32) -> bool {
    distance(x1, y1, x2, y2) < r1.max(r2)
}

/// Radius of a circle whose area is the sum of both areas.
pub fn combine_radii(r1: f32, r2: f32) -> f32 {
    (r1 * r1 + r2 * r2).sqrt()
}

/// Payoff of an investment given a uniform roll in `[0, 100)`.
/// A roll above `risk` pays interest, anything else loses `risk` percent.
pub fn investment_payoff(amount: f32, interest: f32, risk: f32, roll: f32) -> f32 {
    if roll > risk {
        amount * (1.0 + interest / 100.0)
    } else {
        amount * (1.0 - risk / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_overlap_uses_larger_radius() {
        // Edges touch (distance 25 < 20 + 10) but the small centre is outside.
        assert!(!overlaps(0.0, 0.0, 20.0, 25.0, 0.0, 10.0));
        assert!(overlaps(0.0, 0.0, 20.0, 19.0, 0.0, 10.0));
        assert!(overlaps(19.0, 0.0, 10.0, 0.0, 0.0, 20.0));
    }

    #[test]
    fn test_overlap_exact_radius_is_not_overlap() {
        assert!(!overlaps(0.0, 0.0, 20.0, 20.0, 0.0, 5.0));
    }

    #[test]
    fn test_combine_radii() {
        assert_approx_eq!(combine_radii(20.0, 10.0), 500.0_f32.sqrt(), 0.0001);
        assert_approx_eq!(combine_radii(30.0, 25.0), 39.051, 0.001);
        assert_approx_eq!(combine_radii(3.0, 4.0), 5.0, 0.0001);
    }

    #[test]
    fn test_investment_payoff_success() {
        let payoff = investment_payoff(10.0, 20.0, 30.0, 75.0);
        assert_approx_eq!(payoff, 12.0, 0.0001);
    }

    #[test]
    fn test_investment_payoff_failure() {
        let payoff = investment_payoff(10.0, 20.0, 30.0, 30.0);
        assert_approx_eq!(payoff, 7.0, 0.0001);
    }

    #[test]
    fn test_world_clamp() {
        let world = WorldSize::new(3000.0, 3000.0);
        assert_eq!(world.clamp(-5.0, 10.0), (0.0, 10.0));
        assert_eq!(world.clamp(3005.0, 3000.5), (3000.0, 3000.0));
        assert!(world.contains(3000.0, 0.0));
        assert!(!world.contains(-0.1, 0.0));
    }

    #[test]
    fn test_direction_delta() {
        let idle = DirectionInput::default();
        assert!(idle.is_idle());
        assert_eq!(idle.delta(5.0), (0.0, 0.0));

        let diagonal = DirectionInput {
            up: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(diagonal.delta(5.0), (5.0, -5.0));

        let cancelled = DirectionInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert!(!cancelled.is_idle());
        assert_eq!(cancelled.delta(5.0), (0.0, 0.0));
    }

    #[test]
    fn test_harmful_kind() {
        assert!(EntityKind::Food { poisonous: true }.is_harmful());
        assert!(!EntityKind::Food { poisonous: false }.is_harmful());
        let option = EntityKind::Investment {
            name: "Bonds".to_string(),
            interest: 4.0,
            risk: 5.0,
            amount: 10.0,
        };
        assert!(!option.is_harmful());
    }

    #[test]
    fn test_packet_serialization_init_game() {
        let packet = Packet::InitGame {
            player_id: 7,
            players: vec![Avatar::new(7, 100.0, 200.0, 20.0, "hsl(10, 100%, 50%)".into())],
            entities: vec![Entity {
                id: 1,
                x: 5.0,
                y: 6.0,
                radius: 8.0,
                kind: EntityKind::Food { poisonous: false },
            }],
            world_size: WorldSize::new(3000.0, 3000.0),
            level_index: 0,
            seconds_remaining: 60,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::InitGame {
                player_id,
                players,
                entities,
                world_size,
                seconds_remaining,
                ..
            } => {
                assert_eq!(player_id, 7);
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].radius, 20.0);
                assert_eq!(entities[0].kind, EntityKind::Food { poisonous: false });
                assert_eq!(world_size, WorldSize::new(3000.0, 3000.0));
                assert_eq!(seconds_remaining, 60);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_update_position() {
        let packet = Packet::UpdatePosition {
            up: false,
            down: true,
            left: false,
            right: true,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::UpdatePosition {
                up,
                down,
                left,
                right,
            } => {
                assert!(!up);
                assert!(down);
                assert!(!left);
                assert!(right);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
