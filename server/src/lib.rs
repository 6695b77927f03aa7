//! # Arena Server Library
//!
//! Authoritative server for a real-time multiplayer arena in which circular
//! avatars roam a bounded 2D world, eat scattered entities to grow and absorb
//! smaller avatars. The server owns the canonical world, applies client
//! intents at fixed tick boundaries and broadcasts the results.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send direction flags, consumption claims and restart
//! requests. Positions, radii, wealth and entity ownership are decided here.
//!
//! ### Match Progression
//! A match runs through a fixed list of levels, each with a duration and a
//! target entity population. The timer starts once enough sessions are
//! connected and the match ends when the last level's clock runs out.
//!
//! ### State Broadcasting
//! Avatars are broadcast every tick. The entity list is broadcast on every
//! replenishment cycle and whenever a consumption changed it. Consumptions,
//! absorptions and timer changes are announced as discrete events.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! One task owns the [`game::GameState`] and serialises every mutation:
//! packet handling, the simulation tick, the spawn interval and the
//! one-second match clock all run in the same `select!` loop.
//!
//! ### UDP-Based Communication
//! Packets are [`shared::Packet`] values encoded with bincode, one per
//! datagram. Sessions that stay silent for five seconds are dropped.
//!
//! ## Module Organization
//!
//! - `config`: gameplay tunables, defaults and TOML loading
//! - `world`: the world state store (avatars, entities, id allocation)
//! - `movement`: direction flags to clamped positions
//! - `collision`: entity consumption and avatar absorption
//! - `spawner`: replenishes entities to the level target
//! - `timer`: `Idle -> Running -> Ended` level clock
//! - `game`: ties the stages together in tick order
//! - `client_manager`: sessions, latest inputs and queued claims
//! - `network`: sockets, tasks and protocol dispatch
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::{BoxError, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BoxError> {
//!     let mut server = Server::new("127.0.0.1:8080", GameConfig::default(), 32).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod collision;
pub mod config;
pub mod game;
pub mod movement;
pub mod network;
pub mod spawner;
pub mod timer;
pub mod world;
