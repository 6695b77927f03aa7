//! Session management and input intake for the arena server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Session lifecycle (connect, disconnect, timeout)
//! - The latest direction flags per session (last write wins)
//! - Consumption claims queued until the next simulation tick
//! - Capacity limits and address tracking
//!
//! Nothing here touches the world. Packet handlers only record intent and
//! the tick applies it.

use crate::collision::ConsumeClaim;
use log::info;
use shared::DirectionInput;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Sessions silent for longer than this are treated as disconnected.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected session
#[derive(Debug)]
pub struct Client {
    /// Session identifier, also the id of the session's avatar
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Most recent direction flags; replaced, never accumulated
    pub latest_input: DirectionInput,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            latest_input: DirectionInput::default(),
        }
    }

    /// Replaces the stored input with the newest one and marks the client as active.
    pub fn set_input(&mut self, input: DirectionInput) {
        self.last_seen = Instant::now();
        self.latest_input = input;
    }

    /// Returns true if no packets have been received within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Tracks every connected session and the intents they sent since the last tick
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Claims in arrival order, drained by the simulation tick
    pending_claims: Vec<ConsumeClaim>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            pending_claims: Vec::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new session. Returns `None` when the server is full.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, Client::new(client_id, addr));

        Some(client_id)
    }

    /// Removes a session and its queued claims. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            self.pending_claims
                .retain(|claim| claim.player_id != *client_id);
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Stores the latest direction flags for a session. Returns false for unknown sessions.
    pub fn set_input(&mut self, client_id: u32, input: DirectionInput) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.set_input(input);
            true
        } else {
            false
        }
    }

    /// Queues a consumption claim for the next tick. Returns false for unknown sessions.
    pub fn add_claim(&mut self, client_id: u32, entity_id: u64) -> bool {
        if !self.clients.contains_key(&client_id) {
            return false;
        }
        self.touch(client_id);
        self.pending_claims.push(ConsumeClaim {
            player_id: client_id,
            entity_id,
        });
        true
    }

    /// Latest known direction flags for every session.
    pub fn latest_inputs(&self) -> HashMap<u32, DirectionInput> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.latest_input))
            .collect()
    }

    /// Takes every claim queued since the last call, oldest first.
    pub fn drain_claims(&mut self) -> Vec<ConsumeClaim> {
        std::mem::take(&mut self.pending_claims)
    }

    /// Clears stored direction flags, e.g. when avatars are respawned.
    pub fn reset_inputs(&mut self) {
        for client in self.clients.values_mut() {
            client.latest_input = DirectionInput::default();
        }
        self.pending_claims.clear();
    }

    /// Removes sessions that went silent and returns their ids.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn get_client_addr(&self, client_id: u32) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Session ids in ascending order.
    pub fn client_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
