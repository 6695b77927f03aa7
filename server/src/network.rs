//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::{ClientManager, CLIENT_TIMEOUT};
use crate::collision::CollisionEvent;
use crate::config::GameConfig;
use crate::game::GameState;
use crate::timer::TimerEvent;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{DirectionInput, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet, exclude: Option<u32> },
}

/// Recipient of a packet produced by the simulation
#[derive(Debug, Clone)]
pub enum Delivery {
    Broadcast(Packet),
    ToClient(u32, Packet),
}

/// Translates resolver results into protocol messages. The losing session
/// of an absorption or elimination gets a targeted `GameOver`.
pub fn collision_deliveries(events: &[CollisionEvent]) -> Vec<Delivery> {
    let mut deliveries = Vec::new();
    for event in events {
        match *event {
            CollisionEvent::EntityConsumed {
                player_id,
                entity_id,
                new_radius,
                outcome,
            } => deliveries.push(Delivery::Broadcast(Packet::EntityConsumed {
                player_id,
                entity_id,
                new_radius,
                outcome,
            })),
            CollisionEvent::PlayerEaten {
                eater_id,
                eaten_id,
                new_radius,
            } => {
                deliveries.push(Delivery::Broadcast(Packet::PlayerEaten {
                    eater_id,
                    eaten_id,
                    new_radius,
                }));
                deliveries.push(Delivery::ToClient(eaten_id, Packet::GameOver));
            }
            CollisionEvent::Eliminated { player_id } => {
                deliveries.push(Delivery::ToClient(player_id, Packet::GameOver));
            }
        }
    }
    deliveries
}

pub fn timer_deliveries(events: &[TimerEvent]) -> Vec<Delivery> {
    events
        .iter()
        .map(|event| match *event {
            TimerEvent::Tick { seconds_remaining } => {
                Delivery::Broadcast(Packet::UpdateTimer { seconds_remaining })
            }
            TimerEvent::LevelUp { new_level_index } => Delivery::Broadcast(Packet::LevelUp {
                new_level_index: new_level_index as u32,
            }),
            TimerEvent::MatchOver => Delivery::Broadcast(Packet::GameOver),
        })
        .collect()
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    restart_requested: bool,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(addr: &str, config: GameConfig, max_clients: usize) -> Result<Self, BoxError> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(config),
            restart_requested: false,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping [`Server::run`] from another task.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[0..len]) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                debug!("Main loop gone, stopping receiver");
                                break;
                            }
                        }
                        Err(_) => warn!("Failed to deserialize packet from {}", addr),
                    },
                    Err(e) => {
                        // Windows reports ICMP port unreachable as a receive error.
                        debug!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };
                        if client_addrs.is_empty() {
                            continue;
                        }

                        let data = match Self::encode(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Failed to encode broadcast: {}", e);
                                continue;
                            }
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for client_id in timed_out {
                    if server_tx
                        .send(ServerMessage::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    fn encode(packet: &Packet) -> Result<Vec<u8>, BoxError> {
        let data = serialize(packet)?;
        if data.len() > MAX_PACKET_SIZE {
            return Err(format!("packet of {} bytes exceeds datagram limit", data.len()).into());
        }
        Ok(data)
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = Self::encode(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    async fn send_to_client(&self, client_id: u32, packet: Packet) {
        let addr = {
            let clients = self.clients.read().await;
            clients.get_client_addr(client_id)
        };
        if let Some(addr) = addr {
            self.send_packet(packet, addr);
        }
    }

    async fn deliver(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::Broadcast(packet) => self.broadcast_packet(packet, None),
                Delivery::ToClient(client_id, packet) => {
                    self.send_to_client(client_id, packet).await
                }
            }
        }
    }

    /// Full snapshot for one session
    fn init_game_packet(&self, player_id: u32) -> Packet {
        let world = self.game_state.world();
        let timer = self.game_state.timer();
        Packet::InitGame {
            player_id,
            players: world.players_snapshot(),
            entities: world.entities_snapshot(),
            world_size: world.size(),
            level_index: timer.level_index() as u32,
            seconds_remaining: timer.seconds_remaining(),
        }
    }

    async fn find_client(&self, addr: SocketAddr) -> Option<u32> {
        let clients = self.clients.read().await;
        clients.find_client_by_addr(addr)
    }

    /// Drops a session and its avatar and tells everyone still connected.
    async fn disconnect_client(&mut self, client_id: u32) {
        {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id);
        }
        self.handle_departure(client_id);
    }

    fn handle_departure(&mut self, client_id: u32) {
        self.game_state.remove_player(client_id);
        self.broadcast_packet(
            Packet::PlayerDisconnected {
                player_id: client_id,
            },
            None,
        );
    }

    /// Dispatches one received packet. Handlers only record intent; the
    /// world itself changes on connect/disconnect and at tick boundaries.
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Some(client_id) = self.find_client(addr).await {
            let mut clients = self.clients.write().await;
            clients.touch(client_id);
        }

        match packet {
            Packet::Connect { client_version } => {
                self.handle_connect(client_version, addr).await;
            }

            Packet::UpdatePosition {
                up,
                down,
                left,
                right,
            } => {
                if let Some(client_id) = self.find_client(addr).await {
                    let input = DirectionInput {
                        up,
                        down,
                        left,
                        right,
                    };
                    let mut clients = self.clients.write().await;
                    clients.set_input(client_id, input);
                }
            }

            Packet::ConsumeEntity { entity_id } => {
                if let Some(client_id) = self.find_client(addr).await {
                    let mut clients = self.clients.write().await;
                    clients.add_claim(client_id, entity_id);
                }
            }

            Packet::RestartGame => {
                if let Some(client_id) = self.find_client(addr).await {
                    info!("Client {} requested a restart", client_id);
                    self.restart_requested = true;
                }
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.find_client(addr).await {
                    self.disconnect_client(client_id).await;
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    async fn handle_connect(&mut self, client_version: u32, addr: SocketAddr) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            let reason = format!(
                "Unsupported client version {} (server speaks {})",
                client_version, PROTOCOL_VERSION
            );
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        }

        // Remove existing connection if present
        if let Some(existing_id) = self.find_client(addr).await {
            info!("Replacing existing client {} from {}", existing_id, addr);
            self.disconnect_client(existing_id).await;
        }

        let (client_id, session_count) = {
            let mut clients = self.clients.write().await;
            (clients.add_client(addr), clients.len())
        };

        let Some(client_id) = client_id else {
            let reason = "Server full".to_string();
            self.send_packet(Packet::Disconnected { reason }, addr);
            return;
        };

        let avatar = self.game_state.add_player(client_id);
        self.send_packet(Packet::Connected { client_id }, addr);
        self.send_packet(self.init_game_packet(client_id), addr);
        self.broadcast_packet(Packet::NewPlayer { avatar }, Some(client_id));

        if self.game_state.try_start(session_count) {
            self.broadcast_packet(
                Packet::UpdateTimer {
                    seconds_remaining: self.game_state.timer().seconds_remaining(),
                },
                None,
            );
        }
    }

    async fn restart_match(&mut self) {
        self.restart_requested = false;

        let session_ids = {
            let mut clients = self.clients.write().await;
            clients.reset_inputs();
            clients.client_ids()
        };

        self.game_state.restart(&session_ids);
        self.broadcast_packet(Packet::RestartGame, None);
        for &client_id in &session_ids {
            let snapshot = self.init_game_packet(client_id);
            self.send_to_client(client_id, snapshot).await;
        }
        self.game_state.try_start(session_ids.len());
    }

    /// Movement, collision and the per-tick broadcast
    async fn simulation_tick(&mut self) {
        if self.restart_requested {
            self.restart_match().await;
        }

        let (inputs, claims) = {
            let mut clients = self.clients.write().await;
            (clients.latest_inputs(), clients.drain_claims())
        };

        let report = self.game_state.step(&inputs, &claims);
        self.deliver(collision_deliveries(&report.events)).await;

        if report.entities_changed {
            self.broadcast_packet(
                Packet::UpdateEntities {
                    entities: self.game_state.world().entities_snapshot(),
                },
                None,
            );
        }

        self.broadcast_packet(
            Packet::UpdatePlayers {
                players: self.game_state.world().players_snapshot(),
            },
            None,
        );
    }

    fn spawn_tick(&mut self) {
        let added = self.game_state.spawn_cycle();
        if added > 0 {
            debug!("Spawned {} entities", added);
        }
        self.broadcast_packet(
            Packet::UpdateEntities {
                entities: self.game_state.world().entities_snapshot(),
            },
            None,
        );
    }

    async fn timer_tick(&mut self) {
        let events = self.game_state.advance_timer();
        self.deliver(timer_deliveries(&events)).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), BoxError> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let config = self.game_state.config();
        let mut tick_interval = interval(config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let spawn_period = config.spawn_interval();
        let mut spawn_interval = interval_at(Instant::now() + spawn_period, spawn_period);
        spawn_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let second = Duration::from_secs(1);
        let mut timer_interval = interval_at(Instant::now() + second, second);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.handle_departure(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.simulation_tick().await;

                    // Periodic performance monitoring
                    if self.game_state.tick % 60 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };

                        if client_count > 0 {
                            let world = self.game_state.world();
                            let timer = self.game_state.timer();
                            let clock = if timer.is_running() {
                                format!("level {} ({}s left)", timer.level_index(), timer.seconds_remaining())
                            } else {
                                format!("{:?}", timer.state())
                            };
                            debug!("Tick {}: {} clients, {} avatars, {} entities, {}",
                                   self.game_state.tick, client_count, world.avatar_count(),
                                   world.entity_count(), clock);
                        }
                    }
                },

                _ = spawn_interval.tick() => {
                    self.spawn_tick();
                },

                _ = timer_interval.tick() => {
                    self.timer_tick().await;
                },
            }
        }

        Ok(())
    }
}
