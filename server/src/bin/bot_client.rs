//! Headless bot that joins an arena server and chases the nearest entity.
//! Useful for filling a match during manual testing.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, info, warn};
use shared::{overlaps, Avatar, DirectionInput, Entity, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, Instant};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// How long to play before disconnecting, in seconds
    #[arg(short = 'd', long, default_value = "30")]
    duration: u64,

    /// Claim overlapped entities explicitly (for servers using the client claim policy)
    #[arg(long)]
    claim: bool,

    /// Ask the server for a new match after game over
    #[arg(long)]
    restart: bool,
}

/// What the bot knows about the match
struct BotView {
    player_id: u32,
    players: Vec<Avatar>,
    entities: Vec<Entity>,
    eliminated: bool,
    restart_requested: bool,
}

impl BotView {
    fn me(&self) -> Option<&Avatar> {
        self.players.iter().find(|p| p.id == self.player_id)
    }

    fn apply(&mut self, packet: Packet) {
        match packet {
            Packet::InitGame {
                player_id,
                players,
                entities,
                level_index,
                seconds_remaining,
                ..
            } => {
                info!(
                    "Joined as {} on level {} ({}s left)",
                    player_id, level_index, seconds_remaining
                );
                self.player_id = player_id;
                self.players = players;
                self.entities = entities;
                self.eliminated = false;
                self.restart_requested = false;
            }
            Packet::UpdatePlayers { players } => self.players = players,
            Packet::UpdateEntities { entities } => self.entities = entities,
            Packet::EntityConsumed {
                player_id,
                entity_id,
                new_radius,
                outcome,
            } => {
                self.entities.retain(|e| e.id != entity_id);
                if player_id == self.player_id {
                    info!("Ate entity {} ({:?}), radius {:.1}", entity_id, outcome, new_radius);
                }
            }
            Packet::PlayerEaten {
                eater_id, eaten_id, ..
            } => debug!("Player {} absorbed {}", eater_id, eaten_id),
            Packet::GameOver => {
                info!("Game over");
                self.eliminated = true;
            }
            Packet::LevelUp { new_level_index } => info!("Level up: {}", new_level_index),
            Packet::Disconnected { reason } => warn!("Disconnected by server: {}", reason),
            _ => {}
        }
    }

    /// Direction flags pointing at the nearest entity that will not hurt us.
    fn steer(&self) -> DirectionInput {
        let Some(me) = self.me() else {
            return DirectionInput::default();
        };

        let target = self
            .entities
            .iter()
            .filter(|e| !e.kind.is_harmful())
            .min_by(|a, b| {
                let da = shared::distance(me.x, me.y, a.x, a.y);
                let db = shared::distance(me.x, me.y, b.x, b.y);
                da.total_cmp(&db)
            });

        match target {
            Some(entity) => DirectionInput {
                up: entity.y < me.y - 1.0,
                down: entity.y > me.y + 1.0,
                left: entity.x < me.x - 1.0,
                right: entity.x > me.x + 1.0,
            },
            None => DirectionInput::default(),
        }
    }

    /// Packets for one input tick. An eliminated bot keeps sending idle
    /// input so the server does not time the session out before a restart.
    fn outgoing(&mut self, claim: bool, restart: bool) -> Vec<Packet> {
        let input = if self.eliminated {
            DirectionInput::default()
        } else {
            self.steer()
        };
        let mut packets = vec![Packet::UpdatePosition {
            up: input.up,
            down: input.down,
            left: input.left,
            right: input.right,
        }];

        if self.eliminated {
            if restart && !self.restart_requested {
                self.restart_requested = true;
                packets.push(Packet::RestartGame);
            }
        } else if claim {
            packets.extend(
                self.overlapped_entities()
                    .into_iter()
                    .map(|entity_id| Packet::ConsumeEntity { entity_id }),
            );
        }

        packets
    }

    fn overlapped_entities(&self) -> Vec<u64> {
        let Some(me) = self.me() else {
            return Vec::new();
        };
        self.entities
            .iter()
            .filter(|e| overlaps(me.x, me.y, me.radius, e.x, e.y, e.radius))
            .map(|e| e.id)
            .collect()
    }
}

async fn send(socket: &UdpSocket, packet: &Packet, addr: SocketAddr) -> Result<(), BoxError> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server_addr: SocketAddr = args.server.parse()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
        server_addr,
    )
    .await?;

    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    let player_id = match deserialize::<Packet>(&buf[..len])? {
        Packet::Connected { client_id } => client_id,
        Packet::Disconnected { reason } => return Err(format!("rejected: {}", reason).into()),
        other => return Err(format!("unexpected reply: {:?}", other).into()),
    };
    info!("Connected with client ID: {}", player_id);

    let mut view = BotView {
        player_id,
        players: Vec::new(),
        entities: Vec::new(),
        eliminated: false,
        restart_requested: false,
    };

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut input_interval = interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buf[..len]) {
                    Ok(packet) => view.apply(packet),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }

            _ = input_interval.tick() => {
                if Instant::now() >= deadline {
                    break;
                }
                for packet in view.outgoing(args.claim, args.restart) {
                    send(&socket, &packet, server_addr).await?;
                }
            }
        }
    }

    send(&socket, &Packet::Disconnect, server_addr).await?;
    info!("Bot finished");

    Ok(())
}
