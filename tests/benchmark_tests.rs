//! Performance benchmarks for critical game systems

use bincode::{deserialize, serialize};
use server::client_manager::ClientManager;
use server::collision::{self, CollisionRules};
use server::config::{GameConfig, GameMode};
use server::game::GameState;
use server::spawner::Spawner;
use server::world::World;
use shared::{Avatar, DirectionInput, Packet, WorldSize};
use std::collections::HashMap;
use std::time::Instant;

fn input_for(i: u32) -> DirectionInput {
    DirectionInput {
        up: i % 4 == 0,
        down: i % 4 == 2,
        left: i % 3 == 0,
        right: i % 3 == 1,
    }
}

/// Benchmarks full simulation ticks on a populated arena
#[test]
fn benchmark_simulation_tick() {
    let mut state = GameState::with_world(
        GameConfig::default(),
        World::with_seed(WorldSize::new(3000.0, 3000.0), 1),
    );
    for id in 1..=32 {
        state.add_player(id);
    }
    let inputs: HashMap<u32, DirectionInput> = (1..=32).map(|id| (id, input_for(id))).collect();

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        state.step(&inputs, &[]);
    }

    let duration = start.elapsed();
    println!(
        "Simulation tick: {} avatars × {} ticks in {:?} ({:.2} μs/tick)",
        32,
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // A 60Hz tick has ~16ms; stay well inside that on average
    assert!(duration.as_millis() < 5000);
    assert_eq!(state.world().entity_count(), 300);
}

/// Benchmarks the avatar-vs-avatar pass with many avatars that never qualify
#[test]
fn benchmark_absorption_scan() {
    let rules = CollisionRules::from(&GameConfig::default());
    let mut world = World::with_seed(WorldSize::new(3000.0, 3000.0), 2);
    for id in 0..100 {
        // Equal radii: full pairwise scan, no absorption
        world.insert_avatar(Avatar::new(id, (id * 10) as f32, 500.0, 20.0, "red".into()));
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let events = collision::resolve_avatars(&mut world, &rules);
        assert!(events.is_empty());
    }

    let duration = start.elapsed();
    println!(
        "Absorption scan: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks refilling an emptied arena
#[test]
fn benchmark_spawner_top_up() {
    let config = GameConfig {
        mode: GameMode::Investment,
        ..Default::default()
    };
    let spawner = Spawner::from_config(&config);
    let level = config.level(2);
    let mut world = World::with_seed(config.world_size(), 3);

    let iterations = 100;
    let start = Instant::now();

    for _ in 0..iterations {
        world.clear();
        assert_eq!(spawner.top_up(&mut world, level), level.entity_count);
    }

    let duration = start.elapsed();
    println!(
        "Spawner top-up: {} refills in {:?} ({:.2} μs/refill)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks network packet serialization performance
#[test]
fn benchmark_packet_serialization() {
    let players: Vec<Avatar> = (0..50)
        .map(|i| Avatar::new(i, i as f32 * 10.0, 100.0, 20.0, format!("hsl({}, 100%, 50%)", i)))
        .collect();
    let packet = Packet::UpdatePlayers { players };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks large snapshot serialization/deserialization
#[test]
fn benchmark_snapshot_processing() {
    let state = GameState::new(GameConfig {
        mode: GameMode::Investment,
        ..Default::default()
    });
    let packet = Packet::UpdateEntities {
        entities: state.world().entities_snapshot(),
    };

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot processing: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 3000);
}

/// Benchmarks server input intake under high load
#[test]
fn benchmark_server_input_processing() {
    let mut client_manager = ClientManager::new(50);

    for i in 1..=32 {
        let addr = format!("127.0.0.1:{}", 8000 + i).parse().unwrap();
        client_manager.add_client(addr);
    }

    let start = Instant::now();

    let mut collected = 0;
    for tick in 0..1_000u32 {
        for id in 1..=32 {
            client_manager.set_input(id, input_for(id + tick));
            client_manager.add_claim(id, u64::from(tick));
        }
        collected += client_manager.latest_inputs().len();
        collected += client_manager.drain_claims().len();
    }

    let duration = start.elapsed();
    println!(
        "Input processing: {} inputs and claims in {:?}",
        collected, duration
    );

    assert_eq!(collected, 64_000);
    assert!(duration.as_millis() < 1000);
}
