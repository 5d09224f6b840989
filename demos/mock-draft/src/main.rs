use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use draftroom::prelude::*;

// ---------------------------------------------------------------------------
// Mock pool
// ---------------------------------------------------------------------------

/// Ten of each standard category, ids grouped by category.
fn mock_pool() -> Vec<RawEntity> {
    let categories = ["QB", "RB", "WR", "TE", "K", "DST"];
    let json: Vec<serde_json::Value> = categories
        .iter()
        .enumerate()
        .flat_map(|(c, category)| {
            (0..10).map(move |n| serde_json::json!({ "PlayerID": 100 * (c as u64 + 1) + n, "Position": category }))
        })
        .collect();
    json.into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Bots
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Style {
    /// Picks the first available preference by hand.
    Manual,
    /// Hands the turn to auto-pick right away.
    Eager,
    /// Never acts; the turn clock picks for it.
    Idle,
}

struct Bot {
    key: &'static str,
    style: Style,
    preferences: Vec<EntityId>,
}

fn bots() -> Vec<Bot> {
    vec![
        Bot { key: "alice", style: Style::Manual, preferences: [100, 200, 300, 400].map(EntityId).to_vec() },
        Bot { key: "bob", style: Style::Eager, preferences: Vec::new() },
        Bot { key: "carol", style: Style::Manual, preferences: [201, 301, 101].map(EntityId).to_vec() },
        Bot { key: "dave", style: Style::Idle, preferences: [302, 202].map(EntityId).to_vec() },
    ]
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), DraftroomError> {
    draftroom::telemetry::init_tracing();
    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let config = EngineConfig {
        room: RoomConfig {
            clock: ClockConfig {
                turn_timeout: Duration::from_secs(2),
                disconnect_grace: Duration::from_secs(4),
            },
            ..RoomConfig::default()
        },
        ..EngineConfig::default()
    };
    let (engine, local_addr) = DraftEngine::builder()
        .config(config)
        .build_with_websocket(Arc::new(MemoryStore::new()), &addr, 20)
        .await?;
    println!("Observe with a WebSocket client on ws://{local_addr}, subscribing to draft-room-1");

    engine.seed_raw_pool(mock_pool()).await?;
    let bots = bots();
    let room = engine
        .create_room(RoomProvision {
            room_id: RoomId(1),
            participants: bots.iter().map(|b| ParticipantSeed::new(b.key)).collect(),
            lineup: LineupConfig::standard(),
            max_rounds: 3,
        })
        .await?;

    let mut ids: HashMap<ParticipantId, usize> = HashMap::new();
    for (i, bot) in bots.iter().enumerate() {
        let id = ParticipantId(i as u64 + 1);
        engine.join(room, id, ParticipantKey::new(bot.key), None).await?;
        engine.set_preferences(room, id, bot.preferences.clone()).await?;
        ids.insert(id, i);
    }
    let order = engine.start_draft(room).await?;
    println!("Draft started, order: {order:?}");

    let mut bounced = false;
    let mut next_id = 100;
    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let snapshot = engine.room_snapshot(room).await?;
        if snapshot.phase.is_complete() {
            break;
        }
        let Some(current) = snapshot.current_participant else {
            continue;
        };
        let Some(&bot) = ids.get(&current) else {
            continue;
        };

        // carol drops mid-draft on her second turn and comes back under a new id
        if bots[bot].key == "carol" && !bounced && snapshot.participant(current).is_some_and(|p| p.picks.len() == 1) {
            bounced = true;
            engine.disconnect(room, current).await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            let fresh = ParticipantId(next_id);
            next_id += 1;
            engine.reconnect(room, ParticipantKey::new("carol"), fresh).await?;
            ids.insert(fresh, bot);
            println!("carol reconnected as {fresh}");
            continue;
        }

        let result = match bots[bot].style {
            Style::Idle => continue,
            Style::Eager => engine.request_auto_pick(room, current).await.map(|_| ()),
            Style::Manual => {
                let wanted = bots[bot]
                    .preferences
                    .iter()
                    .find(|id| snapshot.available.contains(id))
                    .or_else(|| snapshot.available.first())
                    .copied();
                match wanted {
                    Some(entity) => engine.make_pick(room, current, entity).await.map(|_| ()),
                    None => engine.request_auto_pick(room, current).await.map(|_| ()),
                }
            }
        };
        if let Err(e) = result {
            // NoLegalSlot and lost races leave the turn open; the clock resolves it.
            tracing::info!(participant = %current, error = %e, "bot pick rejected");
        }
    }

    engine.flush_broadcasts().await;
    for record in engine.pick_history(room).await? {
        println!(
            "#{:<2} round {} {:<6} entity {:<4} {:<4} -> {}{}",
            record.pick_number,
            record.round,
            record.participant_key,
            record.entity_id,
            record.category,
            record.slot,
            if record.was_automatic { " (auto)" } else { "" }
        );
    }
    println!("Transport: {:?}", engine.transport_status());
    Ok(())
}
