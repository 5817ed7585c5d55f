//! KARMA (KRM) Reward Engine Node
//!
//! Main entry point for running a KARMA node: content RPC, the periodic
//! upkeep trigger, and local randomness fulfillment.

use karma_core::content::ContentStore;
use karma_core::engine::{EngineConfig, EngineEvent, RewardEngine};
use karma_core::oracle::FixedRatePriceFeed;
use karma_core::payout::MemoryTreasury;
use karma_core::randomness::{LocalRandomnessSource, SharedRandomnessSource};
use karma_core::rpc::{start_rpc_server, RpcState};
use karma_core::storage::EngineDB;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;

/// Initial reward pool endowment (in base units)
const GENESIS_POOL: u64 = 1_000 * 100_000_000; // 1000 KRM

/// How often the trigger loop re-checks upkeep
const TRIGGER_POLL_SECS: u64 = 15;

/// RPC port
const RPC_PORT: u16 = 8545;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::RequestWinningAuthor { request_id } => {
            println!("🎲 Cycle committed, randomness request {} in flight", request_id);
        }
        EngineEvent::PickedWinner { cycle_id, winner } => {
            println!("🏆 Cycle #{} picked winner {:?}", cycle_id, winner);
        }
        EngineEvent::RewardSent { user, amount } => {
            println!(
                "💸 Reward sent: {} KRM to {:?}",
                *amount as f64 / 100_000_000.0,
                user
            );
        }
        EngineEvent::BatchTransferFailed { winner, reason } => {
            println!("⚠️  Transfer failed for {:?}: {}", winner, reason);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║               KARMA (KRM) REWARD ENGINE NODE             ║");
    println!("║           Eligible · Unpredictable · Accountable         ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let config = EngineConfig::default();
    println!("Engine Configuration:");
    println!("  Cycle interval:    {}s", config.interval_secs);
    println!("  Threshold:         {} net votes", config.eligibility_threshold);
    println!(
        "  Minimum balance:   {} KRM",
        config.min_cycle_balance / 100_000_000
    );
    println!(
        "  Winner share:      {}/{} of pool",
        config.reward_share_numerator, config.reward_share_denominator
    );
    println!("  History capacity:  {} records", config.recent_winners_capacity);
    println!();

    // Persistence for winner history and cycle metadata
    let db = EngineDB::open("karma_data")?;

    let now = unix_now();
    let treasury = MemoryTreasury::with_pool(GENESIS_POOL);
    let source = SharedRandomnessSource::new();

    let mut engine = RewardEngine::new(
        config,
        Box::new(treasury),
        Box::new(source.clone()),
        now,
    );

    // Rehydrate history after a restart
    let records = db.load_recent_winners(config.recent_winners_capacity)?;
    if let Some((last_cycle_at, next_cycle_id)) = db.load_metadata()? {
        println!(
            "Restored {} winner record(s), last cycle at {}",
            records.len(),
            last_cycle_at
        );
        engine.restore(records, last_cycle_at, next_cycle_id);
    }

    println!(
        "Reward pool: {} KRM",
        engine.balance() / 100_000_000
    );
    println!("Node started on port {}", RPC_PORT);
    println!("Press Ctrl+C to stop.");
    println!();

    let engine = Arc::new(Mutex::new(engine));
    let store = Arc::new(Mutex::new(ContentStore::new()));

    // Cycle driver: periodic trigger + randomness fulfillment
    let driver_engine = engine.clone();
    let driver_db = db.clone();
    let driver_source = source.clone();

    tokio::spawn(async move {
        loop {
            sleep(Duration::from_secs(TRIGGER_POLL_SECS)).await;
            let now = unix_now();

            // Trigger: abandon stuck requests, then commit if due
            {
                let mut engine = driver_engine.lock().unwrap();
                if let Some(stale) = engine.expire_stale_request(now) {
                    println!("⏰ Abandoned stale randomness request {}", stale);
                }
                if engine.check_upkeep(now).due {
                    if let Err(e) = engine.perform_upkeep(now) {
                        eprintln!("❌ Upkeep commit failed: {}", e);
                    }
                }
                for event in engine.drain_events() {
                    print_event(&event);
                }
            }

            // Fulfillment: play the external randomness service
            for open in driver_source.take_open_requests() {
                let words = LocalRandomnessSource::draw_words(open.num_words);
                let mut engine = driver_engine.lock().unwrap();

                match engine.on_randomness_fulfilled(open.request_id, &words, unix_now()) {
                    Ok(report) => {
                        if let Err(e) = driver_db.save_report(&report) {
                            eprintln!("❌ Failed to persist cycle {}: {}", report.cycle_id, e);
                        }
                        if let Err(e) =
                            driver_db.update_metadata(engine.last_cycle_at(), engine.next_cycle_id())
                        {
                            eprintln!("❌ Failed to persist metadata: {}", e);
                        }
                        println!(
                            "✅ Cycle #{} complete: {} paid, {} failed | Pool: {} KRM",
                            report.cycle_id,
                            report.paid_count(),
                            report.failed_count(),
                            engine.balance() as f64 / 100_000_000.0
                        );
                    }
                    Err(e) => eprintln!("❌ Rejected randomness response: {}", e),
                }

                for event in engine.drain_events() {
                    print_event(&event);
                }
            }
        }
    });

    // RPC server
    let rpc_state = Arc::new(RpcState {
        engine: engine.clone(),
        store: store.clone(),
        price_feed: FixedRatePriceFeed::default(),
    });

    tokio::select! {
        _ = start_rpc_server(rpc_state, RPC_PORT) => {},
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutdown signal received. Stopping node...");
        }
    }

    Ok(())
}
