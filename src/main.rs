use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use kaswatch::cache::{SharedCache, StaleCache};
use kaswatch::config::Config;
use kaswatch::engine::Terminal;
use kaswatch::feed::{Endpoints, SourceClient};
use kaswatch::logging::{self, obj, v_num, v_str, Domain, Level};
use kaswatch::scheduler::{PollPlan, PollScheduler};
use kaswatch::sink::LogSink;
use kaswatch::storage::CacheStore;
use kaswatch::watchlist::default_watchlist;

fn system(event: &str, fields: serde_json::Map<String, serde_json::Value>) {
    logging::log(Level::Info, Domain::System, event, fields);
}

/// Write the cache snapshot. A failed write is logged and otherwise ignored.
fn snapshot(store: &mut CacheStore, cache: &SharedCache) {
    let copy = match cache.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => return,
    };
    match store.save(&copy) {
        Ok(rows) => logging::log(Level::Debug, Domain::Cache, "snapshot_saved", obj(&[("rows", json!(rows))])),
        Err(err) => logging::log(
            Level::Warn,
            Domain::Cache,
            "snapshot_failed",
            obj(&[("error", v_str(&err.to_string()))]),
        ),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    cfg.validate()?;

    let live_ttl = Duration::from_secs(cfg.live_ttl_secs);
    let history_ttl = Duration::from_secs(cfg.history_ttl_secs);
    let mut store = CacheStore::new(&cfg.cache_path)?;
    store.init()?;
    let cache = match store.load(live_ttl, history_ttl) {
        Ok(cache) => cache,
        Err(err) => {
            logging::log(
                Level::Warn,
                Domain::Cache,
                "snapshot_unreadable",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            StaleCache::new(live_ttl, history_ttl)
        }
    };
    system(
        "startup",
        obj(&[
            ("cache_entries", v_num(cache.len() as f64)),
            ("explorer", v_str(&cfg.explorer_base)),
            ("market", v_str(&cfg.market_base)),
        ]),
    );
    let cache = cache.shared();

    let client = Arc::new(SourceClient::new(Endpoints::from_config(&cfg), cfg.fetch_timeout(), cache.clone())?);
    let (tx, mut rx) = mpsc::channel(256);
    let plan = PollPlan::from_config(&cfg);
    let mut scheduler = PollScheduler::new(client, tx, plan.stagger_step);
    let mut terminal = Terminal::new(&cfg, cache.clone(), LogSink::default());

    for follow_up in terminal.start(&default_watchlist()) {
        scheduler.follow_up(follow_up);
    }
    scheduler.start(&plan);
    scheduler.spot_check(terminal.tracked_addresses(), plan.spot_check_every);

    let mut emission_tick = interval(Duration::from_secs(cfg.emission_every_secs));
    emission_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut snapshot_tick = interval(Duration::from_secs(cfg.snapshot_every_secs));
    snapshot_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(outcome) = rx.recv() => {
                for follow_up in terminal.apply(outcome) {
                    scheduler.follow_up(follow_up);
                }
            }
            _ = emission_tick.tick() => {
                terminal.refresh_emission();
            }
            _ = snapshot_tick.tick() => {
                snapshot(&mut store, &cache);
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    scheduler.stop_all();
    snapshot(&mut store, &cache);
    let score = terminal.risk_score();
    system(
        "shutdown",
        obj(&[
            ("alert_score", json!(score.value)),
            ("alert_level", v_str(score.level.as_str())),
            ("tracked", v_num(terminal.ledger().len() as f64)),
        ]),
    );
    Ok(())
}
