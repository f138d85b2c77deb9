//! Entity ledger: baseline capture, aggregate flow and how it reaches the score.

use kaswatch::ledger::{is_valid_address, EntityLedger, SyncStatus};
use kaswatch::risk::{RiskInputs, RiskScorer};
use kaswatch::state::{MarketState, NetworkState};
use kaswatch::watchlist::{default_watchlist, WatchEntry};

const KAS: u64 = 100_000_000;

fn ledger(tags: &[&str]) -> EntityLedger {
    let entries: Vec<WatchEntry> = tags
        .iter()
        .map(|t| WatchEntry::new(format!("kaspa:q{:0>60}", t), None))
        .collect();
    let mut l = EntityLedger::new(1_000_000.0);
    l.initialize(&entries);
    l
}

#[test]
fn default_watchlist_starts_unknown_with_one_poll_each() {
    let watch = default_watchlist();
    let mut l = EntityLedger::new(1_000_000.0);
    let polls = l.initialize(&watch);
    let well_formed = watch.iter().filter(|e| is_valid_address(&e.address)).count();
    // Four built-in rows are not 61-character addresses and are skipped.
    assert_eq!(well_formed, watch.len() - 4);
    assert_eq!(polls.len(), well_formed);
    assert!(l.entities().iter().all(|e| e.status == SyncStatus::Unknown));
    assert!(l.entities().iter().enumerate().all(|(i, e)| e.rank == i + 1));
    assert_eq!(l.aggregate_delta(20), None);
}

#[test]
fn unsynced_entities_stay_out_of_flow() {
    let mut l = ledger(&["a", "b"]);
    l.apply_balance_update(0, 1_000_000 * KAS);
    l.apply_balance_update(0, 1_050_000 * KAS);
    assert_eq!(l.aggregate_delta(20), Some(50_000.0));
    assert_eq!(l.get(1).map(|e| e.balance), Some(0.0));

    let inputs = RiskInputs::snapshot(&NetworkState::new(10.0), &MarketState::default(), &l, 20);
    assert_eq!(inputs.aggregate_delta, Some(50_000.0));
    let score = RiskScorer::new(1_000_000.0).score(&inputs);
    assert!((score.factors.entity_flow - 50.05).abs() < 1e-9);
}

#[test]
fn baseline_survives_repeated_updates() {
    let mut l = ledger(&["a"]);
    for kas in [1_000_000u64, 1_200_000, 900_000, 1_100_000] {
        l.apply_balance_update(0, kas * KAS);
    }
    let e = l.get(0).unwrap();
    assert_eq!(e.baseline_balance, Some(1_000_000.0));
    assert_eq!(e.previous_balance, 900_000.0);
    assert_eq!(e.delta_since_baseline(), Some(100_000.0));
}

#[test]
fn aggregate_only_counts_top_n() {
    let mut l = ledger(&["a", "b", "c"]);
    for (i, (from, to)) in [(100u64, 110u64), (100, 90), (100, 200)].iter().enumerate() {
        l.apply_balance_update(i, from * KAS);
        l.apply_balance_update(i, to * KAS);
    }
    assert_eq!(l.aggregate_delta(2), Some(0.0));
    assert_eq!(l.aggregate_delta(3), Some(100.0));
}
