//! Tracked high-balance entities.
//!
//! Each entity keeps three balances: the current one, the one before the
//! latest update, and the baseline captured at its first successful sync.
//! The baseline never changes afterwards, so movement is always measured
//! against session start.

use serde::Serialize;

use crate::feed::kaspa::SOMPI_PER_KAS;
use crate::feed::SourceId;
use crate::indicators::BoundedSeries;
use crate::logging;
use crate::watchlist::WatchEntry;

pub const TOTAL_SUPPLY: f64 = 28_700_000_000.0;

/// How many large movements the ledger remembers.
pub const RECENT_MOVEMENTS: usize = 10;

const ADDRESS_PREFIX: &str = "kaspa:";
const ADDRESS_BODY_LEN: usize = 61;

/// `kaspa:` followed by exactly 61 lowercase letters or digits. The
/// prefix and body are matched case-insensitively.
pub fn is_valid_address(address: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    lower.strip_prefix(ADDRESS_PREFIX).map_or(false, |body| {
        body.len() == ADDRESS_BODY_LEN && body.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Exchange,
    Whale,
    Dev,
    Mining,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTag {
    pub name: String,
    pub kind: TagKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Unknown,
    Synced,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub address: String,
    /// 1-based position among the accepted watch-list entries.
    pub rank: usize,
    pub tag: Option<EntityTag>,
    pub balance: f64,
    pub previous_balance: f64,
    pub baseline_balance: Option<f64>,
    pub percent_of_supply: f64,
    pub status: SyncStatus,
}

impl Entity {
    fn new(rank: usize, entry: &WatchEntry) -> Self {
        Self {
            address: entry.address.clone(),
            rank,
            tag: entry.tag.clone(),
            balance: 0.0,
            previous_balance: 0.0,
            baseline_balance: None,
            percent_of_supply: 0.0,
            status: SyncStatus::Unknown,
        }
    }

    /// Change since session start, once synced.
    pub fn delta_since_baseline(&self) -> Option<f64> {
        self.baseline_balance.map(|b| self.balance - b)
    }

    pub fn is_synced(&self) -> bool {
        self.balance > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargeMovement {
    pub address: String,
    pub rank: usize,
    pub delta: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub synced: usize,
    pub total_balance: f64,
    pub percent_of_supply: f64,
    pub exchange_balance: f64,
    pub average_balance: Option<f64>,
    pub largest_balance: Option<f64>,
    pub smallest_balance: Option<f64>,
    /// Rank and delta of the entity that moved most since baseline.
    pub largest_mover: Option<(usize, f64)>,
}

#[derive(Debug, Clone)]
pub struct EntityLedger {
    entities: Vec<Entity>,
    move_threshold: f64,
    recent: BoundedSeries<LargeMovement>,
}

impl EntityLedger {
    pub fn new(move_threshold: f64) -> Self {
        Self {
            entities: Vec::new(),
            move_threshold,
            recent: BoundedSeries::new(RECENT_MOVEMENTS),
        }
    }

    /// Replace the tracked set. Malformed addresses are logged and
    /// skipped. Returns the balance polls to stagger.
    pub fn initialize(&mut self, entries: &[WatchEntry]) -> Vec<SourceId> {
        self.entities.clear();
        self.recent = BoundedSeries::new(RECENT_MOVEMENTS);
        for (position, entry) in entries.iter().enumerate() {
            if is_valid_address(&entry.address) {
                let rank = self.entities.len() + 1;
                self.entities.push(Entity::new(rank, entry));
            } else {
                logging::log_invalid_address(&entry.address, position + 1);
            }
        }
        self.entities
            .iter()
            .map(|e| SourceId::Balance(e.address.clone()))
            .collect()
    }

    /// Apply a raw balance in sompi. A zero balance reads as not yet
    /// synced and is ignored. Returns a movement event when a non-first
    /// update changes the balance by more than the threshold.
    pub fn apply_balance_update(&mut self, index: usize, raw_sompi: u64) -> Option<LargeMovement> {
        let threshold = self.move_threshold;
        let entity = self.entities.get_mut(index)?;
        if raw_sompi == 0 {
            return None;
        }
        let balance = raw_sompi as f64 / SOMPI_PER_KAS;
        let first_update = entity.baseline_balance.is_none();

        entity.previous_balance = entity.balance;
        entity.balance = balance;
        if first_update {
            entity.baseline_balance = Some(balance);
        }
        entity.percent_of_supply = balance / TOTAL_SUPPLY * 100.0;
        entity.status = SyncStatus::Synced;

        let delta = balance - entity.previous_balance;
        if first_update || delta.abs() <= threshold {
            return None;
        }
        let movement = LargeMovement {
            address: entity.address.clone(),
            rank: entity.rank,
            delta,
            balance,
        };
        self.recent.push(movement.clone());
        Some(movement)
    }

    /// Up to the last ten large movements, newest first.
    pub fn recent_movements(&self) -> impl Iterator<Item = &LargeMovement> {
        self.recent.iter().rev()
    }

    pub fn mark_offline(&mut self, index: usize) {
        if let Some(entity) = self.entities.get_mut(index) {
            entity.status = SyncStatus::Offline;
        }
    }

    pub fn index_of(&self, address: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.address == address)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Net change since baseline over the first `top_n` synced entities.
    /// None until at least one of them has synced.
    pub fn aggregate_delta(&self, top_n: usize) -> Option<f64> {
        let mut synced = self
            .entities
            .iter()
            .take(top_n)
            .filter(|e| e.is_synced())
            .filter_map(Entity::delta_since_baseline)
            .peekable();
        synced.peek()?;
        Some(synced.sum())
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        let mut largest: Option<(usize, f64)> = None;
        for e in self.entities.iter().filter(|e| e.is_synced()) {
            stats.synced += 1;
            stats.total_balance += e.balance;
            stats.largest_balance = Some(stats.largest_balance.map_or(e.balance, |b| b.max(e.balance)));
            stats.smallest_balance = Some(stats.smallest_balance.map_or(e.balance, |b| b.min(e.balance)));
            if matches!(e.tag.as_ref().map(|t| t.kind), Some(TagKind::Exchange)) {
                stats.exchange_balance += e.balance;
            }
            if let Some(delta) = e.delta_since_baseline() {
                if largest.map_or(delta != 0.0, |(_, d)| delta.abs() > d.abs()) {
                    largest = Some((e.rank, delta));
                }
            }
        }
        stats.percent_of_supply = stats.total_balance / TOTAL_SUPPLY * 100.0;
        if stats.synced > 0 {
            stats.average_balance = Some(stats.total_balance / stats.synced as f64);
        }
        stats.largest_mover = largest;
        stats
    }
}
