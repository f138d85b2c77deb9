pub mod cache;
pub mod config;
pub mod emission;
pub mod engine;
pub mod error;
pub mod feed;
pub mod health;
pub mod indicators;
pub mod ledger;
pub mod logging;
pub mod metrics;
pub mod reliability;
pub mod risk;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod storage;
pub mod watchlist;
