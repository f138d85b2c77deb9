//! Single-owner terminal loop.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ PollScheduler│────►│ SourceClient │────►│  StaleCache  │
//! │   (timers)   │     │  (detached)  │     │ (write-thru) │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!        ▲                    │ PollOutcome (mpsc)
//!        │ FollowUp           ▼
//!        │             ┌──────────────┐     ┌──────────────┐
//!        └─────────────│   Terminal   │────►│ DisplaySink  │
//!                      │ (all state)  │     │  (render)    │
//!                      └──────────────┘     └──────────────┘
//! ```
//!
//! The terminal is the only writer of network, market and ledger state.
//! Fetch tasks never touch it; they only send outcomes.

pub mod terminal;

pub use terminal::Terminal;
