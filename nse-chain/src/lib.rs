//! Resilient acquisition of NSE India option-chain data.
//!
//! The upstream endpoint is rate-limited and bot-defensive: it hands out data
//! only to clients that look like a desktop browser carrying freshly warmed
//! cookies, and answers throttled clients with HTML challenge pages instead of
//! structured errors. This crate owns that whole acquisition problem:
//!
//! - [`session`] keeps one shared warmed session per process and rebuilds it
//!   on demand.
//! - [`detect`] classifies each raw response as valid JSON or a block.
//! - [`fetch`] spends at most one session-rebuild retry per call.
//! - [`normalize`] and [`aggregate`] turn per-strike records into sorted rows
//!   and put/call ratios.
//! - [`cache`] memoizes composed results per (symbol, expiry) with a TTL and
//!   single-flight deduplication, exposing [`ChainCache::get_or_fetch`].
//!
//! Presentation is not this crate's concern. A collaborator (dashboard, TUI,
//! or the bundled `nse-chain-monitor` logger) consumes [`ChainSnapshot`]s on
//! its own schedule and decides how to display them.

/// Put/call ratio derivation over normalised rows.
pub mod aggregate;

/// Per-key TTL cache with single-flight refresh; the crate's entry point.
pub mod cache;

/// Fetch keys, wire payload model, normalised rows, and snapshots.
pub mod chain;

/// Environment-driven configuration.
pub mod config;

/// Blocked-response classification.
pub mod detect;

/// Fetch-path error taxonomy.
pub mod error;

/// Bounded-retry option-chain fetcher.
pub mod fetch;

/// Per-strike record flattening, expiry filtering, and strike ordering.
pub mod normalize;

/// Shared session ownership, invalidation, and recreation.
pub mod session;

/// Upstream I/O seam and the reqwest-backed browser-mimicking implementation.
pub mod transport;

pub use cache::ChainCache;
pub use chain::{ChainSnapshot, FetchKey, OptionRow};
pub use config::ChainConfig;
pub use error::FetchError;
