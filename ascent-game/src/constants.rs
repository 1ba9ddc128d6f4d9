//! Centralized balance and tuning constants for Ascent game logic.
//!
//! These values define the default rules of a climb. `Rules::default_config`
//! is built from them, and alternate rule sets loaded from JSON are validated
//! against the same shape.

use std::time::Duration;

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TARGET_ENGINE: &str = "ascent::engine";
pub(crate) const LOG_TARGET_SYNC: &str = "ascent::sync";
pub(crate) const LOG_TARGET_DRIVER: &str = "ascent::driver";

// Level layout -------------------------------------------------------------
pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 50;
pub const EXPRESS_START_LEVEL: u32 = 20;
pub const SAFE_LEVEL_INTERVAL: u32 = 5;

// Economy ------------------------------------------------------------------
/// Ticket charge for the n-th failure of a session; counts past the end reuse the last entry.
pub const COST_TABLE: [u32; 6] = [0, 1, 2, 4, 8, 10];
/// Tickets spent to begin a session, from the pool matching the start mode.
pub const START_TICKET_COST: u32 = 1;
/// Chance that any single risky level produces a failure.
pub const FAILURE_PROBABILITY: f64 = 0.25;

// Probability sync ---------------------------------------------------------
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
