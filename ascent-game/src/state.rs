use serde::{Deserialize, Serialize};

use crate::constants::MIN_LEVEL;
use crate::tickets::TicketKind;

/// A failure awaiting the player's pay-or-quit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFailure {
    pub cost: u32,
}

/// Authoritative record of one climb.
///
/// Only [`crate::ProgressionEngine`] mutates a live session; everything else
/// receives it by shared reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub started: bool,
    pub level: u32,
    pub regular_tickets: u32,
    pub express_tickets: u32,
    pub total_failures: u32,
    pub is_express_start: bool,
    pub has_failed_current_level: bool,
    pub is_safe_level: bool,
    pub max_failures_covered: u32,
    #[serde(default)]
    pub pending_failure: Option<PendingFailure>,
}

impl Default for Session {
    /// The not-started baseline.
    fn default() -> Self {
        Self {
            started: false,
            level: MIN_LEVEL,
            regular_tickets: 0,
            express_tickets: 0,
            total_failures: 0,
            is_express_start: false,
            has_failed_current_level: false,
            is_safe_level: false,
            max_failures_covered: 0,
            pending_failure: None,
        }
    }
}

impl Session {
    #[must_use]
    pub const fn tickets(&self, kind: TicketKind) -> u32 {
        match kind {
            TicketKind::Regular => self.regular_tickets,
            TicketKind::Express => self.express_tickets,
        }
    }

    pub(crate) const fn tickets_mut(&mut self, kind: TicketKind) -> &mut u32 {
        match kind {
            TicketKind::Regular => &mut self.regular_tickets,
            TicketKind::Express => &mut self.express_tickets,
        }
    }

    #[must_use]
    pub const fn has_pending_failure(&self) -> bool {
        self.pending_failure.is_some()
    }

    /// Fields whose change schedules a probability refresh.
    #[must_use]
    pub const fn sync_key(&self) -> SyncKey {
        SyncKey {
            started: self.started,
            level: self.level,
            regular_tickets: self.regular_tickets,
            total_failures: self.total_failures,
            is_express_start: self.is_express_start,
        }
    }
}

/// Projection of a [`Session`] onto the refresh trigger set.
///
/// Express tickets, the pending failure, and the per-level failure flag are
/// deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncKey {
    pub started: bool,
    pub level: u32,
    pub regular_tickets: u32,
    pub total_failures: u32,
    pub is_express_start: bool,
}
