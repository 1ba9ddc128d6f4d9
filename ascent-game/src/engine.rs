//! Progression engine: the only writer of [`Session`].
//!
//! Every operation is total. A call whose preconditions do not hold leaves
//! the session untouched and reports [`Transition::Ignored`] with the reason.
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{LOG_TARGET_ENGINE, START_TICKET_COST};
use crate::rules::Rules;
use crate::state::{PendingFailure, Session};
use crate::tickets::TicketKind;

/// Precondition that stopped a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    AlreadyStarted,
    NotStarted,
    NoExpressTickets,
    NoRegularTickets,
    FailurePending,
    NoPendingFailure,
    SafeLevel,
    AlreadyFailedLevel,
    InsufficientTickets,
    MaxLevelReached,
}

impl Rejection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyStarted => "already_started",
            Self::NotStarted => "not_started",
            Self::NoExpressTickets => "no_express_tickets",
            Self::NoRegularTickets => "no_regular_tickets",
            Self::FailurePending => "failure_pending",
            Self::NoPendingFailure => "no_pending_failure",
            Self::SafeLevel => "safe_level",
            Self::AlreadyFailedLevel => "already_failed_level",
            Self::InsufficientTickets => "insufficient_tickets",
            Self::MaxLevelReached => "max_level_reached",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Applied,
    Ignored(Rejection),
}

impl Transition {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    #[must_use]
    pub const fn rejection(self) -> Option<Rejection> {
        match self {
            Self::Applied => None,
            Self::Ignored(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    rules: Rules,
    session: Session,
    generation: u64,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(Rules::default_config())
    }
}

impl ProgressionEngine {
    #[must_use]
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            session: Session::default(),
            generation: 0,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Session generation; bumped by every `start` and `quit`.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// True when both pools hold tickets, so the player picks a start mode.
    #[must_use]
    pub const fn can_start_with_choice(&self) -> bool {
        self.session.regular_tickets > 0 && self.session.express_tickets > 0
    }

    pub fn set_ticket_count(&mut self, kind: TicketKind, value: u32) -> Transition {
        if self.session.started {
            return Self::ignore("set_ticket_count", Rejection::AlreadyStarted);
        }
        *self.session.tickets_mut(kind) = value;
        Transition::Applied
    }

    pub fn start(&mut self, express: bool) -> Transition {
        if self.session.started {
            return Self::ignore("start", Rejection::AlreadyStarted);
        }
        let kind = if express {
            TicketKind::Express
        } else {
            TicketKind::Regular
        };
        let Some(remaining) = self.session.tickets(kind).checked_sub(START_TICKET_COST) else {
            let reason = if express {
                Rejection::NoExpressTickets
            } else {
                Rejection::NoRegularTickets
            };
            return Self::ignore("start", reason);
        };

        *self.session.tickets_mut(kind) = remaining;
        let level = self.rules.start_level(express);
        self.session.started = true;
        self.session.level = level;
        self.session.is_safe_level = self.rules.is_safe_level(level);
        self.session.total_failures = 0;
        self.session.is_express_start = express;
        self.session.has_failed_current_level = false;
        self.session.pending_failure = None;
        self.session.max_failures_covered = 0;
        self.generation += 1;
        debug!(
            target: LOG_TARGET_ENGINE,
            "session {} started at level {} ({} start, {} regular tickets left)",
            self.generation,
            level,
            kind,
            self.session.regular_tickets
        );
        Transition::Applied
    }

    pub fn trigger_failure(&mut self) -> Transition {
        if let Some(reason) = self.failure_blocker() {
            return Self::ignore("trigger_failure", reason);
        }
        let cost = self.rules.failure_cost(self.session.total_failures);
        self.session.pending_failure = Some(PendingFailure { cost });
        self.session.has_failed_current_level = true;
        debug!(
            target: LOG_TARGET_ENGINE,
            "failure on level {} costs {} tickets",
            self.session.level,
            cost
        );
        Transition::Applied
    }

    /// Pay for the pending failure, or quit when `pay` is false.
    pub fn resolve_failure(&mut self, pay: bool) -> Transition {
        let Some(pending) = self.session.pending_failure else {
            return Self::ignore("resolve_failure", Rejection::NoPendingFailure);
        };
        if !pay {
            return self.quit();
        }
        let Some(remaining) = self.session.regular_tickets.checked_sub(pending.cost) else {
            return Self::ignore("resolve_failure", Rejection::InsufficientTickets);
        };
        self.session.regular_tickets = remaining;
        self.session.total_failures = self.session.total_failures.saturating_add(1);
        self.session.pending_failure = None;
        Transition::Applied
    }

    pub fn advance_level(&mut self) -> Transition {
        if !self.session.started {
            return Self::ignore("advance_level", Rejection::NotStarted);
        }
        if self.session.has_pending_failure() {
            return Self::ignore("advance_level", Rejection::FailurePending);
        }
        if self.session.level >= self.rules.max_level {
            return Self::ignore("advance_level", Rejection::MaxLevelReached);
        }
        self.session.level += 1;
        self.session.is_safe_level = self.rules.is_safe_level(self.session.level);
        self.session.has_failed_current_level = false;
        Transition::Applied
    }

    /// Reset to the not-started baseline, pre-start pools included.
    pub fn quit(&mut self) -> Transition {
        let was_started = self.session.started;
        self.session = Session::default();
        self.generation += 1;
        if was_started {
            debug!(target: LOG_TARGET_ENGINE, "session ended by quit");
        }
        Transition::Applied
    }

    /// Store the one-shot max-failures answer if it belongs to the live session.
    pub fn record_max_failures_covered(&mut self, generation: u64, value: u32) -> bool {
        if generation != self.generation || !self.session.started {
            debug!(
                target: LOG_TARGET_ENGINE,
                "dropping max-failures answer for session {generation} (current {})",
                self.generation
            );
            return false;
        }
        self.session.max_failures_covered = value;
        true
    }

    /// Why a failure cannot be triggered right now, if anything prevents it.
    #[must_use]
    pub const fn failure_blocker(&self) -> Option<Rejection> {
        if !self.session.started {
            Some(Rejection::NotStarted)
        } else if self.session.has_pending_failure() {
            Some(Rejection::FailurePending)
        } else if self.session.is_safe_level {
            Some(Rejection::SafeLevel)
        } else if self.session.has_failed_current_level {
            Some(Rejection::AlreadyFailedLevel)
        } else {
            None
        }
    }

    fn ignore(operation: &str, reason: Rejection) -> Transition {
        debug!(target: LOG_TARGET_ENGINE, "{operation} ignored: {reason}");
        Transition::Ignored(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(regular: u32, express: u32, express_start: bool) -> ProgressionEngine {
        let mut engine = ProgressionEngine::default();
        engine.set_ticket_count(TicketKind::Regular, regular);
        engine.set_ticket_count(TicketKind::Express, express);
        assert_eq!(engine.start(express_start), Transition::Applied);
        engine
    }

    #[test]
    fn ticket_counts_drive_start_choice() {
        let mut engine = ProgressionEngine::default();
        assert!(!engine.can_start_with_choice());
        engine.set_ticket_count(TicketKind::Regular, 3);
        assert!(!engine.can_start_with_choice());
        engine.set_ticket_count(TicketKind::Express, 1);
        assert!(engine.can_start_with_choice());
        engine.set_ticket_count(TicketKind::Regular, 0);
        assert!(!engine.can_start_with_choice());
    }

    #[test]
    fn regular_start_spends_one_regular_ticket() {
        let engine = started(3, 0, false);
        let session = engine.session();
        assert!(session.started);
        assert_eq!(session.level, 1);
        assert_eq!(session.regular_tickets, 2);
        assert!(!session.is_express_start);
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn express_start_spends_express_ticket_only() {
        let engine = started(4, 1, true);
        let session = engine.session();
        assert_eq!(session.level, 20);
        assert_eq!(session.express_tickets, 0);
        assert_eq!(session.regular_tickets, 4);
        assert!(session.is_express_start);
    }

    #[test]
    fn start_requires_matching_pool() {
        let mut engine = ProgressionEngine::default();
        assert_eq!(
            engine.start(true),
            Transition::Ignored(Rejection::NoExpressTickets)
        );
        assert_eq!(
            engine.start(false),
            Transition::Ignored(Rejection::NoRegularTickets)
        );
        assert_eq!(engine.session(), &Session::default());
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn start_twice_is_ignored() {
        let mut engine = started(5, 1, false);
        let before = engine.session().clone();
        assert_eq!(
            engine.start(true),
            Transition::Ignored(Rejection::AlreadyStarted)
        );
        assert_eq!(engine.session(), &before);
        assert_eq!(
            engine.set_ticket_count(TicketKind::Regular, 99),
            Transition::Ignored(Rejection::AlreadyStarted)
        );
        assert_eq!(engine.session().regular_tickets, 4);
    }

    #[test]
    fn failure_then_pay_charges_table_cost() {
        let mut engine = started(10, 0, false);
        for expected_cost in [0, 1, 2] {
            assert!(engine.trigger_failure().is_applied());
            assert_eq!(
                engine.session().pending_failure,
                Some(PendingFailure {
                    cost: expected_cost
                })
            );
            assert!(engine.resolve_failure(true).is_applied());
            assert!(engine.advance_level().is_applied());
        }
        assert_eq!(engine.session().total_failures, 3);
        assert_eq!(engine.session().regular_tickets, 9 - 3);
    }

    #[test]
    fn second_failure_on_same_level_is_ignored() {
        let mut engine = started(10, 0, false);
        assert!(engine.trigger_failure().is_applied());
        assert_eq!(
            engine.trigger_failure(),
            Transition::Ignored(Rejection::FailurePending)
        );
        engine.resolve_failure(true);
        assert_eq!(
            engine.trigger_failure(),
            Transition::Ignored(Rejection::AlreadyFailedLevel)
        );
        engine.advance_level();
        assert!(!engine.session().has_failed_current_level);
        assert!(engine.trigger_failure().is_applied());
    }

    #[test]
    fn safe_level_rejects_failure() {
        let mut engine = started(10, 0, false);
        for _ in 0..4 {
            engine.advance_level();
        }
        assert_eq!(engine.session().level, 5);
        assert!(engine.session().is_safe_level);
        assert_eq!(
            engine.trigger_failure(),
            Transition::Ignored(Rejection::SafeLevel)
        );
    }

    #[test]
    fn insufficient_tickets_keep_failure_pending() {
        let mut engine = started(2, 0, false);
        engine.trigger_failure();
        engine.resolve_failure(true);
        engine.advance_level();
        engine.trigger_failure();
        assert!(engine.resolve_failure(true).is_applied());
        assert_eq!(engine.session().regular_tickets, 0);
        engine.advance_level();
        engine.trigger_failure();
        assert_eq!(
            engine.resolve_failure(true),
            Transition::Ignored(Rejection::InsufficientTickets)
        );
        assert_eq!(
            engine.session().pending_failure,
            Some(PendingFailure { cost: 2 })
        );
        assert_eq!(
            engine.advance_level(),
            Transition::Ignored(Rejection::FailurePending)
        );
    }

    #[test]
    fn declining_to_pay_quits() {
        let mut engine = started(6, 2, false);
        engine.trigger_failure();
        assert!(engine.resolve_failure(false).is_applied());
        assert_eq!(engine.session(), &Session::default());
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn advance_stops_at_max_level() {
        let mut engine = started(1, 1, true);
        while engine.advance_level().is_applied() {}
        assert_eq!(engine.session().level, 50);
        assert_eq!(
            engine.advance_level(),
            Transition::Ignored(Rejection::MaxLevelReached)
        );
    }

    #[test]
    fn max_failures_answer_checks_generation() {
        let mut engine = started(5, 0, false);
        let generation = engine.generation();
        assert!(engine.record_max_failures_covered(generation, 3));
        assert_eq!(engine.session().max_failures_covered, 3);

        engine.quit();
        assert!(!engine.record_max_failures_covered(generation, 7));
        assert_eq!(engine.session().max_failures_covered, 0);
    }

    #[test]
    fn resolve_without_pending_is_ignored() {
        let mut engine = started(5, 0, false);
        assert_eq!(
            engine.resolve_failure(false),
            Transition::Ignored(Rejection::NoPendingFailure)
        );
        assert!(engine.session().started);
    }
}
