//! Single-threaded owner of the session and its advisory data.
//!
//! [`Game`] runs a transition, evaluates the refresh trigger set, and hands
//! back the oracle requests the caller must dispatch. Answers come back
//! through [`Game::deliver`] in whatever order the oracle produces them.
use serde::{Deserialize, Serialize};

use crate::advisory::{Advisory, format_expected_cost, format_probability};
use crate::engine::{ProgressionEngine, Rejection, Transition};
use crate::input::Gesture;
use crate::oracle::{
    MaxFailuresRequest, MaxFailuresResponse, OracleError, ProbabilityRequest, ProbabilityResponse,
};
use crate::rules::Rules;
use crate::state::Session;
use crate::sync::{
    ApplyOutcome, LogReporter, ProbabilitySync, RequestKind, RequestTag, SyncReporter,
};
use crate::tickets::{TicketKind, parse_ticket_input};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundRequest {
    Probability {
        tag: RequestTag,
        request: ProbabilityRequest,
    },
    MaxFailures {
        tag: RequestTag,
        request: MaxFailuresRequest,
    },
}

impl OutboundRequest {
    #[must_use]
    pub const fn tag(&self) -> RequestTag {
        match self {
            Self::Probability { tag, .. } | Self::MaxFailures { tag, .. } => *tag,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Probability { .. } => RequestKind::Probability,
            Self::MaxFailures { .. } => RequestKind::MaxFailures,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundResponse {
    Probability {
        tag: RequestTag,
        result: Result<ProbabilityResponse, OracleError>,
    },
    MaxFailures {
        tag: RequestTag,
        result: Result<MaxFailuresResponse, OracleError>,
    },
}

impl InboundResponse {
    #[must_use]
    pub const fn tag(&self) -> RequestTag {
        match self {
            Self::Probability { tag, .. } | Self::MaxFailures { tag, .. } => *tag,
        }
    }
}

/// Transition result plus the oracle requests it scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ActionOutcome {
    pub transition: Transition,
    pub requests: Vec<OutboundRequest>,
}

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub session: Session,
    pub advisory: Option<Advisory>,
    pub show_start_options: bool,
    pub probability_label: String,
    pub restart_probability_label: String,
    pub expected_cost_label: String,
    pub advance_enabled: bool,
    pub fail_enabled: bool,
    pub pay_enabled: bool,
}

#[derive(Debug)]
pub struct Game {
    engine: ProgressionEngine,
    sync: ProbabilitySync,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(Rules::default_config())
    }
}

impl Game {
    #[must_use]
    pub fn new(rules: Rules) -> Self {
        Self::with_reporter(rules, Box::new(LogReporter))
    }

    #[must_use]
    pub fn with_reporter(rules: Rules, reporter: Box<dyn SyncReporter>) -> Self {
        Self {
            engine: ProgressionEngine::new(rules),
            sync: ProbabilitySync::new(reporter),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        self.engine.session()
    }

    #[must_use]
    pub const fn advisory(&self) -> Option<&Advisory> {
        self.sync.advisory()
    }

    #[must_use]
    pub const fn rules(&self) -> &Rules {
        self.engine.rules()
    }

    #[must_use]
    pub const fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.engine.generation()
    }

    pub fn set_ticket_count(&mut self, kind: TicketKind, value: u32) -> ActionOutcome {
        let transition = self.engine.set_ticket_count(kind, value);
        self.finish(transition)
    }

    /// Same as [`Game::set_ticket_count`] for raw text-field input.
    pub fn set_ticket_input(&mut self, kind: TicketKind, raw: &str) -> ActionOutcome {
        self.set_ticket_count(kind, parse_ticket_input(raw))
    }

    pub fn start(&mut self, express: bool) -> ActionOutcome {
        let transition = self.engine.start(express);
        self.finish(transition)
    }

    pub fn trigger_failure(&mut self) -> ActionOutcome {
        let transition = self.engine.trigger_failure();
        self.finish(transition)
    }

    pub fn resolve_failure(&mut self, pay: bool) -> ActionOutcome {
        let transition = self.engine.resolve_failure(pay);
        self.finish(transition)
    }

    pub fn advance_level(&mut self) -> ActionOutcome {
        let transition = self.engine.advance_level();
        self.finish(transition)
    }

    pub fn quit(&mut self) -> ActionOutcome {
        let transition = self.engine.quit();
        self.finish(transition)
    }

    /// Apply a keyboard-style gesture, honoring the same suppression as the controls.
    pub fn gesture(&mut self, gesture: Gesture) -> ActionOutcome {
        if let Some(reason) = self.gesture_blocker(gesture) {
            return ActionOutcome {
                transition: Transition::Ignored(reason),
                requests: Vec::new(),
            };
        }
        match gesture {
            Gesture::Advance => self.advance_level(),
            Gesture::Fail => self.trigger_failure(),
        }
    }

    /// Merge an oracle answer.
    pub fn deliver(&mut self, response: InboundResponse) -> ApplyOutcome {
        match response {
            InboundResponse::Probability { tag, result } => {
                self.sync.apply_probability(tag, result)
            }
            InboundResponse::MaxFailures { tag, result } => {
                if tag.generation != self.engine.generation() {
                    return ApplyOutcome::StaleGeneration;
                }
                match result {
                    Ok(answer) => {
                        if self
                            .engine
                            .record_max_failures_covered(tag.generation, answer.max_failures_covered)
                        {
                            ApplyOutcome::Applied
                        } else {
                            ApplyOutcome::StaleGeneration
                        }
                    }
                    Err(error) => {
                        self.sync.report(RequestKind::MaxFailures, tag, &error);
                        ApplyOutcome::Failed
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn view(&self) -> GameView {
        let session = self.session().clone();
        let advisory = self.advisory().copied();
        let figures = advisory.unwrap_or_default();
        let pending_cost = session.pending_failure.map(|pending| pending.cost);
        GameView {
            show_start_options: !session.started && self.engine.can_start_with_choice(),
            probability_label: format_probability(figures.current_probability),
            restart_probability_label: format_probability(figures.restart_probability),
            expected_cost_label: format_expected_cost(figures.expected_additional_cost),
            advance_enabled: self.gesture_blocker(Gesture::Advance).is_none(),
            fail_enabled: self.gesture_blocker(Gesture::Fail).is_none(),
            pay_enabled: pending_cost.is_some_and(|cost| session.regular_tickets >= cost),
            session,
            advisory,
        }
    }

    fn gesture_blocker(&self, gesture: Gesture) -> Option<Rejection> {
        let session = self.session();
        if !session.started {
            return Some(Rejection::NotStarted);
        }
        if session.has_pending_failure() {
            return Some(Rejection::FailurePending);
        }
        match gesture {
            Gesture::Advance => {
                (session.level >= self.rules().max_level).then_some(Rejection::MaxLevelReached)
            }
            Gesture::Fail => self.engine.failure_blocker(),
        }
    }

    fn finish(&mut self, transition: Transition) -> ActionOutcome {
        let mut requests = Vec::new();
        let generation = self.engine.generation();
        if generation != self.sync.generation() {
            self.sync.reset(generation);
            if self.engine.session().started {
                let issued = self.sync.begin_session(self.engine.session());
                requests.push(OutboundRequest::MaxFailures {
                    tag: issued.tag,
                    request: issued.request,
                });
            }
        }
        if let Some(issued) = self.sync.observe(self.engine.session()) {
            requests.push(OutboundRequest::Probability {
                tag: issued.tag,
                request: issued.request,
            });
        }
        ActionOutcome {
            transition,
            requests,
        }
    }
}
