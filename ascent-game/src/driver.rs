//! Tokio-backed dispatcher for oracle requests.
//!
//! Transitions return immediately. Each oracle request runs on its own task,
//! so several can be in flight and their answers may arrive in any order;
//! [`Game::deliver`] sorts out which ones still count.
use log::debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::ProbabilityOracle;
use crate::constants::LOG_TARGET_DRIVER;
use crate::engine::Transition;
use crate::game::{ActionOutcome, Game, GameView, InboundResponse, OutboundRequest};
use crate::input::Gesture;
use crate::oracle::OracleError;
use crate::sync::{ApplyOutcome, RequestTag, SyncConfig};
use crate::tickets::TicketKind;

/// Answer merged by the driver, with what the sync protocol did with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub tag: RequestTag,
    pub outcome: ApplyOutcome,
}

/// Owns a [`Game`] and keeps its advisory data fed from an oracle.
///
/// Must be used from within a tokio runtime.
pub struct GameDriver<O: ProbabilityOracle + ?Sized + 'static> {
    game: Game,
    oracle: Arc<O>,
    config: SyncConfig,
    tx: mpsc::UnboundedSender<InboundResponse>,
    rx: mpsc::UnboundedReceiver<InboundResponse>,
    in_flight: usize,
}

impl<O: ProbabilityOracle + ?Sized + 'static> GameDriver<O> {
    #[must_use]
    pub fn new(game: Game, oracle: Arc<O>, config: SyncConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            game,
            oracle,
            config,
            tx,
            rx,
            in_flight: 0,
        }
    }

    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    #[must_use]
    pub fn view(&self) -> GameView {
        self.game.view()
    }

    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn set_ticket_count(&mut self, kind: TicketKind, value: u32) -> Transition {
        let outcome = self.game.set_ticket_count(kind, value);
        self.dispatch(outcome)
    }

    pub fn set_ticket_input(&mut self, kind: TicketKind, raw: &str) -> Transition {
        let outcome = self.game.set_ticket_input(kind, raw);
        self.dispatch(outcome)
    }

    pub fn start(&mut self, express: bool) -> Transition {
        let outcome = self.game.start(express);
        self.dispatch(outcome)
    }

    pub fn trigger_failure(&mut self) -> Transition {
        let outcome = self.game.trigger_failure();
        self.dispatch(outcome)
    }

    pub fn resolve_failure(&mut self, pay: bool) -> Transition {
        let outcome = self.game.resolve_failure(pay);
        self.dispatch(outcome)
    }

    pub fn advance_level(&mut self) -> Transition {
        let outcome = self.game.advance_level();
        self.dispatch(outcome)
    }

    pub fn quit(&mut self) -> Transition {
        let outcome = self.game.quit();
        self.dispatch(outcome)
    }

    pub fn gesture(&mut self, gesture: Gesture) -> Transition {
        let outcome = self.game.gesture(gesture);
        self.dispatch(outcome)
    }

    /// Merge every answer that has already arrived, without waiting.
    pub fn pump(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Ok(response) = self.rx.try_recv() {
            deliveries.push(self.merge(response));
        }
        deliveries
    }

    /// Wait for the next answer and merge it. `None` when nothing is in flight.
    pub async fn next_response(&mut self) -> Option<Delivery> {
        if self.in_flight == 0 {
            return None;
        }
        let response = self.rx.recv().await?;
        Some(self.merge(response))
    }

    /// Wait until every outstanding request has answered or timed out.
    ///
    /// With no request timeout configured this waits as long as the oracle does.
    pub async fn settle(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Some(delivery) = self.next_response().await {
            deliveries.push(delivery);
        }
        deliveries
    }

    fn merge(&mut self, response: InboundResponse) -> Delivery {
        self.in_flight = self.in_flight.saturating_sub(1);
        let tag = response.tag();
        let outcome = self.game.deliver(response);
        debug!(target: LOG_TARGET_DRIVER, "answer {tag} -> {outcome:?}");
        Delivery { tag, outcome }
    }

    fn dispatch(&mut self, outcome: ActionOutcome) -> Transition {
        for request in outcome.requests {
            self.spawn_request(request);
        }
        outcome.transition
    }

    fn spawn_request(&mut self, request: OutboundRequest) {
        let oracle = Arc::clone(&self.oracle);
        let tx = self.tx.clone();
        let limit = self.config.request_timeout;
        self.in_flight += 1;
        tokio::spawn(async move {
            let response = match request {
                OutboundRequest::Probability { tag, request } => InboundResponse::Probability {
                    tag,
                    result: bounded(limit, oracle.probability(&request)).await,
                },
                OutboundRequest::MaxFailures { tag, request } => InboundResponse::MaxFailures {
                    tag,
                    result: bounded(limit, oracle.max_failures(&request)).await,
                },
            };
            // The driver may already be gone; its answers no longer matter then.
            let _ = tx.send(response);
        });
    }
}

async fn bounded<T>(
    limit: Option<Duration>,
    call: impl Future<Output = Result<T, OracleError>>,
) -> Result<T, OracleError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(OracleError::Timeout(limit))),
        None => call.await,
    }
}
