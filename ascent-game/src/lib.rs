//! Ascent Game Engine
//!
//! Platform-agnostic session state machine for Ascent: a ticket-funded climb
//! through fifty levels where failures cost escalating tickets and an external
//! oracle supplies the odds of reaching the top. This crate owns the rules and
//! the sync protocol; rendering and transport live elsewhere.

pub mod advisory;
pub mod constants;
#[cfg(feature = "async")]
pub mod driver;
pub mod engine;
pub mod game;
pub mod input;
pub mod numbers;
pub mod oracle;
pub mod rules;
pub mod state;
pub mod sync;
pub mod tickets;

// Re-export commonly used types
pub use advisory::{Advisory, format_expected_cost, format_probability};
#[cfg(feature = "async")]
pub use driver::{Delivery, GameDriver};
pub use engine::{ProgressionEngine, Rejection, Transition};
pub use game::{ActionOutcome, Game, GameView, InboundResponse, OutboundRequest};
pub use input::Gesture;
pub use oracle::{
    MaxFailuresRequest, MaxFailuresResponse, OracleError, ProbabilityRequest, ProbabilityResponse,
    ReferenceOracle,
};
pub use rules::{Rules, RulesError};
pub use state::{PendingFailure, Session, SyncKey};
pub use sync::{
    ApplyOutcome, LogReporter, ProbabilitySync, RequestKind, RequestTag, SyncConfig, SyncReporter,
};
pub use tickets::{TicketKind, parse_ticket_input};

/// Trait for abstracting the probability oracle.
/// Platform-specific implementations should provide this
#[async_trait::async_trait]
pub trait ProbabilityOracle: Send + Sync {
    /// Success odds and expected cost for a session snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the oracle cannot be reached or its answer is unusable.
    async fn probability(
        &self,
        request: &ProbabilityRequest,
    ) -> Result<ProbabilityResponse, OracleError>;

    /// Failures the starting tickets can cover, asked once per session.
    ///
    /// # Errors
    ///
    /// Returns an error if the oracle cannot be reached or its answer is unusable.
    async fn max_failures(
        &self,
        request: &MaxFailuresRequest,
    ) -> Result<MaxFailuresResponse, OracleError>;
}
