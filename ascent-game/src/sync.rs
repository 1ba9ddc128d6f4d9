//! Probability sync protocol.
//!
//! Decides when the oracle must be asked again, tags each request with the
//! session generation and a monotonically increasing sequence number, and
//! merges answers back into the [`Advisory`]. An answer tagged with an older
//! generation, or with a sequence number at or below the last applied one,
//! is discarded.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::advisory::Advisory;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT, LOG_TARGET_SYNC};
use crate::oracle::{MaxFailuresRequest, OracleError, ProbabilityRequest, ProbabilityResponse};
use crate::state::{Session, SyncKey};

/// Identity of an issued oracle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestTag {
    pub generation: u64,
    pub sequence: u64,
}

impl fmt::Display for RequestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}#{}", self.generation, self.sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Probability,
    MaxFailures,
}

impl RequestKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Probability => "probability",
            Self::MaxFailures => "max_failures",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a delivered oracle answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    /// A newer answer for the same session was already applied.
    Superseded,
    /// The answer belongs to a session that has since ended or restarted.
    StaleGeneration,
    /// The call failed or the body was unusable; advisory data is unchanged.
    Failed,
}

/// Observability collaborator for oracle failures.
pub trait SyncReporter: fmt::Debug + Send + Sync {
    fn oracle_failed(&self, kind: RequestKind, tag: RequestTag, error: &OracleError);
}

/// Reports oracle failures through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl SyncReporter for LogReporter {
    fn oracle_failed(&self, kind: RequestKind, tag: RequestTag, error: &OracleError) {
        warn!(target: LOG_TARGET_SYNC, "{kind} request {tag} failed: {error}");
    }
}

/// Timing knobs for oracle requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// `None` waits forever, leaving advisory data stale if the oracle never answers.
    pub request_timeout: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// A request paired with the tag its answer must carry back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tagged<T> {
    pub tag: RequestTag,
    pub request: T,
}

#[derive(Debug)]
pub struct ProbabilitySync {
    advisory: Option<Advisory>,
    generation: u64,
    next_sequence: u64,
    last_applied: u64,
    last_key: Option<SyncKey>,
    reporter: Box<dyn SyncReporter>,
}

impl Default for ProbabilitySync {
    fn default() -> Self {
        Self::new(Box::new(LogReporter))
    }
}

impl ProbabilitySync {
    #[must_use]
    pub fn new(reporter: Box<dyn SyncReporter>) -> Self {
        Self {
            advisory: None,
            generation: 0,
            next_sequence: 1,
            last_applied: 0,
            last_key: None,
            reporter,
        }
    }

    /// Latest applied advisory figures; `None` until the first answer lands.
    #[must_use]
    pub const fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Sequence number of the most recently applied probability answer.
    #[must_use]
    pub const fn last_applied(&self) -> u64 {
        self.last_applied
    }

    /// Drop advisory data and adopt a new session generation.
    pub fn reset(&mut self, generation: u64) {
        self.advisory = None;
        self.generation = generation;
        self.last_applied = 0;
        self.last_key = None;
    }

    /// Issue a refresh if any trigger field changed while the session is running.
    pub fn observe(&mut self, session: &Session) -> Option<Tagged<ProbabilityRequest>> {
        let key = session.sync_key();
        if self.last_key == Some(key) {
            return None;
        }
        self.last_key = Some(key);
        if !session.started {
            return None;
        }
        let tag = self.issue();
        debug!(
            target: LOG_TARGET_SYNC,
            "probability request {tag} for level {} ({} tickets, {} failures)",
            key.level,
            key.regular_tickets,
            key.total_failures
        );
        Some(Tagged {
            tag,
            request: ProbabilityRequest::for_session(session),
        })
    }

    /// The one-shot max-failures request issued right after a start.
    pub fn begin_session(&mut self, session: &Session) -> Tagged<MaxFailuresRequest> {
        let tag = self.issue();
        Tagged {
            tag,
            request: MaxFailuresRequest::for_session(session),
        }
    }

    pub fn apply_probability(
        &mut self,
        tag: RequestTag,
        result: Result<ProbabilityResponse, OracleError>,
    ) -> ApplyOutcome {
        if tag.generation != self.generation {
            debug!(
                target: LOG_TARGET_SYNC,
                "discarding probability answer {tag}: session is now g{}",
                self.generation
            );
            return ApplyOutcome::StaleGeneration;
        }
        let advisory = match result.and_then(ProbabilityResponse::into_advisory) {
            Ok(advisory) => advisory,
            Err(error) => {
                self.report(RequestKind::Probability, tag, &error);
                return ApplyOutcome::Failed;
            }
        };
        if tag.sequence <= self.last_applied {
            debug!(
                target: LOG_TARGET_SYNC,
                "discarding probability answer {tag}: #{} already applied",
                self.last_applied
            );
            return ApplyOutcome::Superseded;
        }
        self.advisory = Some(advisory);
        self.last_applied = tag.sequence;
        ApplyOutcome::Applied
    }

    pub fn report(&self, kind: RequestKind, tag: RequestTag, error: &OracleError) {
        self.reporter.oracle_failed(kind, tag, error);
    }

    fn issue(&mut self) -> RequestTag {
        let tag = RequestTag {
            generation: self.generation,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        tag
    }
}
