use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ascent_game::{
    Advisory, ApplyOutcome, Delivery, Game, GameDriver, Gesture, ProbabilityOracle,
    ProbabilityRequest, ReferenceOracle, Rejection, Rules, Session, SyncConfig, TicketKind,
    Transition,
};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::logic::policy::{PlayerAction, PlayerPolicy, PlayerStrategy};
use crate::oracle::OracleSettings;

pub const DEFAULT_MAX_ACTIONS: usize = 400;
const FIGURE_TOLERANCE: f64 = 1e-9;

/// Tickets handed to the player before each session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPlan {
    pub regular: u32,
    pub express: u32,
    pub express_start: bool,
}

impl StartPlan {
    #[must_use]
    pub const fn regular(regular: u32) -> Self {
        Self {
            regular,
            express: 0,
            express_start: false,
        }
    }

    #[must_use]
    pub const fn express(regular: u32, express: u32) -> Self {
        Self {
            regular,
            express,
            express_start: true,
        }
    }
}

pub type Expectation = fn(&SimulationSummary) -> Result<()>;

/// Everything needed to replay one scenario iteration.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub start: StartPlan,
    pub strategy: PlayerStrategy,
    pub max_actions: usize,
    pub sessions: usize,
    pub max_latency: Option<Duration>,
    pub expectations: Vec<Expectation>,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(start: StartPlan, strategy: PlayerStrategy) -> Self {
        Self {
            start,
            strategy,
            max_actions: DEFAULT_MAX_ACTIONS,
            sessions: 1,
            max_latency: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: usize) -> Self {
        self.sessions = sessions.max(1);
        self
    }

    /// Override the oracle latency ceiling for this plan.
    #[must_use]
    pub fn with_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = Some(max_latency);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }
}

/// Tally of what happened to oracle answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub applied: usize,
    pub superseded: usize,
    pub stale: usize,
    pub failed: usize,
}

impl DeliveryStats {
    fn record(&mut self, deliveries: &[Delivery]) {
        for delivery in deliveries {
            match delivery.outcome {
                ApplyOutcome::Applied => self.applied += 1,
                ApplyOutcome::Superseded => self.superseded += 1,
                ApplyOutcome::StaleGeneration => self.stale += 1,
                ApplyOutcome::Failed => self.failed += 1,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: PlayerStrategy,
    pub sessions_started: usize,
    pub actions: usize,
    pub ignored_actions: usize,
    pub failures_paid: u32,
    pub highest_level: u32,
    pub reached_top: bool,
    pub quits: usize,
    pub final_session: Session,
    pub advisory: Option<Advisory>,
    pub expected_advisory: Option<Advisory>,
    pub deliveries: DeliveryStats,
    pub violations: Vec<String>,
    pub action_log: Vec<String>,
}

/// Runs plans against a [`GameDriver`] and checks the session after every action.
pub struct Simulator {
    rules: Rules,
    oracle: OracleSettings,
    sync: SyncConfig,
}

impl Simulator {
    #[must_use]
    pub fn new(rules: Rules, oracle: OracleSettings, sync: SyncConfig) -> Self {
        Self {
            rules,
            oracle,
            sync,
        }
    }

    pub async fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
        let mut settings = self.oracle.clone();
        if let Some(max_latency) = plan.max_latency {
            settings.max_latency = max_latency;
        }
        let oracle = settings.build_jittered(&self.rules, seed)?;
        let mut run = Run::new(&self.rules, plan, seed, oracle, self.sync);

        for _ in 0..plan.sessions {
            run.play_session(plan).await;
            if run.summary.actions >= plan.max_actions {
                break;
            }
        }
        run.finish().await;
        Ok(run.summary)
    }
}

struct Run<'a> {
    rules: &'a Rules,
    driver: GameDriver<dyn ProbabilityOracle>,
    policy: Box<dyn PlayerPolicy + Send>,
    world: ChaCha20Rng,
    summary: SimulationSummary,
}

impl<'a> Run<'a> {
    fn new(
        rules: &'a Rules,
        plan: &SimulationPlan,
        seed: u64,
        oracle: Arc<dyn ProbabilityOracle>,
        sync: SyncConfig,
    ) -> Self {
        Self {
            rules,
            driver: GameDriver::new(Game::new(rules.clone()), oracle, sync),
            policy: plan.strategy.create_policy(seed),
            world: ChaCha20Rng::seed_from_u64(seed),
            summary: SimulationSummary {
                seed,
                strategy: plan.strategy,
                sessions_started: 0,
                actions: 0,
                ignored_actions: 0,
                failures_paid: 0,
                highest_level: 0,
                reached_top: false,
                quits: 0,
                final_session: Session::default(),
                advisory: None,
                expected_advisory: None,
                deliveries: DeliveryStats::default(),
                violations: Vec::new(),
                action_log: Vec::new(),
            },
        }
    }

    async fn play_session(&mut self, plan: &SimulationPlan) {
        if self.driver.game().session().started {
            self.perform(PlayerAction::Quit);
        }
        self.perform(PlayerAction::SetTickets(TicketKind::Regular, plan.start.regular));
        self.perform(PlayerAction::SetTickets(TicketKind::Express, plan.start.express));
        self.perform(PlayerAction::Start {
            express: plan.start.express_start,
        });

        while self.summary.actions < plan.max_actions {
            let chaos = matches!(plan.strategy, PlayerStrategy::Chaos);
            if !chaos && self.driver.game().session().has_pending_failure() {
                // Players read the odds before deciding whether to pay.
                let deliveries = self.driver.settle().await;
                self.summary.deliveries.record(&deliveries);
            }
            let view = self.driver.view();
            if !chaos && !view.session.started {
                break;
            }
            if !chaos && view.session.level >= self.rules.max_level && !view.fail_enabled {
                self.summary.reached_top = true;
                break;
            }
            let level_failed = self.world.gen_bool(self.rules.failure_probability);
            let action = self.policy.next_action(&view, level_failed);
            self.perform(action);
            let deliveries = self.driver.pump();
            self.summary.deliveries.record(&deliveries);
            tokio::task::yield_now().await;
        }
    }

    fn perform(&mut self, action: PlayerAction) {
        let before = self.driver.game().session().clone();
        let transition = match action {
            PlayerAction::Advance => self.driver.advance_level(),
            PlayerAction::Fail => self.driver.trigger_failure(),
            PlayerAction::Pay => self.driver.resolve_failure(true),
            PlayerAction::Decline => self.driver.resolve_failure(false),
            PlayerAction::Quit => self.driver.quit(),
            PlayerAction::Key(gesture) => self.driver.gesture(gesture),
            PlayerAction::SetTickets(kind, count) => self.driver.set_ticket_count(kind, count),
            PlayerAction::Start { express } => self.driver.start(express),
        };
        let after = self.driver.game().session().clone();

        self.summary.actions += 1;
        if transition.is_applied() {
            match action {
                PlayerAction::Start { .. } => self.summary.sessions_started += 1,
                PlayerAction::Pay => self.summary.failures_paid += 1,
                PlayerAction::Quit | PlayerAction::Decline if before.started => {
                    self.summary.quits += 1;
                }
                _ => {}
            }
        } else {
            self.summary.ignored_actions += 1;
        }
        if after.started {
            self.summary.highest_level = self.summary.highest_level.max(after.level);
        }
        self.summary
            .action_log
            .push(format!("{action} -> {}", describe(transition)));
        debug!(
            target: "ascent::tester",
            "[{}] {action} -> {transition:?}",
            self.policy.name()
        );

        if let Err(violation) = check_transition(self.rules, &before, &after, action, transition) {
            self.summary.violations.push(format!(
                "action #{} {action}: {violation}",
                self.summary.actions
            ));
        }
        if matches!(action, PlayerAction::Quit)
            && self.driver.game().advisory().is_some()
        {
            self.summary
                .violations
                .push("advisory survived quit".to_string());
        }
    }

    async fn finish(&mut self) {
        let deliveries = self.driver.settle().await;
        self.summary.deliveries.record(&deliveries);

        let game = self.driver.game();
        let session = game.session().clone();
        self.summary.advisory = game.advisory().copied();
        self.summary.expected_advisory = session.started.then(|| {
            ReferenceOracle::new(self.rules.clone())
                .calculate(&ProbabilityRequest::for_session(&session))
                .into_advisory()
                .ok()
        })
        .flatten();
        self.summary.final_session = session;

        if let Err(violation) = check_settled(&self.summary) {
            self.summary.violations.push(violation);
        }
    }
}

fn describe(transition: Transition) -> String {
    match transition {
        Transition::Applied => "applied".to_string(),
        Transition::Ignored(reason) => format!("ignored ({reason})"),
    }
}

/// Checks one transition against the session invariants.
pub fn check_transition(
    rules: &Rules,
    before: &Session,
    after: &Session,
    action: PlayerAction,
    transition: Transition,
) -> Result<(), String> {
    if after.started && !(1..=rules.max_level).contains(&after.level) {
        return Err(format!("level {} out of range", after.level));
    }
    if !after.started {
        let baseline = Session {
            regular_tickets: after.regular_tickets,
            express_tickets: after.express_tickets,
            ..Session::default()
        };
        if *after != baseline {
            return Err(format!("idle session is not the baseline: {after:?}"));
        }
    }
    if after.pending_failure.is_some() && !after.has_failed_current_level {
        return Err("pending failure without a failed level".to_string());
    }
    if after.is_safe_level != rules.is_safe_level(after.level) {
        return Err(format!("safe flag wrong for level {}", after.level));
    }
    if let Transition::Ignored(reason) = transition
        && before != after
    {
        return Err(format!("ignored ({reason}) but the session changed"));
    }
    if before.started && after.started {
        if after.total_failures < before.total_failures {
            return Err("total failures decreased".to_string());
        }
        if after.regular_tickets > before.regular_tickets
            || after.express_tickets > before.express_tickets
        {
            return Err("tickets grew mid-session".to_string());
        }
    }

    match action {
        PlayerAction::Advance | PlayerAction::Key(Gesture::Advance) if before.started => {
            let blocked = before.level >= rules.max_level || before.has_pending_failure();
            match transition {
                Transition::Applied if blocked => {
                    return Err("advanced while blocked".to_string());
                }
                Transition::Applied => {
                    if after.level != before.level + 1 || after.has_failed_current_level {
                        return Err(format!(
                            "advance went {} -> {} (failed flag {})",
                            before.level, after.level, after.has_failed_current_level
                        ));
                    }
                }
                Transition::Ignored(_) if !blocked => {
                    return Err("advance ignored while open".to_string());
                }
                Transition::Ignored(_) => {}
            }
        }
        PlayerAction::Fail | PlayerAction::Key(Gesture::Fail) if transition.is_applied() => {
            if before.is_safe_level || before.has_failed_current_level {
                return Err(format!("failure accepted on level {}", before.level));
            }
            let expected = rules.failure_cost(before.total_failures);
            if after.pending_failure.map(|pending| pending.cost) != Some(expected) {
                return Err(format!("failure should cost {expected}"));
            }
        }
        PlayerAction::Pay if transition.is_applied() => {
            let cost = before.pending_failure.map_or(0, |pending| pending.cost);
            if before.regular_tickets - after.regular_tickets != cost {
                return Err(format!("payment did not charge {cost}"));
            }
        }
        PlayerAction::Pay => {
            if transition.rejection() == Some(Rejection::InsufficientTickets)
                && !after.has_pending_failure()
            {
                return Err("unpaid failure disappeared".to_string());
            }
        }
        PlayerAction::Quit | PlayerAction::Decline if transition.is_applied() => {
            if *after != Session::default() {
                return Err("quit did not restore the baseline".to_string());
            }
        }
        PlayerAction::Start { express } if transition.is_applied() => {
            if after.level != rules.start_level(express) || after.has_failed_current_level {
                return Err(format!("started at level {}", after.level));
            }
            if express && after.regular_tickets != before.regular_tickets {
                return Err("express start spent regular tickets".to_string());
            }
        }
        _ => {}
    }
    Ok(())
}

/// Checks the settled advisory against the reference calculation.
pub fn check_settled(summary: &SimulationSummary) -> Result<(), String> {
    if !summary.final_session.started {
        return match summary.advisory {
            Some(_) => Err("advisory present after the session ended".to_string()),
            None => Ok(()),
        };
    }
    if summary.deliveries.failed > 0 {
        // A failed refresh legitimately leaves older figures in place.
        return Ok(());
    }
    match (summary.advisory, summary.expected_advisory) {
        (Some(actual), Some(expected)) if figures_match(&actual, &expected) => Ok(()),
        (actual, expected) => Err(format!(
            "settled advisory {actual:?} does not match the latest session {expected:?}"
        )),
    }
}

fn figures_match(actual: &Advisory, expected: &Advisory) -> bool {
    (actual.current_probability - expected.current_probability).abs() < FIGURE_TOLERANCE
        && (actual.restart_probability - expected.restart_probability).abs() < FIGURE_TOLERANCE
        && (actual.expected_additional_cost - expected.expected_additional_cost).abs()
            < FIGURE_TOLERANCE
        && actual.oracle_failure_cost == expected.oracle_failure_cost
}
