use std::fmt;

use ascent_game::{GameView, Gesture, TicketKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// One thing an automated player can do to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Advance,
    Fail,
    Pay,
    Decline,
    Quit,
    Key(Gesture),
    SetTickets(TicketKind, u32),
    Start { express: bool },
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => f.write_str("advance"),
            Self::Fail => f.write_str("fail"),
            Self::Pay => f.write_str("pay"),
            Self::Decline => f.write_str("decline"),
            Self::Quit => f.write_str("quit"),
            Self::Key(gesture) => write!(f, "key:{gesture:?}"),
            Self::SetTickets(kind, count) => write!(f, "set:{kind}={count}"),
            Self::Start { express } => {
                f.write_str(if *express { "express-start" } else { "start" })
            }
        }
    }
}

/// Policy interface for automated play.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next action. `level_failed` is the world's roll for the current level.
    fn next_action(&mut self, view: &GameView, level_failed: bool) -> PlayerAction;
}

/// Built-in player strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStrategy {
    /// Pays while the advisory odds stay above a floor, otherwise walks away.
    Cautious,
    /// Pays whenever the tickets cover it.
    Reckless,
    /// Fails every level it is allowed to and pays until broke.
    Unlucky,
    /// Random inputs, valid or not.
    Chaos,
}

impl PlayerStrategy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Reckless => "Reckless",
            Self::Unlucky => "Unlucky",
            Self::Chaos => "Chaos",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy {
                quit_below: CAUTIOUS_QUIT_BELOW,
            }),
            Self::Reckless => Box::new(RecklessPolicy),
            Self::Unlucky => Box::new(UnluckyPolicy),
            Self::Chaos => Box::new(ChaosPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PlayerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const CAUTIOUS_QUIT_BELOW: f64 = 0.05;

struct CautiousPolicy {
    quit_below: f64,
}
struct RecklessPolicy;
struct UnluckyPolicy;

struct ChaosPolicy {
    rng: ChaCha20Rng,
}

impl ChaosPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0xC4A0_5EED),
        }
    }
}

fn climb(view: &GameView, level_failed: bool) -> PlayerAction {
    if level_failed && view.fail_enabled {
        PlayerAction::Fail
    } else {
        PlayerAction::Advance
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn next_action(&mut self, view: &GameView, level_failed: bool) -> PlayerAction {
        if view.session.pending_failure.is_none() {
            return climb(view, level_failed);
        }
        let odds_ok = view
            .advisory
            .is_none_or(|advisory| advisory.current_probability >= self.quit_below);
        if view.pay_enabled && odds_ok {
            PlayerAction::Pay
        } else {
            PlayerAction::Decline
        }
    }
}

impl PlayerPolicy for RecklessPolicy {
    fn name(&self) -> &'static str {
        "Reckless"
    }

    fn next_action(&mut self, view: &GameView, level_failed: bool) -> PlayerAction {
        match view.session.pending_failure {
            Some(_) if view.pay_enabled => PlayerAction::Pay,
            Some(_) => PlayerAction::Decline,
            None => climb(view, level_failed),
        }
    }
}

impl PlayerPolicy for UnluckyPolicy {
    fn name(&self) -> &'static str {
        "Unlucky"
    }

    fn next_action(&mut self, view: &GameView, _level_failed: bool) -> PlayerAction {
        match view.session.pending_failure {
            Some(_) if view.pay_enabled => PlayerAction::Pay,
            Some(_) => PlayerAction::Decline,
            None => climb(view, true),
        }
    }
}

impl PlayerPolicy for ChaosPolicy {
    fn name(&self) -> &'static str {
        "Chaos"
    }

    fn next_action(&mut self, _view: &GameView, level_failed: bool) -> PlayerAction {
        match self.rng.gen_range(0..20) {
            0 => PlayerAction::SetTickets(TicketKind::Regular, self.rng.gen_range(0..30)),
            1 => PlayerAction::SetTickets(TicketKind::Express, self.rng.gen_range(0..3)),
            2 => PlayerAction::Start {
                express: self.rng.gen_bool(0.5),
            },
            3 => PlayerAction::Quit,
            4 | 5 => PlayerAction::Key(Gesture::Advance),
            6 | 7 => PlayerAction::Key(Gesture::Fail),
            8..=10 => PlayerAction::Pay,
            11 => PlayerAction::Decline,
            12..=14 if level_failed => PlayerAction::Fail,
            _ => PlayerAction::Advance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascent_game::{Advisory, Game};

    fn view_with_pending(regular: u32, probability: Option<f64>) -> GameView {
        let mut game = Game::default();
        let _ = game.set_ticket_count(TicketKind::Regular, regular + 1);
        let _ = game.start(false);
        let _ = game.trigger_failure();
        let mut view = game.view();
        view.advisory = probability.map(|current_probability| Advisory {
            current_probability,
            ..Advisory::default()
        });
        view
    }

    #[test]
    fn climbing_fails_only_when_rolled_and_allowed() {
        let mut game = Game::default();
        let _ = game.set_ticket_count(TicketKind::Regular, 4);
        let _ = game.start(false);
        let view = game.view();
        let mut policy = PlayerStrategy::Reckless.create_policy(1);
        assert_eq!(policy.next_action(&view, false), PlayerAction::Advance);
        assert_eq!(policy.next_action(&view, true), PlayerAction::Fail);
    }

    #[test]
    fn cautious_walks_away_from_hopeless_odds() {
        let mut policy = PlayerStrategy::Cautious.create_policy(1);
        assert_eq!(
            policy.next_action(&view_with_pending(3, Some(0.5)), false),
            PlayerAction::Pay
        );
        assert_eq!(
            policy.next_action(&view_with_pending(3, Some(0.01)), false),
            PlayerAction::Decline
        );
        assert_eq!(
            policy.next_action(&view_with_pending(3, None), false),
            PlayerAction::Pay
        );
    }

    #[test]
    fn unlucky_fails_without_a_roll() {
        let mut game = Game::default();
        let _ = game.set_ticket_count(TicketKind::Regular, 4);
        let _ = game.start(false);
        let mut policy = PlayerStrategy::Unlucky.create_policy(1);
        assert_eq!(policy.next_action(&game.view(), false), PlayerAction::Fail);
    }

    #[test]
    fn chaos_is_reproducible_per_seed() {
        let view = Game::default().view();
        let mut a = PlayerStrategy::Chaos.create_policy(77);
        let mut b = PlayerStrategy::Chaos.create_policy(77);
        for _ in 0..64 {
            assert_eq!(a.next_action(&view, true), b.next_action(&view, true));
        }
    }
}
