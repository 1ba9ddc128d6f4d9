use ascent_game::{
    Game, Gesture, Rejection, Rules, Session, TicketKind, Transition, constants::MAX_LEVEL,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const SEEDS: [u64; 6] = [1, 7, 42, 1_337, 0xDEAD_BEEF, 0x5EED_CAFE];
const STEPS: usize = 600;

#[derive(Debug, Clone, Copy)]
enum Op {
    SetRegular(u32),
    SetExpress(u32),
    Start(bool),
    Fail,
    Pay,
    Decline,
    Advance,
    Quit,
    Key(Gesture),
}

fn pick(rng: &mut ChaCha20Rng) -> Op {
    match rng.gen_range(0..12) {
        0 => Op::SetRegular(rng.gen_range(0..40)),
        1 => Op::SetExpress(rng.gen_range(0..3)),
        2 => Op::Start(rng.gen_bool(0.3)),
        3 | 4 => Op::Fail,
        5 => Op::Pay,
        6 => {
            if rng.gen_bool(0.1) {
                Op::Decline
            } else {
                Op::Pay
            }
        }
        7 | 8 => Op::Advance,
        9 => {
            if rng.gen_bool(0.2) {
                Op::Quit
            } else {
                Op::Advance
            }
        }
        10 => Op::Key(Gesture::Advance),
        _ => Op::Key(Gesture::Fail),
    }
}

fn apply(game: &mut Game, op: Op) -> Transition {
    let outcome = match op {
        Op::SetRegular(count) => game.set_ticket_count(TicketKind::Regular, count),
        Op::SetExpress(count) => game.set_ticket_count(TicketKind::Express, count),
        Op::Start(express) => game.start(express),
        Op::Fail => game.trigger_failure(),
        Op::Pay => game.resolve_failure(true),
        Op::Decline => game.resolve_failure(false),
        Op::Advance => game.advance_level(),
        Op::Quit => game.quit(),
        Op::Key(gesture) => game.gesture(gesture),
    };
    outcome.transition
}

fn assert_invariants(session: &Session, rules: &Rules, context: &str) {
    if !session.started {
        let baseline = Session {
            regular_tickets: session.regular_tickets,
            express_tickets: session.express_tickets,
            ..Session::default()
        };
        assert_eq!(session, &baseline, "{context}: idle session drifted");
        return;
    }
    assert!(
        (1..=rules.max_level).contains(&session.level),
        "{context}: level {} out of range",
        session.level
    );
    assert_eq!(
        session.is_safe_level,
        rules.is_safe_level(session.level),
        "{context}: safe flag out of sync"
    );
    if session.is_express_start {
        assert!(session.level >= rules.express_start_level, "{context}");
    }
    if let Some(pending) = session.pending_failure {
        assert!(session.has_failed_current_level, "{context}");
        assert_eq!(
            pending.cost,
            rules.failure_cost(session.total_failures),
            "{context}: pending cost mismatch"
        );
    }
}

#[test]
fn random_walks_preserve_session_invariants() {
    let rules = Rules::default_config();
    for seed in SEEDS {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut game = Game::new(rules.clone());
        for step in 0..STEPS {
            let before = game.session().clone();
            let op = pick(&mut rng);
            let transition = apply(&mut game, op);
            let after = game.session();
            let context = format!("seed {seed} step {step} {op:?} -> {transition:?}");

            if let Transition::Ignored(_) = transition {
                assert_eq!(&before, after, "{context}: ignored op mutated state");
            }
            if before.started && after.started {
                assert!(after.regular_tickets <= before.regular_tickets, "{context}");
                assert!(after.express_tickets <= before.express_tickets, "{context}");
                assert!(after.total_failures >= before.total_failures, "{context}");
            }
            if matches!(op, Op::Quit) || (matches!(op, Op::Decline) && transition.is_applied()) {
                assert_eq!(after, &Session::default(), "{context}: quit left residue");
            }
            assert_invariants(after, &rules, &context);
        }
    }
}

#[test]
fn paid_failures_charge_the_cost_table_in_order() {
    let rules = Rules::default_config();
    let total: u64 = rules.cumulative_failure_cost(8);
    let mut game = Game::new(rules.clone());
    let funded = u32::try_from(total).unwrap() + 1;
    let _ = game.set_ticket_count(TicketKind::Regular, funded);
    let _ = game.start(false);

    let mut charged = Vec::new();
    while charged.len() < 8 {
        if game.trigger_failure().transition.is_applied() {
            let before = game.session().regular_tickets;
            assert!(game.resolve_failure(true).transition.is_applied());
            charged.push(before - game.session().regular_tickets);
        }
        assert!(game.advance_level().transition.is_applied());
    }
    assert_eq!(charged, vec![0, 1, 2, 4, 8, 10, 10, 10]);
    assert_eq!(game.session().regular_tickets, 0);
}

#[test]
fn climb_stops_at_the_top_level() {
    let mut game = Game::default();
    let _ = game.set_ticket_count(TicketKind::Express, 1);
    let _ = game.start(true);
    while game.advance_level().transition.is_applied() {}
    assert_eq!(game.session().level, MAX_LEVEL);
    assert_eq!(
        game.gesture(Gesture::Advance).transition,
        Transition::Ignored(Rejection::MaxLevelReached)
    );
    assert!(!game.view().advance_enabled);
}

#[test]
fn unaffordable_failure_waits_for_a_decision() {
    let mut game = Game::default();
    let _ = game.set_ticket_count(TicketKind::Regular, 2);
    let _ = game.start(false);
    for _ in 0..2 {
        let _ = game.trigger_failure();
        let _ = game.resolve_failure(true);
        let _ = game.advance_level();
    }
    assert_eq!(game.session().regular_tickets, 0);
    assert!(game.trigger_failure().transition.is_applied());
    assert!(!game.view().pay_enabled);
    assert_eq!(
        game.resolve_failure(true).transition,
        Transition::Ignored(Rejection::InsufficientTickets)
    );
    assert!(game.session().has_pending_failure());
    assert!(game.resolve_failure(false).transition.is_applied());
    assert_eq!(game.session(), &Session::default());
}
