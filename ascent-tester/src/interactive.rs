use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use ascent_game::{
    GameDriver, GameView, Gesture, ProbabilityOracle, TicketKind, Transition, parse_ticket_input,
};
use colored::Colorize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "commands: regular N | express N | start | express-start | enter | z | pay | decline | quit | state | help | exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetTickets(TicketKind, u32),
    Start { express: bool },
    Key(Gesture),
    Pay,
    Decline,
    Quit,
    State,
    Help,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("`{0}` needs a ticket count")]
    MissingCount(&'static str),
    #[error("unknown command `{0}`")]
    Unknown(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let head = head.to_lowercase();
        let count = |label: &'static str, word: Option<&str>| {
            word.map(parse_ticket_input)
                .ok_or(CommandError::MissingCount(label))
        };
        match head.as_str() {
            "regular" => Ok(Self::SetTickets(
                TicketKind::Regular,
                count("regular", words.next())?,
            )),
            "express" => Ok(Self::SetTickets(
                TicketKind::Express,
                count("express", words.next())?,
            )),
            "start" => Ok(Self::Start { express: false }),
            "express-start" => Ok(Self::Start { express: true }),
            "pay" => Ok(Self::Pay),
            "decline" => Ok(Self::Decline),
            "quit" => Ok(Self::Quit),
            "state" => Ok(Self::State),
            "help" | "?" => Ok(Self::Help),
            "exit" => Ok(Self::Exit),
            other => Gesture::from_key(other)
                .map(Self::Key)
                .ok_or_else(|| CommandError::Unknown(other.to_string())),
        }
    }
}

/// Drive a game from line-oriented input until `exit` or end of input.
pub async fn run_interactive<R>(
    driver: &mut GameDriver<dyn ProbabilityOracle>,
    input: R,
    out: &mut dyn Write,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    writeln!(out, "{}", "🧗 Ascent interactive mode".bright_cyan().bold())?;
    writeln!(out, "{HELP}")?;
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "{} {err}", "⚠️".yellow())?;
                continue;
            }
        };
        let transition = match command {
            Command::Exit => break,
            Command::Help => {
                writeln!(out, "{HELP}")?;
                continue;
            }
            Command::State => None,
            Command::SetTickets(kind, count) => Some(driver.set_ticket_count(kind, count)),
            Command::Start { express } => Some(driver.start(express)),
            Command::Key(gesture) => Some(driver.gesture(gesture)),
            Command::Pay => Some(driver.resolve_failure(true)),
            Command::Decline => Some(driver.resolve_failure(false)),
            Command::Quit => Some(driver.quit()),
        };
        if let Some(Transition::Ignored(reason)) = transition {
            writeln!(out, "{} ({reason})", "ignored".yellow())?;
        }
        driver.settle().await;
        render_view(out, &driver.view(), driver.game().rules().max_level)?;
    }
    out.flush()?;
    Ok(())
}

fn render_view(out: &mut dyn Write, view: &GameView, max_level: u32) -> std::io::Result<()> {
    let session = &view.session;
    if !session.started {
        writeln!(
            out,
            "Not started | Regular {} | Express {}{}",
            session.regular_tickets,
            session.express_tickets,
            if view.show_start_options {
                " | choose: start or express-start"
            } else {
                ""
            }
        )?;
        return Ok(());
    }
    let safe = if session.is_safe_level { " (safe)" } else { "" };
    writeln!(
        out,
        "Level {}/{max_level}{safe} | Regular {} | Express {} | Failures {} | Covered {}",
        session.level,
        session.regular_tickets,
        session.express_tickets,
        session.total_failures,
        session.max_failures_covered
    )?;
    writeln!(
        out,
        "Odds {} | Restart {} | Expected cost {}",
        view.probability_label, view.restart_probability_label, view.expected_cost_label
    )?;
    if let Some(pending) = session.pending_failure {
        let hint = if view.pay_enabled {
            "pay or decline"
        } else {
            "not enough tickets, decline to quit"
        };
        writeln!(
            out,
            "{} costs {} tickets ({hint})",
            "Failure".red().bold(),
            pending.cost
        )?;
    }
    Ok(())
}
