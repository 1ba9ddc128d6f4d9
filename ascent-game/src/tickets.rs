//! Ticket pools and pre-start input handling.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    #[default]
    Regular,
    Express,
}

impl TicketKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Express => "express",
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Self::Regular),
            "express" => Ok(Self::Express),
            _ => Err(()),
        }
    }
}

impl From<TicketKind> for String {
    fn from(value: TicketKind) -> Self {
        value.as_str().to_string()
    }
}

/// Interpret free-form ticket input the way the start screen does.
///
/// Reads an optional sign and the leading run of digits after any leading
/// whitespace; trailing characters are ignored. Anything that does not
/// produce a positive count clamps to 0, and oversized counts saturate.
#[must_use]
pub fn parse_ticket_input(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() || negative {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_kind_round_trips_through_str() {
        for kind in [TicketKind::Regular, TicketKind::Express] {
            assert_eq!(kind.as_str().parse::<TicketKind>(), Ok(kind));
            assert_eq!(String::from(kind), kind.to_string());
        }
        assert!("vip".parse::<TicketKind>().is_err());
    }

    #[test]
    fn parse_ticket_input_clamps_bad_values() {
        assert_eq!(parse_ticket_input("12"), 12);
        assert_eq!(parse_ticket_input("  7 tickets"), 7);
        assert_eq!(parse_ticket_input("+3"), 3);
        assert_eq!(parse_ticket_input("-4"), 0);
        assert_eq!(parse_ticket_input(""), 0);
        assert_eq!(parse_ticket_input("abc"), 0);
        assert_eq!(parse_ticket_input("-"), 0);
        assert_eq!(parse_ticket_input("99999999999999"), u32::MAX);
    }
}
