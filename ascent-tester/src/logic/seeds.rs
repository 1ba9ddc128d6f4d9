use anyhow::{Context, Result, bail};

const MAX_RANGE_SEEDS: u64 = 10_000;

/// Resolve CLI seed tokens into concrete seeds, keeping first-seen order.
///
/// Supports decimal integers (negative values use their magnitude), `0x`
/// hex literals, and inclusive `a..=b` or half-open `a..b` ranges.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();
    for token in tokens {
        if token.is_empty() {
            continue;
        }
        for seed in parse_token(token)? {
            if !seeds.contains(&seed) {
                seeds.push(seed);
            }
        }
    }
    if seeds.is_empty() {
        bail!("no seeds provided");
    }
    Ok(seeds)
}

fn parse_token(token: &str) -> Result<Vec<u64>> {
    if let Some((start, end)) = token.split_once("..=") {
        let (start, end) = (parse_seed(start)?, parse_seed(end)?);
        return expand_range(token, start, end);
    }
    if let Some((start, end)) = token.split_once("..") {
        let (start, end) = (parse_seed(start)?, parse_seed(end)?);
        if end <= start {
            bail!("seed range {token} is empty");
        }
        return expand_range(token, start, end - 1);
    }
    Ok(vec![parse_seed(token)?])
}

fn expand_range(token: &str, start: u64, end: u64) -> Result<Vec<u64>> {
    if end < start {
        bail!("seed range {token} is empty");
    }
    if end - start >= MAX_RANGE_SEEDS {
        bail!("seed range {token} exceeds {MAX_RANGE_SEEDS} seeds");
    }
    Ok((start..=end).collect())
}

fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Some(hex) = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed {raw}"));
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    raw.parse::<u64>()
        .with_context(|| format!("invalid seed {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn mixes_literals_hex_and_ranges() {
        let seeds = resolve_seed_inputs(&tokens(&["7", "0x10", "1..3", "2..=4", "-9"])).unwrap();
        assert_eq!(seeds, vec![7, 16, 1, 2, 3, 4, 9]);
    }

    #[test]
    fn large_unsigned_values_parse() {
        let seeds = resolve_seed_inputs(&tokens(&["18446744073709551615"])).unwrap();
        assert_eq!(seeds, vec![u64::MAX]);
    }

    #[test]
    fn rejects_garbage_and_empty_ranges() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["5..5"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["0..=20000"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&[])).is_err());
    }
}
