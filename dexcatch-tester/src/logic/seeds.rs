use anyhow::Result;

/// Seed used when no tokens resolve to anything.
pub const DEFAULT_SEED: u64 = 1337;
/// Widest range a single `a..b` token may expand to.
const MAX_RANGE_LEN: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeedError {
    #[error("Unrecognized seed token: {0}")]
    Unrecognized(String),
    #[error("Seed range {0} is empty")]
    EmptyRange(String),
    #[error("Seed range {0} expands to more than {MAX_RANGE_LEN} seeds")]
    RangeTooWide(String),
}

/// Parse a single seed: decimal, negative decimal (by magnitude), or `0x` hex.
///
/// # Errors
/// Returns [`SeedError::Unrecognized`] for anything else.
pub fn parse_seed(token: &str) -> Result<u64, SeedError> {
    let token = token.trim();
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        return u64::from_str_radix(&hex.replace('_', ""), 16)
            .map_err(|_| SeedError::Unrecognized(token.to_string()));
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    token
        .parse::<i64>()
        .map(i64::unsigned_abs)
        .map_err(|_| SeedError::Unrecognized(token.to_string()))
}

fn parse_range(token: &str) -> Option<Result<Vec<u64>, SeedError>> {
    if let Some((start, end)) = token.split_once("..=") {
        return Some(expand_range(token, start, end, true));
    }
    token
        .split_once("..")
        .map(|(start, end)| expand_range(token, start, end, false))
}

fn expand_range(token: &str, start: &str, end: &str, inclusive: bool) -> Result<Vec<u64>, SeedError> {
    let start = parse_seed(start)?;
    let end = parse_seed(end)?;
    let end = if inclusive { end.checked_add(1) } else { Some(end) }
        .ok_or_else(|| SeedError::RangeTooWide(token.to_string()))?;
    if end <= start {
        return Err(SeedError::EmptyRange(token.to_string()));
    }
    if end - start > MAX_RANGE_LEN {
        return Err(SeedError::RangeTooWide(token.to_string()));
    }
    Ok((start..end).collect())
}

/// Resolve CLI seed tokens into a deduplicated, ordered seed list.
///
/// Supports literal integers, `0x` hex, `a..b` / `a..=b` ranges, and the
/// keyword `random`, which draws a fresh seed and logs it for replay.
///
/// # Errors
/// Returns an error naming the first token that cannot be parsed.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();

    for token in tokens.iter().map(|t| t.trim()) {
        if token.is_empty() {
            continue;
        }
        if token.eq_ignore_ascii_case("random") {
            let seed = rand::random::<u64>();
            log::info!("drew random seed {seed}");
            seeds.push(seed);
            continue;
        }
        if let Some(range) = parse_range(token) {
            seeds.extend(range?);
            continue;
        }
        seeds.push(parse_seed(token)?);
    }

    let mut seen = std::collections::HashSet::new();
    seeds.retain(|seed| seen.insert(*seed));

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_numeric_hex_and_negative_seeds() {
        assert_eq!(parse_seed("42"), Ok(42));
        assert_eq!(parse_seed("0xff"), Ok(255));
        assert_eq!(parse_seed("0xDEAD_BEEF"), Ok(0xDEAD_BEEF));
        assert_eq!(parse_seed("-7"), Ok(7));
        assert!(matches!(parse_seed("pikachu"), Err(SeedError::Unrecognized(_))));
    }

    #[test]
    fn expands_ranges_and_dedupes_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["5", "3..=6", "1..3"])).unwrap();
        assert_eq!(seeds, vec![5, 3, 4, 6, 1, 2]);
    }

    #[test]
    fn rejects_empty_and_oversized_ranges() {
        let err = resolve_seed_inputs(&tokens(&["9..9"])).unwrap_err();
        assert!(err.to_string().contains("empty"));
        let err = resolve_seed_inputs(&tokens(&["0..=20000"])).unwrap_err();
        assert!(err.to_string().contains("more than"));
    }

    #[test]
    fn falls_back_to_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
        assert_eq!(resolve_seed_inputs(&tokens(&["", " "])).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn random_keyword_yields_one_seed() {
        assert_eq!(resolve_seed_inputs(&tokens(&["random"])).unwrap().len(), 1);
    }
}
