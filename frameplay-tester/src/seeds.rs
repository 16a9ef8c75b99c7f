use anyhow::{Context, Result, bail};

pub const DEFAULT_SEED: u64 = 1337;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts literal integers (negative values use their magnitude) and
/// half-open ranges written `start..end`. Duplicates are dropped while keeping
/// first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();

    for token in tokens {
        if let Some((start, end)) = token.split_once("..") {
            let start: u64 = start
                .parse()
                .with_context(|| format!("invalid range start in {token}"))?;
            let end: u64 = end
                .parse()
                .with_context(|| format!("invalid range end in {token}"))?;
            if start >= end {
                bail!("empty seed range: {token}");
            }
            seeds.extend(start..end);
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            seeds.push(value);
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            seeds.push(value.unsigned_abs());
            continue;
        }

        bail!("Unrecognized seed token: {token}");
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

    fn tokens(raw: &str) -> Vec<String> {
        split_csv(raw)
    }

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn resolves_numbers_ranges_and_duplicates() {
        let seeds = resolve_seed_inputs(&tokens("7, 1..4, -3, 2")).unwrap();
        assert_eq!(seeds, vec![7, 1, 2, 3]);
    }

    #[test]
    fn empty_input_uses_default_seed() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn rejects_garbage_and_empty_ranges() {
        assert!(resolve_seed_inputs(&tokens("banana")).is_err());
        assert!(resolve_seed_inputs(&tokens("5..5")).is_err());
    }
}
