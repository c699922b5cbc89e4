// Cell text -> typed values. Pure functions only.

use thiserror::Error;

use crate::engine::types::Percentage;

/// Sentinel the page shows instead of a percentage once a pool is full.
pub const FILLED: &str = "FILLED";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{text:?} does not match `<number>[K|M|B] <token> $`")]
    TokenTvl { text: String },

    #[error("row {row}: {cause}")]
    Row { row: usize, cause: Box<ParseError> },
}

/// Parse a TVL cell such as `1.5K cbBTC $150.2M` into `(1500.0, "cbBTC")`.
///
/// Non-breaking spaces count as spaces. The grammar is
/// `<number>[K|M|B]? <token><optional $>`; whatever follows the `$` is the
/// USD figure and is ignored.
pub fn parse_token_and_tvl(text: &str) -> Result<(f64, String), ParseError> {
    let normalised = text.replace('\u{a0}', " ");
    let s = normalised.trim();
    let fail = || ParseError::TokenTvl { text: text.to_string() };

    // STEP 1: numeric literal, digits with at most one dot
    let num_end = s
        .char_indices()
        .find(|&(_, c)| !(c.is_ascii_digit() || c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let literal = &s[..num_end];
    if !literal.chars().any(|c| c.is_ascii_digit()) || literal.matches('.').count() > 1 {
        return Err(fail());
    }
    let value: f64 = literal.parse().map_err(|_| fail())?;

    // STEP 2: optional magnitude suffix, case-sensitive
    let mut rest = &s[num_end..];
    let multiplier = match rest.chars().next() {
        Some('K') => 1e3,
        Some('M') => 1e6,
        Some('B') => 1e9,
        _ => 1.0,
    };
    if multiplier != 1.0 {
        rest = &rest[1..];
    }

    // STEP 3: whitespace then the token symbol
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return Err(fail());
    }
    let token_end = trimmed
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let token = &trimmed[..token_end];
    if token.is_empty() {
        return Err(fail());
    }

    // STEP 4: nothing else but an optional `$...` tail
    let tail = trimmed[token_end..].trim_start();
    if !(tail.is_empty() || tail.starts_with('$')) {
        return Err(fail());
    }

    // STEP 5: huge literals overflow to inf, which JSON cannot hold
    let tvl = value * multiplier;
    if !tvl.is_finite() {
        return Err(fail());
    }

    Ok((tvl, token.to_string()))
}

/// Map the `FILLED` sentinel to `100.00%`, pass everything else through.
pub fn normalize_capacity(text: &str) -> Percentage {
    let s = text.trim();
    if s == FILLED {
        Percentage::full()
    } else {
        Percentage::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_with_suffix() {
        assert_eq!(parse_token_and_tvl("1.5K cbBTC $").unwrap(), (1500.0, "cbBTC".to_string()));
        assert_eq!(parse_token_and_tvl("2M WETH $").unwrap(), (2_000_000.0, "WETH".to_string()));
        assert_eq!(parse_token_and_tvl("0.25B tBTC $").unwrap(), (250_000_000.0, "tBTC".to_string()));
    }

    #[test]
    fn test_parse_without_suffix() {
        assert_eq!(parse_token_and_tvl("42 WETH $").unwrap(), (42.0, "WETH".to_string()));
        assert_eq!(parse_token_and_tvl("575.35 WETH").unwrap(), (575.35, "WETH".to_string()));
    }

    #[test]
    fn test_parse_nbsp_and_usd_tail() {
        let (tvl, token) = parse_token_and_tvl("\u{a0} 1.5K\u{a0}cbBTC\u{a0}$150.2M ").unwrap();
        assert_eq!(tvl, 1500.0);
        assert_eq!(token, "cbBTC");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "cbBTC $", "1.5k cbBTC $", "1.5KcbBTC $", "1.2.3 WETH $", "-4 WETH $", "42 WETH extra", "42 $"] {
            assert!(
                matches!(parse_token_and_tvl(bad), Err(ParseError::TokenTvl { .. })),
                "expected failure for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let digits = "9".repeat(400);
        assert!(matches!(
            parse_token_and_tvl(&format!("{digits} WETH $")),
            Err(ParseError::TokenTvl { .. })
        ));
        // finite literal pushed past f64::MAX by the suffix
        let near_max = format!("{:.0}B WETH $", f64::MAX / 10.0);
        assert!(parse_token_and_tvl(&near_max).is_err());
    }

    #[test]
    fn test_normalize_capacity() {
        assert_eq!(normalize_capacity("FILLED").as_str(), "100.00%");
        assert_eq!(normalize_capacity("87.50%").as_str(), "87.50%");
        assert_eq!(normalize_capacity(" 12.00% ").as_str(), "12.00%");
        // permissive on purpose
        assert_eq!(normalize_capacity("filled").as_str(), "filled");
    }

    proptest! {
        #[test]
        fn prop_parse_is_total_on_grammar(
            whole in 0u32..100_000,
            frac in 0u32..100,
            suffix in prop::sample::select(vec!["", "K", "M", "B"]),
            token in "[A-Za-z][A-Za-z0-9]{0,7}",
            dollar in any::<bool>(),
        ) {
            let text = format!("{}.{:02}{} {}{}", whole, frac, suffix, token, if dollar { " $" } else { "" });
            let (tvl, parsed) = parse_token_and_tvl(&text).unwrap();
            let base = format!("{}.{:02}", whole, frac).parse::<f64>().unwrap();
            let mult = match suffix { "K" => 1e3, "M" => 1e6, "B" => 1e9, _ => 1.0 };
            prop_assert_eq!(parsed, token);
            prop_assert_eq!(tvl, base * mult);
            prop_assert_eq!(parse_token_and_tvl(&text).unwrap().0, tvl);
        }
    }
}
