//! Parsing and formatting of durations with a unit suffix, e.g. `1.234s`,
//! `500ms` or `1min 3.2s` (one token at a time).

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

// =============================================================================
// Public Interface
// =============================================================================

/// Parse one duration token: a sequence of decimal numbers, each with an
/// optional fraction and a mandatory unit suffix (`2h45m`, `1.5s`, `300ms`).
/// A bare `0` is accepted. Negative durations are rejected.
///
/// Accepted units are `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m`, `min` and `h`.
pub fn parse_duration(token: &str) -> Result<Duration, String> {
    let mut rest = token.strip_prefix('+').unwrap_or(token);
    if rest.starts_with('-') {
        return Err(format!("negative duration `{}`", token));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration `{}`", token));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", after),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(format!("invalid duration `{}`", token));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or_else(|| after.len());
        let (unit, after) = after.split_at(unit_len);
        let scale = match unit {
            "" => return Err(format!("missing unit in duration `{}`", token)),
            unit => unit_nanos(unit)
                .ok_or_else(|| format!("unknown unit `{}` in duration `{}`", unit, token))?,
        };

        let overflow = || format!("duration `{}` is out of range", token);
        let mut nanos = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .ok()
                .and_then(|v| v.checked_mul(scale))
                .ok_or_else(overflow)?
        };
        if !fraction.is_empty() {
            // Digits beyond the 18th are below nanosecond resolution for any
            // supported unit.
            let digits = &fraction[..fraction.len().min(18)];
            let value: u128 = digits.parse().map_err(|_| overflow())?;
            nanos = value
                .checked_mul(scale)
                .map(|v| v / 10u128.pow(digits.len() as u32))
                .and_then(|v| nanos.checked_add(v))
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        rest = after;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| format!("duration `{}` is out of range", token))
}

/// Format a duration the compact way `systemd-analyze` and Go do: `0s`,
/// `850µs`, `250ms`, `1.5s`, `1m2.5s`, `1h0m3s`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".into();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", decimal(nanos, 1_000));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, 1_000_000));
    }

    let secs = duration.as_secs();
    let (hours, minutes) = (secs / 3600, secs / 60 % 60);
    let seconds = decimal(
        u128::from(secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos()),
        NANOS_PER_SEC,
    );
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `us` microseconds, unless that does not fit in 64-bit nanoseconds, the
/// resolution of the history file.
pub(crate) fn checked_micros(us: u64) -> Option<Duration> {
    us.checked_mul(1_000).map(Duration::from_nanos)
}

// =============================================================================
// Private Implementation
// =============================================================================

fn split_digits(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or_else(|| s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" | "min" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// `value / unit` as a decimal number without trailing zeros.
fn decimal(value: u128, unit: u128) -> String {
    let (whole, fraction) = (value / unit, value % unit);
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    format!("{}.{:0width$}", whole, fraction, width = width)
        .trim_end_matches('0')
        .to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_unit_values() {
        assert_eq!(parse_duration("1.234s"), Ok(Duration::from_millis(1_234)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("850us"), Ok(Duration::from_micros(850)));
        assert_eq!(parse_duration("850µs"), Ok(Duration::from_micros(850)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("0s"), Ok(Duration::ZERO));
        assert_eq!(parse_duration(".5s"), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn parses_compound_values() {
        assert_eq!(parse_duration("1min"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("1h2m3.5s"), Ok(Duration::from_millis(3_723_500)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1.5").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("3days").is_err());
        assert!(parse_duration("(firmware)").is_err());
        assert!(parse_duration("+").is_err());
        assert!(parse_duration("99999999999999999999h").is_err());
    }

    #[test]
    fn fraction_overflow_is_an_error() {
        assert!(parse_duration("340282366920938463463374607431768211.999us").is_err());
        assert!(parse_duration("340282366920938463463374607431768211455.9h").is_err());
        assert!(parse_duration("18446744073.709551616s").is_err());
    }

    #[test]
    fn micros_beyond_nanosecond_range_are_rejected() {
        assert_eq!(checked_micros(1_500), Some(Duration::from_micros(1_500)));
        assert_eq!(checked_micros(u64::MAX / 1_000 + 1), None);
    }

    #[test]
    fn formats_like_systemd() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(42)), "42ns");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(62_500)), "1m2.5s");
        assert_eq!(format_duration(Duration::from_secs(3_603)), "1h0m3s");
    }
}
