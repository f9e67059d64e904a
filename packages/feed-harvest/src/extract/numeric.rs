//! Numeric normalization for displayed counts and scores.
//!
//! Feeds render counters as "1,204", "1.2K", "3M" or "N/A". Counts are
//! computed with exact decimal arithmetic so "1.15K" is 1150, not 1149.

/// Longest digit run accepted before a count is treated as garbage.
const MAX_DIGITS: usize = 30;

/// Parse a displayed count, defaulting to 0 when it cannot be read.
///
/// ```
/// use feed_harvest::extract::numeric::parse_count;
///
/// assert_eq!(parse_count("1.2K"), 1200);
/// assert_eq!(parse_count("3M"), 3_000_000);
/// assert_eq!(parse_count("250"), 250);
/// assert_eq!(parse_count("N/A"), 0);
/// ```
pub fn parse_count(raw: &str) -> i64 {
    try_parse_count(raw).unwrap_or(0)
}

/// Parse a displayed count, or `None` if the text is not a count.
///
/// Separators (`,`, `_`, whitespace) are stripped, a single trailing
/// magnitude letter (K, M, B, any case) multiplies by a power of 1000, and
/// the result is truncated toward zero.
pub fn try_parse_count(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
        .collect();

    let (number, multiplier) = split_magnitude(&cleaned)?;
    let (whole, fraction) = match number.split_once('.') {
        Some((w, f)) => (w, f),
        None => (number, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !is_digits(whole) || !is_digits(fraction) || whole.len() > MAX_DIGITS {
        return None;
    }

    // Digits past the ninth cannot move the truncated result when the
    // multiplier is at most 10^9.
    let fraction = &fraction[..fraction.len().min(9)];

    let whole_value: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let fraction_value: i128 = if fraction.is_empty() { 0 } else { fraction.parse().ok()? };
    let scale = 10_i128.pow(fraction.len() as u32);

    let value = whole_value.checked_mul(multiplier)? + fraction_value * multiplier / scale;
    i64::try_from(value).ok()
}

/// Parse a real-valued score from the leading token ("4.5 out of 5 stars").
pub fn try_parse_score(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    let token = token.trim_start_matches(['$', '€', '£', '¥']);
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn split_magnitude(s: &str) -> Option<(&str, i128)> {
    let last = s.chars().last()?;
    if last.is_ascii_digit() || last == '.' {
        return Some((s, 1));
    }
    let multiplier = match last.to_ascii_lowercase() {
        'k' => 1_000,
        'm' => 1_000_000,
        'b' => 1_000_000_000,
        _ => return None,
    };
    Some((&s[..s.len() - last.len_utf8()], multiplier))
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
