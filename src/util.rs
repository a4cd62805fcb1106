// Utility helpers for parsing, text normalization and basic statistics.
//
// This module centralizes all the "dirty" CSV/number handling so the rest of
// the code can assume clean, typed values. Statistics return `Option` so an
// empty input is reported as "no data" instead of 0 or NaN.
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

/// Rendered in place of any statistic that has no data behind it.
pub const NO_DATA: &str = "N/A";

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed or is not finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative integer. Accepts a float spelling with no
/// fractional part (`"3.0"`), which spreadsheet exports like to produce.
pub fn parse_u32_safe(s: Option<&str>) -> Option<u32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    let f = parse_f64_safe(Some(s))?;
    if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

/// `Some(trimmed)` for a non-blank value, `None` otherwise.
pub fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Normalize a categorical label: trim, collapse inner whitespace and
/// title-case every word (`"  nEW   delhi "` becomes `"New Delhi"`).
///
/// The result is a fixed point: normalizing it again changes nothing.
pub fn normalize_label(s: &str) -> String {
    let mut current = title_case_once(s);
    // Re-casing can map some characters onward (e.g. `ſ` -> `S` -> `s`);
    // a couple of passes always settles.
    for _ in 0..3 {
        let next = title_case_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn title_case_once(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => {
                    let mut upper = first.to_uppercase();
                    // Keep characters whose uppercase expands (`ß` -> `SS`).
                    let head = match (upper.next(), upper.next()) {
                        (Some(u), None) => u,
                        _ => first,
                    };
                    std::iter::once(head).chain(chars).collect::<String>()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn median(mut v: Vec<f64>) -> Option<f64> {
    // Median of a list of numbers. We accept `Vec<f64>` by value so the
    // function can sort in-place without cloning at the call site.
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        Some(v[mid])
    } else {
        Some((v[mid - 1] + v[mid]) / 2.0)
    }
}

/// `(min, max)` of a slice, `None` when empty.
pub fn min_max(v: &[f64]) -> Option<(f64, f64)> {
    let first = *v.first()?;
    Some(
        v.iter()
            .fold((first, first), |(lo, hi), x| (lo.min(*x), hi.max(*x))),
    )
}

/// Pearson correlation coefficient. `None` with fewer than two points or
/// when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = average(xs)?;
    let my = average(ys)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    // Rounding noise on a constant column must still count as zero variance.
    let n = xs.len() as f64;
    if sxx <= f64::EPSILON * (mx * mx * n).max(f64::MIN_POSITIVE)
        || syy <= f64::EPSILON * (my * my * n).max(f64::MIN_POSITIVE)
    {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// Sample standard deviation (n - 1 denominator). Needs two values.
pub fn std_dev(v: &[f64]) -> Option<f64> {
    if v.len() < 2 {
        return None;
    }
    let mean = average(v)?;
    let ss: f64 = v.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (v.len() as f64 - 1.0)).sqrt())
}

/// Adjusted Fisher-Pearson sample skewness (the estimator spreadsheet and
/// dataframe tools report). Needs at least three values; constant input
/// has zero skew.
pub fn skewness(v: &[f64]) -> Option<f64> {
    let n = v.len();
    if n < 3 {
        return None;
    }
    let mean = average(v)?;
    let nf = n as f64;
    let m2 = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / nf;
    let m3 = v.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / nf;
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return Some(0.0);
    }
    let g1 = m3 / m2.powf(1.5);
    Some((nf * (nf - 1.0)).sqrt() / (nf - 2.0) * g1)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion; past
    // `u128` range, group the digits directly.
    let mut res = match int_part.parse::<u128>() {
        Ok(v) => v.to_formatted_string(&Locale::en),
        Err(_) => group_digits(int_part),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Like [`format_number`], with an explicit sign for non-zero values.
pub fn format_delta(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) if v > 0.0 => format!("+{}", format_number(v, decimals)),
        Some(v) => format_number(v, decimals),
        None => NO_DATA.to_string(),
    }
}

/// Like [`format_number`], but renders a missing statistic as `N/A`.
pub fn format_metric(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => NO_DATA.to_string(),
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values. This is used
    // for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
