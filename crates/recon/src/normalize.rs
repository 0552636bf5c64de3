//! Key normalization and field coercion.
//!
//! Every function here is total: blank or malformed cells map to a documented
//! default instead of an error, because the source exports routinely carry
//! blank and inconsistently formatted values.

use chrono::NaiveDate;

/// Placeholder for absent text fields.
pub const PLACEHOLDER: &str = "---";

/// Display value for a timing cell that has not been recorded.
pub const EMPTY_TIME: &str = "--:--";

/// Values the source systems use to mean "not yet recorded".
const EMPTY_TIME_VALUES: [&str; 5] = ["", "00:00", "--:--", "00:00:00", "0"];

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Canonicalize an identifier: digits only, leading zeros stripped.
///
/// `"00.012-3"` and `"123"` normalize to the same key. The empty string is
/// returned for absent or digit-free input and must never be joined on.
pub fn normalize(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.trim_start_matches('0').trim().to_string()
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Uppercase and trim, or [`PLACEHOLDER`] when the cell is absent or empty.
///
/// A whitespace-only cell is present but blank, so it yields `""`.
pub fn to_upper_or_default(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_uppercase().trim().to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// True for a text field that carries no information (blank or placeholder).
pub fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == PLACEHOLDER
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Parse a pt-BR currency string such as `"R$ 1.234,56"`.
///
/// Thousands separators are dropped and the decimal comma becomes a point.
/// The longest numeric prefix is parsed, so trailing junk is ignored; an
/// absent or non-numeric cell yields `0.0`.
pub fn parse_currency(value: Option<&str>) -> f64 {
    let Some(raw) = value else {
        return 0.0;
    };
    let clean = raw.replacen("R$", "", 1).replace('.', "").replacen(',', ".", 1);
    leading_number(clean.trim()).unwrap_or(0.0)
}

fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_point = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    text[..end].parse::<f64>().ok()
}

/// Render an amount the way the source system displays it: `1234.5` → `"1.234,50"`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped},{frac:02}")
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Sentinel for a blank or malformed date. Sorts before every real date.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Parse a `dd/mm/yyyy` date, or `None` when the text is not a valid date.
pub fn try_parse_local_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.trim().split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a `dd/mm/yyyy` date, falling back to the [`epoch`] sentinel.
pub fn parse_local_date(text: &str) -> NaiveDate {
    try_parse_local_date(text).unwrap_or_else(epoch)
}

/// Format a date as `dd/mm/yyyy`, the counterpart of [`parse_local_date`].
pub fn format_local_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

// ---------------------------------------------------------------------------
// Times
// ---------------------------------------------------------------------------

/// True when a timing cell means "not yet recorded".
pub fn is_time_empty(value: &str) -> bool {
    EMPTY_TIME_VALUES.contains(&value.trim())
}
