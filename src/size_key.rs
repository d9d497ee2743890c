//! Size-key normalization.
//!
//! Input files and template headers spell the same size many ways: `7.5`,
//! `7,5`, the number `7.5`, or even a date when a spreadsheet program decided
//! `7.5` meant July 5th. [`normalize`] maps all of them onto one canonical
//! [`SizeKey`] so input rows can be joined against template columns.
//!
//! Rules, in precedence order:
//! 1. missing value -> empty key
//! 2. date (typed cell or `YYYY-MM-DD` text) -> `"{month}.{day}"` read as a number
//! 3. number, or text that is a plain decimal (comma or period) -> two
//!    decimals with trailing zeros and point stripped
//! 4. digits + optional decimals + alphabetic suffix (`1.50C`) -> numeric
//!    part normalized, suffix uppercased and reattached
//! 5. anything else -> trimmed, uppercased, comma replaced by period
//!
//! The function is pure and idempotent: `normalize(normalize(v)) == normalize(v)`.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// A raw size value as read from an input row or a template header cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSize {
    /// Blank cell or absent field.
    Missing,
    /// Free-form text.
    Text(String),
    /// A numeric cell.
    Number(f64),
    /// A date-typed cell (usually a mangled numeric size).
    Date { year: i32, month: u32, day: u32 },
}

impl From<&str> for RawSize {
    fn from(s: &str) -> Self {
        RawSize::Text(s.to_string())
    }
}

impl From<f64> for RawSize {
    fn from(n: f64) -> Self {
        RawSize::Number(n)
    }
}

/// Canonical size key used as the join key between input and template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SizeKey(String);

impl SizeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SizeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SizeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Normalize a raw size into its canonical key.
pub fn normalize(raw: &RawSize) -> SizeKey {
    SizeKey(match raw {
        RawSize::Missing => String::new(),
        RawSize::Date { month, day, .. } => date_key(*month, *day),
        RawSize::Number(n) => number_key(*n),
        RawSize::Text(text) => text_key(text),
    })
}

/// Convenience wrapper for text labels.
pub fn normalize_str(text: &str) -> SizeKey {
    SizeKey(text_key(text))
}

fn text_key(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some((month, day)) = parse_date_text(trimmed) {
        return date_key(month, day);
    }

    let upper = trimmed.to_uppercase().replace(',', ".");

    if let Some(n) = parse_plain_decimal(&upper) {
        return number_key(n);
    }

    if let Some((number, suffix)) = split_numeric_suffix(&upper) {
        if let Some(n) = parse_plain_decimal(number) {
            return format!("{}{}", number_key(n), suffix);
        }
    }

    upper
}

/// Rebuild the size a spreadsheet turned into a date: July 5th -> `7.5`.
fn date_key(month: u32, day: u32) -> String {
    parse_plain_decimal(&format!("{month}.{day}"))
        .map(number_key)
        .unwrap_or_default()
}

fn number_key(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    let formatted = format!("{n:.2}");
    let stripped = formatted.trim_end_matches('0').trim_end_matches('.');
    match stripped {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Parse `123`, `7.5`, `.5` or `8.` but nothing with exponents, signs or words.
fn parse_plain_decimal(s: &str) -> Option<f64> {
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    let digits_only = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !digits_only(int_part) || !digits_only(frac_part) {
        return None;
    }
    s.parse().ok()
}

/// Split `1.50C` into (`1.50`, `C`). The suffix must be purely alphabetic.
fn split_numeric_suffix(s: &str) -> Option<(&str, &str)> {
    let split_at = s.find(|c: char| c.is_ascii_alphabetic())?;
    let (number, suffix) = s.split_at(split_at);
    if number.is_empty() || !number.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if !suffix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((number, suffix))
}

/// Recognise `YYYY-MM-DD`, optionally followed by a time (` 00:00:00` or `T00:00`).
fn parse_date_text(s: &str) -> Option<(u32, u32)> {
    let date_part = s.get(..10)?;
    let rest = s.get(10..)?;
    if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with('T')) {
        return None;
    }

    let mut parts = date_part.split('-');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() || year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((month, day))
}
