//! Date recognition for numeric cells.
//!
//! A size such as `7.5` typed into a spreadsheet is often auto-converted into
//! July 5th. The cell keeps a serial number; only its number format says it is
//! a date. These helpers let the reader turn such cells back into
//! `(year, month, day)` so the size can be recovered.

/// Built-in format codes the reader may need to inspect (ECMA-376 18.8.30).
const BUILTIN_FORMATS: &[(u32, &str)] = &[
    (0, "General"),
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (22, "m/d/yy h:mm"),
    (49, "@"),
];

/// Format code of a built-in `numFmtId`, when it has a fixed one.
pub fn builtin_format(id: u32) -> Option<&'static str> {
    BUILTIN_FORMATS
        .iter()
        .find(|(builtin, _)| *builtin == id)
        .map(|(_, code)| *code)
}

/// Whether a built-in id renders as a date or time.
///
/// 27-36 and 50-58 are locale-specific date formats without a fixed code.
pub const fn is_builtin_date_id(id: u32) -> bool {
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

/// Whether a custom format code renders a date or time.
///
/// Literal text (`"..."`, `\x`), colors and conditions (`[...]`) are ignored.
/// An `m` only counts as a month when the section has no digit placeholders.
pub fn is_date_format(format_code: &str) -> bool {
    let mut tokens = String::with_capacity(format_code.len());
    let mut chars = format_code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                chars.by_ref().find(|&q| q == '"');
            }
            '[' => {
                chars.by_ref().find(|&q| q == ']');
            }
            '\\' => {
                chars.next();
            }
            _ => tokens.push(c.to_ascii_lowercase()),
        }
    }

    let numeric = tokens.contains(|c: char| matches!(c, '0' | '#' | '?'));
    tokens.contains(|c: char| matches!(c, 'y' | 'd' | 'h'))
        || (tokens.contains('m') && !numeric)
        || (tokens.contains('s') && tokens.contains(':'))
}

/// Days from 1970-01-01 to serial 0 of each date system.
///
/// The 1900 system counts a phantom 1900-02-29 at serial 60, so serials after
/// it sit one day further along.
const EPOCH_1900: i64 = -25_568;
const EPOCH_1904: i64 = -24_107;

/// Convert a spreadsheet serial date to `(year, month, day)`. The time of day
/// is dropped.
#[allow(clippy::cast_possible_truncation)]
pub fn excel_date_to_ymd(serial: f64, date1904: bool) -> (i32, u32, u32) {
    let days = serial.floor() as i64;
    let unix_days = if date1904 {
        days + EPOCH_1904
    } else if days > 60 {
        days + EPOCH_1900 - 1
    } else {
        days + EPOCH_1900
    };
    civil_from_days(unix_days)
}

/// Proleptic Gregorian date of a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    (
        i32::try_from(year).unwrap_or(i32::MAX),
        u32::try_from(month).unwrap_or(1),
        u32::try_from(day).unwrap_or(1),
    )
}
