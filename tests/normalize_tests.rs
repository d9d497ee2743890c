//! Size-key normalization across the spellings found in order files and
//! template headers.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use sizegrid::{normalize, normalize_str, RawSize};
use test_case::test_case;

#[test_case("7.5", "7.5" ; "dot decimal")]
#[test_case("7,5", "7.5" ; "comma decimal")]
#[test_case("7.50", "7.5" ; "trailing zero")]
#[test_case(" 8.0 ", "8" ; "integral decimal")]
#[test_case("08", "8" ; "leading zero")]
#[test_case(".5", "0.5" ; "bare fraction")]
#[test_case("42", "42" ; "integer")]
#[test_case("m", "M" ; "lower case letter")]
#[test_case("xxl", "XXL" ; "letter size")]
#[test_case("1.50c", "1.5C" ; "cup suffix")]
#[test_case("4y", "4Y" ; "age suffix")]
#[test_case("2024-07-05", "7.5" ; "iso date")]
#[test_case("2024-07-05 00:00:00", "7.5" ; "date with time")]
#[test_case("2023-11-30T00:00:00", "11.3" ; "date with t separator")]
#[test_case("", "" ; "empty")]
fn test_text_keys(raw: &str, expected: &str) {
    assert_eq!(normalize_str(raw).as_str(), expected);
}

#[test_case("2024-13-05" ; "month out of range")]
#[test_case("2024-7-5" ; "unpadded")]
#[test_case("24-07-05" ; "short year")]
fn test_date_like_text_kept(raw: &str) {
    assert_eq!(normalize_str(raw).as_str(), raw);
}

#[test_case(RawSize::Number(40.0), "40" ; "whole number")]
#[test_case(RawSize::Number(7.5), "7.5" ; "half size")]
#[test_case(RawSize::Number(-0.0), "0" ; "negative zero")]
#[test_case(RawSize::Number(f64::NAN), "" ; "not a number")]
#[test_case(RawSize::Date { year: 1900, month: 1, day: 10 }, "1.1" ; "january tenth")]
#[test_case(RawSize::Date { year: 2024, month: 12, day: 25 }, "12.25" ; "december")]
#[test_case(RawSize::Missing, "" ; "missing")]
fn test_typed_keys(raw: RawSize, expected: &str) {
    assert_eq!(normalize(&raw).as_str(), expected);
}

#[test]
fn test_every_spelling_of_a_size_joins() {
    let spellings = [
        RawSize::Text("7.5".into()),
        RawSize::Text("7,5".into()),
        RawSize::Text(" 7.50 ".into()),
        RawSize::Number(7.5),
        RawSize::Date {
            year: 2023,
            month: 7,
            day: 5,
        },
        RawSize::Text("2023-07-05 00:00:00".into()),
    ];
    let keys: Vec<_> = spellings.iter().map(normalize).collect();
    assert!(keys.windows(2).all(|w| w[0] == w[1]), "{keys:?}");
}

#[test]
fn test_keys_order_for_reports() {
    let mut keys = vec![normalize_str("XL"), normalize_str("10"), normalize_str("7.5")];
    keys.sort();
    let ordered: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    assert_eq!(ordered, vec!["10", "7.5", "XL"]);
}
