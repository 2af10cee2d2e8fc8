#![no_main]

//! Fuzz target for cell addressing.
//!
//! Parsers must reject rather than panic or overflow, and every address the
//! writer can produce must parse back to where it came from.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use migscan_core::utils::{parse_coordinate_bytes, MAX_COLUMN, MAX_ROW};
use migscan_core::{column_to_letter, coordinate_from_row_col, letter_to_column, parse_coordinate};

#[derive(Arbitrary, Debug)]
struct CoordinateFuzzInput {
    raw_bytes: Vec<u8>,
    string_input: String,
    row: u32,
    column: u32,
}

fn fuzz_parse_coordinate(input: &str) {
    if let Ok((row, col)) = parse_coordinate(input) {
        assert!((1..=MAX_ROW).contains(&row), "row out of range for {:?}", input);
        assert!((1..=MAX_COLUMN).contains(&col), "column out of range for {:?}", input);
    }
}

/// The string parser trims; otherwise both parsers agree.
fn fuzz_coordinate_consistency(input: &str) {
    let string_result = parse_coordinate(input).ok();
    let bytes_result = parse_coordinate_bytes(input.trim().as_bytes());
    assert_eq!(string_result, bytes_result, "parsers disagree on {:?}", input);
}

fn fuzz_letter_to_column(input: &str) {
    if let Ok(col) = letter_to_column(input) {
        assert!((1..=MAX_COLUMN).contains(&col));
        assert_eq!(column_to_letter(col), input.to_ascii_uppercase());
    }
}

fn fuzz_column_to_letter(column: u32) {
    let letters = column_to_letter(column);
    if column == 0 {
        assert!(letters.is_empty());
    } else if column <= MAX_COLUMN {
        assert_eq!(letter_to_column(&letters).ok(), Some(column));
    } else {
        assert!(letter_to_column(&letters).is_err());
    }
}

fn fuzz_coordinate_from_row_col(row: u32, column: u32) {
    let coord = coordinate_from_row_col(row, column);
    if (1..=MAX_ROW).contains(&row) && (1..=MAX_COLUMN).contains(&column) {
        assert_eq!(parse_coordinate(&coord).ok(), Some((row, column)));
    }
}

fuzz_target!(|input: CoordinateFuzzInput| {
    fuzz_parse_coordinate(&input.string_input);
    let _ = parse_coordinate_bytes(&input.raw_bytes);
    fuzz_coordinate_consistency(&input.string_input);
    fuzz_letter_to_column(&input.string_input);
    fuzz_column_to_letter(input.column);
    fuzz_coordinate_from_row_col(input.row, input.column);
});
