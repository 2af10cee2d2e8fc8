//! Cell addressing: column letters and A1-style coordinates.

use crate::error::{CodecError, Result};

/// Last column a spreadsheet can address (XFD).
pub const MAX_COLUMN: u32 = 16384;
/// Last row a spreadsheet can address.
pub const MAX_ROW: u32 = 1_048_576;

/// Column number (1-based) to letters: 1 -> "A", 26 -> "Z", 27 -> "AA".
///
/// Bijective base 26: there is no zero digit, so each step takes
/// `(n - 1) % 26` and carries `(n - 1) / 26`. Column 0 yields "".
pub fn column_to_letter(column: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    // Only ASCII capitals are ever pushed.
    letters.into_iter().map(char::from).collect()
}

/// Column letters (case-insensitive) to a 1-based column number.
pub fn letter_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(CodecError::InvalidCoordinate("empty column letters".to_string()));
    }
    let mut column: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(CodecError::InvalidCoordinate(format!(
                "invalid character '{}' in column '{}'",
                b as char, letters
            )));
        }
        let digit = (b.to_ascii_uppercase() - b'A' + 1) as u32;
        column = column
            .checked_mul(26)
            .and_then(|c| c.checked_add(digit))
            .filter(|c| *c <= MAX_COLUMN)
            .ok_or_else(|| {
                CodecError::InvalidCoordinate(format!("column '{}' exceeds XFD", letters))
            })?;
    }
    Ok(column)
}

/// A1-style address from a 1-based row and column.
pub fn coordinate_from_row_col(row: u32, column: u32) -> String {
    let mut coord = column_to_letter(column);
    coord.push_str(itoa::Buffer::new().format(row));
    coord
}

/// Parse `b"AB10"` into `(row, column)`, both 1-based. Allocation free.
#[inline]
pub fn parse_coordinate_bytes(bytes: &[u8]) -> Option<(u32, u32)> {
    let split = bytes.iter().position(|b| !b.is_ascii_alphabetic())?;
    let (letters, digits) = bytes.split_at(split);
    if letters.is_empty() || digits.is_empty() {
        return None;
    }

    let mut column: u32 = 0;
    for b in letters {
        column = column
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A' + 1) as u32)?;
        if column > MAX_COLUMN {
            return None;
        }
    }

    let mut row: u32 = 0;
    for b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        row = row.checked_mul(10)?.checked_add((b - b'0') as u32)?;
        if row > MAX_ROW {
            return None;
        }
    }
    if row == 0 {
        return None;
    }
    Some((row, column))
}

/// Parse `"AB10"` into `(row, column)`, both 1-based.
pub fn parse_coordinate(coord: &str) -> Result<(u32, u32)> {
    let coord = coord.trim();
    parse_coordinate_bytes(coord.as_bytes())
        .ok_or_else(|| CodecError::InvalidCoordinate(format!("Invalid coordinate: {}", coord)))
}
