//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell identifiers
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//! Columns use the base-26 lettering spreadsheets use: A..Z, AA..AZ, BA..
//!
//! # Examples
//!
//! ```
//! use sheetwise_engine::engine::CellRef;
//!
//! let cell: CellRef = "B3".parse().unwrap();
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.col, 1); // 0-indexed
//! assert_eq!(cell.to_string(), "B3");
//! assert_eq!(CellRef::encode(0, 26), "AA1");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::AddressError;

/// A reference to a cell by row and column indices (0-indexed).
///
/// Ordering is row-major, so sorted collections of references iterate the
/// grid top-to-bottom, left-to-right.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$")
            .expect("cell identifier regex must compile")
    })
}

impl CellRef {
    pub const fn new(row: usize, col: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Canonical identifier for a coordinate (`encode(0, 0) == "A1"`).
    pub fn encode(row: usize, col: usize) -> String {
        CellRef::new(row, col).to_string()
    }

    /// Parse a canonical cell identifier: uppercase letters and a 1-based row
    /// without leading zeros, so `encode(decode(id)) == id` for every id
    /// that decodes.
    pub fn decode(id: &str) -> Result<CellRef, AddressError> {
        let caps = a1_re()
            .captures(id)
            .ok_or_else(|| AddressError::Malformed(id.to_string()))?;
        let (letters, numbers) = (&caps["letters"], &caps["numbers"]);
        if letters.bytes().any(|b| b.is_ascii_lowercase())
            || (numbers.len() > 1 && numbers.starts_with('0'))
        {
            return Err(AddressError::Malformed(id.to_string()));
        }
        Self::from_parts(id, letters, numbers)
    }

    /// Parse a reference as written inside a formula: letters in either case,
    /// leading zeros in the row allowed.
    pub fn parse_reference(text: &str) -> Result<CellRef, AddressError> {
        let caps = a1_re()
            .captures(text)
            .ok_or_else(|| AddressError::Malformed(text.to_string()))?;
        Self::from_parts(text, &caps["letters"], &caps["numbers"])
    }

    fn from_parts(id: &str, letters: &str, numbers: &str) -> Result<CellRef, AddressError> {
        let col = Self::letters_to_col(letters)
            .ok_or_else(|| AddressError::OutOfRange(id.to_string()))?;
        let row = numbers
            .parse::<usize>()
            .map_err(|_| AddressError::OutOfRange(id.to_string()))?
            .checked_sub(1)
            .ok_or_else(|| AddressError::ZeroRow(id.to_string()))?;
        Ok(CellRef::new(row, col))
    }

    /// Parse a rectangular reference like "A1:B5" into its two endpoints,
    /// in the order written.
    pub fn parse_range(range: &str) -> Result<(CellRef, CellRef), AddressError> {
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| AddressError::Malformed(range.to_string()))?;
        Ok((
            Self::parse_reference(start.trim())?,
            Self::parse_reference(end.trim())?,
        ))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }

    /// Convert column letters back to a 0-based index. Returns None on
    /// non-alphabetic input or overflow.
    pub fn letters_to_col(letters: &str) -> Option<usize> {
        if letters.is_empty() {
            return None;
        }
        let mut acc = 0usize;
        for c in letters.bytes() {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            let digit = (c.to_ascii_uppercase() - b'A') as usize + 1;
            acc = acc.checked_mul(26)?.checked_add(digit)?;
        }
        acc.checked_sub(1)
    }
}

impl std::str::FromStr for CellRef {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::CellRef;
    use crate::error::AddressError;
    use proptest::prelude::*;

    #[test]
    fn test_single_letter_columns() {
        assert_eq!(CellRef::decode("A1").unwrap(), CellRef::new(0, 0));
        assert_eq!(CellRef::decode("B1").unwrap(), CellRef::new(0, 1));
        assert_eq!(CellRef::decode("Z50").unwrap(), CellRef::new(49, 25));
    }

    #[test]
    fn test_multi_letter_columns() {
        assert_eq!(CellRef::decode("AA1").unwrap().col, 26);
        assert_eq!(CellRef::decode("AZ1").unwrap().col, 51);
        assert_eq!(CellRef::decode("BA1").unwrap().col, 52);
        assert_eq!(CellRef::decode("AA12").unwrap(), CellRef::new(11, 26));
        assert_eq!(CellRef::encode(0, 26), "AA1");
        assert_eq!(CellRef::encode(11, 27), "AB12");
    }

    #[test]
    fn test_decode_accepts_only_canonical_ids() {
        for bad in ["a1", "aA1", "A01", "B007"] {
            assert!(
                matches!(CellRef::decode(bad), Err(AddressError::Malformed(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(matches!(CellRef::decode("A00"), Err(AddressError::Malformed(_))));
    }

    #[test]
    fn test_formula_references_are_lenient() {
        assert_eq!(CellRef::parse_reference("aA1").unwrap().col, 26);
        assert_eq!(CellRef::parse_reference("b2").unwrap(), CellRef::new(1, 1));
        assert_eq!(CellRef::parse_reference("A01").unwrap(), CellRef::new(0, 0));
        assert!(matches!(CellRef::parse_reference("a0"), Err(AddressError::ZeroRow(_))));
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        for bad in ["", "123", "ABC", "1A", "A 1", "A1B", "A-1", " A1"] {
            assert!(
                matches!(CellRef::decode(bad), Err(AddressError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
        assert!(matches!(CellRef::decode("A0"), Err(AddressError::ZeroRow(_))));
    }

    #[test]
    fn test_decode_overflow_is_an_error() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(matches!(CellRef::decode(&huge), Err(AddressError::OutOfRange(_))));
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_parse_range_keeps_written_order() {
        let (a, b) = CellRef::parse_range("B2:A1").unwrap();
        assert_eq!(a, CellRef::new(1, 1));
        assert_eq!(b, CellRef::new(0, 0));
        assert!(CellRef::parse_range("B2").is_err());
    }

    #[test]
    fn test_ordering_is_row_major() {
        let mut refs = vec![CellRef::new(1, 0), CellRef::new(0, 5), CellRef::new(0, 1)];
        refs.sort();
        assert_eq!(refs, vec![CellRef::new(0, 1), CellRef::new(0, 5), CellRef::new(1, 0)]);
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(row in 0usize..100_000, col in 0usize..20_000) {
            let id = CellRef::encode(row, col);
            prop_assert_eq!(CellRef::decode(&id).unwrap(), CellRef::new(row, col));
            prop_assert_eq!(CellRef::decode(&id).unwrap().to_string(), id);
        }

        #[test]
        fn prop_every_decoded_id_round_trips(id in "[A-Za-z]{1,3}[0-9]{1,4}") {
            if let Ok(cell) = CellRef::decode(&id) {
                prop_assert_eq!(CellRef::encode(cell.row, cell.col), id);
            }
        }
    }
}
