// A1-style cell references and merged ranges

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Locator of a single cell: 1-based row (as printed in A1 notation),
/// 0-based column (A = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse "B5" into CellRef { row: 5, col: 1 }.
    pub fn parse(r: &str) -> Option<Self> {
        let r = r.trim();
        let split = r.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = r.split_at(split);
        let col = letters_to_col(letters)?;
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let row: u32 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::parse(s).ok_or_else(|| format!("invalid cell reference: {s:?}"))
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CellRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A merged block of cells. Only `start` (the anchor) is ever propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergedRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl MergedRange {
    /// Build a range, normalizing so that `start` is the top-left corner.
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse a merge reference like "A1:C3".
    pub fn parse(r: &str) -> Option<Self> {
        let (a, b) = r.split_once(':')?;
        Some(Self::new(CellRef::parse(a)?, CellRef::parse(b)?))
    }

    pub fn anchor(&self) -> CellRef {
        self.start
    }

    pub fn contains_row(&self, row: u32) -> bool {
        self.start.row <= row && row <= self.end.row
    }

    /// Column span equals `[col_start, col_end]` exactly.
    pub fn spans_exactly(&self, col_start: u32, col_end: u32) -> bool {
        self.start.col == col_start && self.end.col == col_end
    }
}

impl fmt::Display for MergedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Top-left reference of a range string ("A5:K5" -> "A5"); anything without
/// a colon is returned unchanged.
pub fn anchor(range_or_coord: &str) -> &str {
    match range_or_coord.split_once(':') {
        Some((start, _)) => start,
        None => range_or_coord,
    }
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert column letters to a 0-based index (A = 0, AB = 27).
pub fn letters_to_col(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    Some(col - 1)
}
